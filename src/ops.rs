//! Query and mutation operations
//!
//! `EmailService` is the complete surface an external reasoning process
//! calls. Every operation is total: internal faults are caught here and
//! mapped to the documented sentinel shapes, so a caller never sees an
//! error type, only a structured result. Store access is serialized
//! structurally through `&mut self` receivers on one service value.

use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::extract::extract_classification;
use crate::gateway::MailboxGateway;
use crate::llm::{ChatMessage, ChatProvider, ChatRequest};
use crate::mime;
use crate::models::{
    Classification, ClassifyResult, EmailOverview, EmailRecord, EmailWithBody, FetchOutcome,
    FieldMatchResult, FieldSelector, FieldValue, ReadState, ReadStateResult, RecordResult,
    RemoveResult, SummarizeResult, TitleSearchResult, uid_not_found, unknown_field,
};
use crate::store::EmailStore;

/// Sampling temperature for every external call
const TEMPERATURE: f64 = 0.0;
/// Completion length cap for every external call
const MAX_TOKENS: u32 = 150;

const SUMMARIZE_SYSTEM_PROMPT: &str = "You are an email assistant that summarizes emails.";
const CLASSIFY_SYSTEM_PROMPT: &str = "You are an email classification assistant.";

/// The operation surface over store, gateway, and external service
///
/// Owns the store outright; the gateway and provider are taken as trait
/// implementations so the operations can be exercised against in-memory
/// fakes.
#[derive(Debug)]
pub struct EmailService<G, P> {
    store: EmailStore,
    gateway: G,
    provider: P,
    model: String,
    categories: Vec<String>,
}

impl<G: MailboxGateway, P: ChatProvider> EmailService<G, P> {
    /// Create a service with an empty store
    pub fn new(gateway: G, provider: P, model: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            store: EmailStore::new(),
            gateway,
            provider,
            model: model.into(),
            categories,
        }
    }

    /// Fetch unseen messages and insert the ones not already stored
    ///
    /// Search and per-message fetches go through the gateway with peek
    /// semantics; remote flags stay untouched. Per-message failures
    /// (fetch or parse) are logged and skipped. A search failure yields
    /// an empty outcome.
    pub async fn fetch(&mut self) -> FetchOutcome {
        let started = Instant::now();
        let uids = match self.gateway.search_unseen().await {
            Ok(uids) => uids,
            Err(e) => {
                warn!(error = %e, "unseen search failed");
                return FetchOutcome {
                    count: 0,
                    emails: Vec::new(),
                };
            }
        };

        let mut inserted = Vec::new();
        for uid in uids {
            if self.store.contains(uid) {
                debug!(uid, "already stored, skipping");
                continue;
            }
            let raw = match self.gateway.fetch_raw(uid).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(uid, error = %e, "message fetch failed, skipping");
                    continue;
                }
            };
            let normalized = match mime::normalize_message(&raw) {
                Ok(normalized) => normalized,
                Err(e) => {
                    warn!(uid, error = %e, "message parse failed, skipping");
                    continue;
                }
            };

            let record = EmailRecord {
                uid,
                subject: normalized.subject,
                sender: normalized.sender,
                body: normalized.body,
                raw_body: normalized.raw_body,
                summary: None,
                classification: Classification::default(),
                is_read: false,
                date_time: normalized.date,
            };
            let overview = EmailOverview::from(&record);
            if self.store.upsert_if_absent(record) {
                inserted.push(overview);
            }
        }

        info!(
            count = inserted.len(),
            elapsed_ms = duration_ms(started),
            "fetch completed"
        );
        FetchOutcome {
            count: inserted.len(),
            emails: inserted,
        }
    }

    /// Overviews of every stored record, in insertion order
    pub fn list(&self) -> Vec<EmailOverview> {
        self.store.iter().map(EmailOverview::from).collect()
    }

    /// All stored uids, in insertion order
    pub fn uids(&self) -> Vec<u32> {
        self.store.uids()
    }

    /// The full record for a uid, or the not-found shape
    pub fn get_by_uid(&self, uid: u32) -> RecordResult {
        match self.store.get(uid) {
            Some(record) => RecordResult::Found(record.clone()),
            None => RecordResult::not_found(uid),
        }
    }

    /// First record whose subject contains the query, case-insensitive
    pub fn get_by_title(&self, query: &str) -> TitleSearchResult {
        let needle = query.to_lowercase();
        let hit = self
            .store
            .scan(|record| record.subject.to_lowercase().contains(&needle))
            .next();
        match hit {
            Some(record) => TitleSearchResult::Found(EmailWithBody::from(record)),
            None => TitleSearchResult::not_found(query),
        }
    }

    /// All records whose named field contains the query, case-insensitive
    ///
    /// Returns the uid-to-value mapping (values pre-lowercase), which may
    /// be empty; an unrecognized field name yields the unknown-field
    /// shape instead.
    pub fn get_by_field_match(&self, field: &str, query: &str) -> FieldMatchResult {
        let Some(selector) = FieldSelector::parse(field) else {
            return FieldMatchResult::unknown_field(field);
        };

        let needle = query.to_lowercase();
        let matches: BTreeMap<u32, String> = self
            .store
            .iter()
            .filter_map(|record| {
                let text = selector.match_text(record);
                text.to_lowercase()
                    .contains(&needle)
                    .then(|| (record.uid, text))
            })
            .collect();
        FieldMatchResult::Matches(matches)
    }

    /// One field of one record
    ///
    /// The result shape is fixed; an unknown uid or field puts an
    /// explanatory string in `value`. An unknown uid takes precedence
    /// when both are unknown.
    pub fn get_field_by_id(&self, uid: u32, field: &str) -> FieldValue {
        let value = match (self.store.get(uid), FieldSelector::parse(field)) {
            (Some(record), Some(selector)) => selector.value_of(record),
            (None, _) => Value::from(uid_not_found(uid)),
            (_, None) => Value::from(unknown_field(field)),
        };
        FieldValue {
            uid,
            field: field.to_owned(),
            value,
        }
    }

    /// Summarize one record through the external service
    ///
    /// The stored summary is overwritten only on success; every failure
    /// path returns a sentinel and leaves it untouched.
    pub async fn summarize(&mut self, uid: u32) -> SummarizeResult {
        let Some(record) = self.store.get(uid) else {
            return SummarizeResult {
                uid,
                summary: "Email not found".to_owned(),
            };
        };

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SUMMARIZE_SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "Summarize the following email in 2-3 sentences. \
                     If the email cannot be understood, say so explicitly.\n\n{}",
                    record.body
                )),
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let started = Instant::now();
        let response = match self.provider.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(uid, error = %e, "summarization call failed");
                return SummarizeResult {
                    uid,
                    summary: "ERROR: Failed to call summarization service.".to_owned(),
                };
            }
        };

        let Some(content) = response.first_content() else {
            warn!(uid, "summarization returned no content");
            return SummarizeResult {
                uid,
                summary: "ERROR: No summary generated.".to_owned(),
            };
        };

        let summary = content.trim().to_owned();
        self.store.set_summary(uid, summary.clone());
        debug!(uid, elapsed_ms = duration_ms(started), "summary stored");
        SummarizeResult { uid, summary }
    }

    /// Classify one record through the external service
    ///
    /// A reply must contain a decodable `{priority, category}` object;
    /// the stored pair is overwritten atomically on success and left
    /// untouched on any failure. Labels outside the configured lists are
    /// stored as-is with a warning.
    pub async fn classify(&mut self, uid: u32) -> ClassifyResult {
        let Some(record) = self.store.get(uid) else {
            return ClassifyResult {
                uid,
                classification: Classification::sentinel("Email not found"),
            };
        };

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(CLASSIFY_SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "{}\n\n{}",
                    self.classify_instructions(),
                    record.body
                )),
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let started = Instant::now();
        let response = match self.provider.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(uid, error = %e, "classification call failed");
                return ClassifyResult {
                    uid,
                    classification: Classification::sentinel("FAILED"),
                };
            }
        };

        let Some(content) = response.first_content() else {
            warn!(uid, "classification returned no content");
            return ClassifyResult {
                uid,
                classification: Classification::sentinel("FAILED"),
            };
        };

        let Some(pair) = extract_classification(content) else {
            warn!(uid, "no decodable JSON object in classification reply");
            return ClassifyResult {
                uid,
                classification: Classification::sentinel("FAILED TO PARSE"),
            };
        };

        self.warn_on_unknown_labels(uid, &pair);
        self.store.set_classification(uid, pair.clone());
        debug!(uid, elapsed_ms = duration_ms(started), "classification stored");
        ClassifyResult {
            uid,
            classification: pair,
        }
    }

    /// Mark one record read on the server, then locally
    pub async fn mark_as_read(&mut self, uid: u32) -> ReadStateResult {
        self.set_read_state(uid, true).await
    }

    /// Mark one record unread on the server, then locally
    pub async fn unmark_as_read(&mut self, uid: u32) -> ReadStateResult {
        self.set_read_state(uid, false).await
    }

    /// Delete one record from the store
    ///
    /// Terminal: no tombstone is kept, and the server-side message is
    /// not touched.
    pub fn remove(&mut self, uid: u32) -> RemoveResult {
        if self.store.delete(uid) {
            debug!(uid, "record removed");
            RemoveResult::removed(uid)
        } else {
            RemoveResult::not_found(uid)
        }
    }

    /// Flag-change order: server first, then the local record
    ///
    /// The local flag flips only after the gateway acknowledged the
    /// store, so the record never claims a state the server rejected.
    async fn set_read_state(&mut self, uid: u32, read: bool) -> ReadStateResult {
        if let Err(e) = self.gateway.set_read_flag(uid, read).await {
            warn!(uid, read, error = %e, "read flag store failed");
            return ReadStateResult {
                uid,
                is_read: ReadState::Sentinel("ERROR: Could not update read status.".to_owned()),
            };
        }
        if !self.store.set_read(uid, read) {
            return ReadStateResult {
                uid,
                is_read: ReadState::Sentinel("ERROR: Could not find Email.".to_owned()),
            };
        }
        debug!(uid, read, "read state updated");
        ReadStateResult {
            uid,
            is_read: ReadState::Flag(read),
        }
    }

    /// The classification instruction block sent ahead of the body
    fn classify_instructions(&self) -> String {
        let category_list = self
            .categories
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "You are an AI assistant that classifies emails.\n\
             Classify the email into:\n\
             - \"priority\": either \"important\" or \"not important\"\n\
             - \"category\": one of the following: {category_list}\n\n\
             Return your response in JSON format like:\n\
             {{\n  \"priority\": \"important\",\n  \"category\": \"work\"\n}}"
        )
    }

    /// Log labels the service returned outside the expected lists
    ///
    /// Stored as-is either way; the enumeration is prompt guidance, not
    /// a validation contract.
    fn warn_on_unknown_labels(&self, uid: u32, pair: &Classification) {
        if let Some(priority) = &pair.priority
            && priority != "important"
            && priority != "not important"
        {
            warn!(uid, priority = %priority, "priority outside the expected alternatives");
        }
        if let Some(category) = &pair.category
            && !self.categories.iter().any(|c| c == category)
        {
            warn!(uid, category = %category, "category outside the configured list");
        }
    }
}

fn duration_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

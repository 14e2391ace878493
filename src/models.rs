//! Record types and operation result shapes
//!
//! Defines the canonical email record, the closed field-selector
//! enumeration, and every result type the operation surface returns.
//! Each type is annotated with `JsonSchema` so a front-end can publish
//! tool schemas to the reasoning process. Result enums use untagged
//! serialization: callers see either the documented success shape or the
//! documented sentinel shape, nothing else.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Priority/category pair produced by classification
///
/// Both fields are null until the first successful classify call, and are
/// always rewritten together. Sentinel results use the same shape with
/// both fields set to the same explanatory string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Classification {
    /// `"important"` or `"not important"`, as returned by the service
    pub priority: Option<String>,
    /// One of the configured categories (not strictly validated)
    pub category: Option<String>,
}

impl Classification {
    /// Pair with both fields set to the same sentinel text
    pub fn sentinel(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            priority: Some(text.clone()),
            category: Some(text),
        }
    }

    /// Values that are set, joined with single spaces
    ///
    /// Used by field matching; an unclassified record contributes an
    /// empty string rather than a `null` rendering.
    pub fn joined_values(&self) -> String {
        [self.priority.as_deref(), self.category.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The canonical in-memory representation of one email
///
/// Created by fetch, mutated in place only through the documented
/// operations, destroyed by remove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmailRecord {
    /// Server-assigned message UID; primary key of the store
    pub uid: u32,
    /// Decoded, whitespace-collapsed Subject header
    pub subject: String,
    /// Raw From header value; `"unknown"` if the header was absent
    pub sender: String,
    /// Plain-text body, uncapped; immutable after fetch
    pub body: String,
    /// Original HTML part if present, else empty; immutable after fetch
    #[serde(rename = "rawBody")]
    pub raw_body: String,
    /// Last successful summarize output; absent until then
    pub summary: Option<String>,
    /// Last successful classify output; both fields null until then
    pub classification: Classification,
    /// Last server-acknowledged read state
    #[serde(rename = "isRead")]
    pub is_read: bool,
    /// Raw Date header value; empty if the header was absent
    #[serde(rename = "dateTime")]
    pub date_time: String,
}

/// Minimal projection of a record (body deliberately omitted)
///
/// Returned by fetch and list to keep the caller's context small; the
/// body is retrieved per-uid when needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmailOverview {
    /// Server-assigned message UID
    pub uid: u32,
    /// Decoded, whitespace-collapsed Subject header
    pub subject: String,
    /// Raw From header value
    pub sender: String,
    /// Last server-acknowledged read state
    #[serde(rename = "isRead")]
    pub is_read: bool,
    /// Last successful summarize output, if any
    pub summary: Option<String>,
    /// Last successful classify output
    pub classification: Classification,
}

impl From<&EmailRecord> for EmailOverview {
    fn from(record: &EmailRecord) -> Self {
        Self {
            uid: record.uid,
            subject: record.subject.clone(),
            sender: record.sender.clone(),
            is_read: record.is_read,
            summary: record.summary.clone(),
            classification: record.classification.clone(),
        }
    }
}

/// Overview plus body, as returned by title search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmailWithBody {
    /// Server-assigned message UID
    pub uid: u32,
    /// Decoded, whitespace-collapsed Subject header
    pub subject: String,
    /// Raw From header value
    pub sender: String,
    /// Plain-text body
    pub body: String,
    /// Last server-acknowledged read state
    #[serde(rename = "isRead")]
    pub is_read: bool,
    /// Last successful summarize output, if any
    pub summary: Option<String>,
    /// Last successful classify output
    pub classification: Classification,
}

impl From<&EmailRecord> for EmailWithBody {
    fn from(record: &EmailRecord) -> Self {
        Self {
            uid: record.uid,
            subject: record.subject.clone(),
            sender: record.sender.clone(),
            body: record.body.clone(),
            is_read: record.is_read,
            summary: record.summary.clone(),
            classification: record.classification.clone(),
        }
    }
}

/// The closed enumeration of record fields reachable by name
///
/// Replaces reflective attribute lookup: every externally addressable
/// field has a selector, a canonical wire name, a typed accessor, and a
/// match-text rendering. Anything else is an unknown field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSelector {
    Uid,
    Subject,
    Sender,
    Body,
    RawBody,
    Summary,
    Classification,
    IsRead,
    DateTime,
}

impl FieldSelector {
    /// Resolve a caller-supplied field name
    ///
    /// Case-insensitive; accepts the wire names plus the aliases the
    /// reasoning process uses (`title` for subject, snake_case forms of
    /// the camelCase names). Returns `None` for anything else.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "uid" => Some(Self::Uid),
            "subject" | "title" => Some(Self::Subject),
            "sender" => Some(Self::Sender),
            "body" => Some(Self::Body),
            "rawbody" | "raw_body" => Some(Self::RawBody),
            "summary" => Some(Self::Summary),
            "classification" => Some(Self::Classification),
            "isread" | "is_read" => Some(Self::IsRead),
            "datetime" | "date_time" => Some(Self::DateTime),
            _ => None,
        }
    }

    /// Canonical wire name of the field
    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Uid => "uid",
            Self::Subject => "subject",
            Self::Sender => "sender",
            Self::Body => "body",
            Self::RawBody => "rawBody",
            Self::Summary => "summary",
            Self::Classification => "classification",
            Self::IsRead => "isRead",
            Self::DateTime => "dateTime",
        }
    }

    /// The field's value as it appears in the full record serialization
    pub fn value_of(self, record: &EmailRecord) -> Value {
        match self {
            Self::Uid => Value::from(record.uid),
            Self::Subject => Value::from(record.subject.clone()),
            Self::Sender => Value::from(record.sender.clone()),
            Self::Body => Value::from(record.body.clone()),
            Self::RawBody => Value::from(record.raw_body.clone()),
            Self::Summary => match &record.summary {
                Some(summary) => Value::from(summary.clone()),
                None => Value::Null,
            },
            Self::Classification => {
                serde_json::to_value(&record.classification).unwrap_or(Value::Null)
            }
            Self::IsRead => Value::from(record.is_read),
            Self::DateTime => Value::from(record.date_time.clone()),
        }
    }

    /// The field rendered as text for substring matching
    ///
    /// The classification pair joins its set values with spaces; an unset
    /// summary renders empty; booleans render `true`/`false`.
    pub fn match_text(self, record: &EmailRecord) -> String {
        match self {
            Self::Uid => record.uid.to_string(),
            Self::Subject => record.subject.clone(),
            Self::Sender => record.sender.clone(),
            Self::Body => record.body.clone(),
            Self::RawBody => record.raw_body.clone(),
            Self::Summary => record.summary.clone().unwrap_or_default(),
            Self::Classification => record.classification.joined_values(),
            Self::IsRead => record.is_read.to_string(),
            Self::DateTime => record.date_time.clone(),
        }
    }
}

/// The not-found sentinel text shared by uid-keyed lookups
pub(crate) fn uid_not_found(uid: u32) -> String {
    format!("No email found with UID {uid}")
}

/// Result of fetch: how many records were inserted, and their overviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutcome {
    /// Number of newly inserted records
    pub count: usize,
    /// Overviews of the newly inserted records, in insertion order
    pub emails: Vec<EmailOverview>,
}

/// Result of get-by-uid: the full record or the not-found sentinel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RecordResult {
    /// The stored record
    Found(EmailRecord),
    /// `{"error": "No email found with UID <uid>"}`
    NotFound {
        /// Explanatory sentinel text
        error: String,
    },
}

impl RecordResult {
    pub fn not_found(uid: u32) -> Self {
        Self::NotFound {
            error: uid_not_found(uid),
        }
    }
}

/// Result of title search: the first match or a sentinel naming the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TitleSearchResult {
    /// The first record whose subject contains the query
    Found(EmailWithBody),
    /// `{"error": "No email found with title containing '<query>'"}`
    NotFound {
        /// Explanatory sentinel text naming the searched substring
        error: String,
    },
}

impl TitleSearchResult {
    pub fn not_found(query: &str) -> Self {
        Self::NotFound {
            error: format!("No email found with title containing '{query}'"),
        }
    }
}

/// Result of field matching: uid to matched value, or the unknown-field
/// sentinel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldMatchResult {
    /// Every matching record's uid mapped to the field's match text
    /// (pre-lowercase); possibly empty
    Matches(std::collections::BTreeMap<u32, String>),
    /// `{"error": "Unknown field '<field>'"}`
    UnknownField {
        /// Explanatory sentinel text naming the rejected field
        error: String,
    },
}

impl FieldMatchResult {
    pub fn unknown_field(field: &str) -> Self {
        Self::UnknownField {
            error: unknown_field(field),
        }
    }
}

/// The unknown-field sentinel text
pub(crate) fn unknown_field(field: &str) -> String {
    format!("Unknown field '{field}'")
}

/// Result of single-field lookup
///
/// `value` holds the field's value on success and an explanatory sentinel
/// string when the uid or field is unknown; the shape never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldValue {
    /// The uid that was looked up
    pub uid: u32,
    /// The field name as the caller supplied it
    pub field: String,
    /// The field's value, or a sentinel string
    pub value: Value,
}

/// Result of summarize
///
/// `summary` is the stored text on success and a sentinel on failure
/// (`"Email not found"`, or an error description when the service call
/// failed or returned nothing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummarizeResult {
    /// The uid that was summarized
    pub uid: u32,
    /// The new summary, or a sentinel string
    pub summary: String,
}

/// Result of classify
///
/// Carries the stored pair on success; on failure both fields hold the
/// same sentinel (`"Email not found"`, `"FAILED"`, `"FAILED TO PARSE"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassifyResult {
    /// The uid that was classified
    pub uid: u32,
    /// The new pair, or a sentinel pair
    pub classification: Classification,
}

/// Read flag or sentinel, as reported by mark/unmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ReadState {
    /// The record's read flag after a successful call
    Flag(bool),
    /// Explanatory sentinel when the flag could not be updated
    Sentinel(String),
}

/// Result of mark-as-read / unmark-as-read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReadStateResult {
    /// The uid the flag change was attempted on
    pub uid: u32,
    /// The resulting read state, or a sentinel string
    #[serde(rename = "isRead")]
    pub is_read: ReadState,
}

/// Result of remove
///
/// `{"uid": n}` on success; the not-found case adds a dedicated `error`
/// field instead of overloading the uid key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RemoveResult {
    /// The uid the removal was attempted on
    pub uid: u32,
    /// Present only when no record existed for the uid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemoveResult {
    pub fn removed(uid: u32) -> Self {
        Self { uid, error: None }
    }

    pub fn not_found(uid: u32) -> Self {
        Self {
            uid,
            error: Some(uid_not_found(uid)),
        }
    }
}

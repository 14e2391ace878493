//! Message parsing and MIME normalization
//!
//! Parses raw RFC822 messages using `mailparse` and reduces them to the
//! canonical record fields: decoded subject, raw sender and date headers,
//! a plain-text body, and the original HTML part. Decoding is permissive:
//! per-part failures fall back to lossy UTF-8 or are skipped with a
//! warning, and a message with no decodable text yields empty strings.

use std::collections::BTreeMap;

use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use crate::errors::{AppError, AppResult};
use crate::html::html_to_text;

/// Canonical output of message normalization
///
/// Field semantics follow the stored record: `subject` is RFC 2047-decoded
/// and whitespace-collapsed, `sender` and `date` carry the raw header
/// values, `body` is the best-available plain text, `raw_body` the first
/// HTML part verbatim (empty if none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEmail {
    /// Decoded, whitespace-collapsed Subject header; empty if absent
    pub subject: String,
    /// Raw From header value; `"unknown"` if absent
    pub sender: String,
    /// Raw Date header value; empty if absent
    pub date: String,
    /// Plain-text body, uncapped; empty if no decodable text exists
    pub body: String,
    /// First `text/html` part as decoded, unstripped; empty if none
    pub raw_body: String,
}

/// Normalize a raw message into its canonical record fields
///
/// Multipart messages are walked in declaration order, skipping
/// attachments; the first `text/plain` part becomes the body, falling
/// back to the first `text/html` part stripped of markup. Single-part
/// messages use the sole decoded payload for both body and raw body.
///
/// # Errors
///
/// - `Internal` if `mailparse` rejects the message structure outright
pub fn normalize_message(raw: &[u8]) -> AppResult<NormalizedEmail> {
    let parsed = mailparse::parse_mail(raw)
        .map_err(|e| AppError::Internal(format!("failed to parse message: {e}")))?;

    let subject = parsed
        .headers
        .get_first_value("Subject")
        .map(|s| collapse_ws(&s))
        .unwrap_or_default();
    let sender = raw_header_value(&parsed, "From").unwrap_or_else(|| "unknown".to_owned());
    let date = raw_header_value(&parsed, "Date").unwrap_or_default();

    let (body, raw_body) = if parsed.subparts.is_empty() {
        let text = decode_part_text(&parsed).unwrap_or_default();
        (text.trim().to_owned(), text)
    } else {
        let mut plain = None;
        let mut html = None;
        walk_parts(&parsed, &mut plain, &mut html);

        let raw_body = html.clone().unwrap_or_default();
        let body = match (plain, html) {
            (Some(text), _) => text.trim().to_owned(),
            (None, Some(markup)) => html_to_text(&markup),
            (None, None) => String::new(),
        };
        (body, raw_body)
    };

    Ok(NormalizedEmail {
        subject,
        sender,
        date,
        body,
        raw_body,
    })
}

/// Walk MIME part tree recursively
///
/// Visits leaves in declaration order, capturing the first non-attachment
/// `text/plain` and `text/html` parts. Attachments (by disposition or by
/// a declared filename) never contribute body text.
fn walk_parts(part: &ParsedMail<'_>, plain: &mut Option<String>, html: &mut Option<String>) {
    if part.subparts.is_empty() {
        if plain.is_some() && html.is_some() {
            return;
        }

        let ctype = part.ctype.mimetype.to_ascii_lowercase();
        let disp = part.get_content_disposition();
        let is_attachment = disp.disposition == DispositionType::Attachment
            || attachment_filename(part, &disp.params).is_some();
        if is_attachment {
            return;
        }

        if ctype == "text/plain"
            && plain.is_none()
            && let Some(text) = decode_part_text(part)
        {
            *plain = Some(text);
        }

        if ctype == "text/html"
            && html.is_none()
            && let Some(markup) = decode_part_text(part)
        {
            *html = Some(markup);
        }

        return;
    }

    for sub in &part.subparts {
        walk_parts(sub, plain, html);
    }
}

/// Decode one part's text, falling back to lossy UTF-8 over the
/// transfer-decoded bytes when the declared charset fails. Returns `None`
/// (after logging) only when even the transfer decoding fails.
fn decode_part_text(part: &ParsedMail<'_>) -> Option<String> {
    match part.get_body() {
        Ok(text) => Some(text),
        Err(err) => match part.get_body_raw() {
            Ok(bytes) => {
                tracing::warn!(error = %err, "charset decode failed, using lossy UTF-8");
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(err) => {
                tracing::warn!(error = %err, "undecodable message part skipped");
                None
            }
        },
    }
}

/// Extract attachment filename from part
///
/// Checks Content-Disposition parameter first, falls back to Content-Type
/// name parameter.
fn attachment_filename(
    part: &ParsedMail<'_>,
    disp_params: &BTreeMap<String, String>,
) -> Option<String> {
    disp_params
        .get("filename")
        .cloned()
        .or_else(|| part.ctype.params.get("name").cloned())
}

/// First value of a header without RFC 2047 decoding, folding whitespace
/// collapsed. `None` when the header is absent or blank.
fn raw_header_value(parsed: &ParsedMail<'_>, name: &str) -> Option<String> {
    parsed
        .headers
        .get_first_header(name)
        .map(|h| collapse_ws(&String::from_utf8_lossy(h.get_value_raw())))
        .filter(|v| !v.is_empty())
}

/// Collapse all whitespace runs to single spaces and trim
fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::{collapse_ws, normalize_message};

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(collapse_ws("  a \t b\r\n  c  "), "a b c");
        assert_eq!(collapse_ws(""), "");
    }

    #[test]
    fn parses_simple_plain_text_message() {
        let raw = b"From: sender@example.com\r\nTo: user@example.com\r\nSubject: Hi\r\nDate: Wed, 1 Jan 2025 00:00:00 +0000\r\n\r\nHello there";
        let parsed = normalize_message(raw).expect("parse should succeed");

        assert_eq!(parsed.subject, "Hi");
        assert_eq!(parsed.sender, "sender@example.com");
        assert_eq!(parsed.date, "Wed, 1 Jan 2025 00:00:00 +0000");
        assert_eq!(parsed.body, "Hello there");
        // In a single-part message body and raw body carry the same payload.
        assert_eq!(parsed.raw_body.trim(), "Hello there");
    }

    #[test]
    fn single_part_html_is_not_stripped() {
        let raw = b"From: a@x.com\r\nSubject: S\r\nContent-Type: text/html\r\n\r\n<p>Hi</p>";
        let parsed = normalize_message(raw).expect("parse should succeed");

        assert_eq!(parsed.body, "<p>Hi</p>");
        assert_eq!(parsed.raw_body.trim(), "<p>Hi</p>");
    }

    #[test]
    fn multipart_prefers_plain_and_keeps_html_raw() {
        let raw = b"From: a@x.com\r\nSubject: Multi\r\nMIME-Version: 1.0\r\nContent-Type: multipart/alternative; boundary=\"b1\"\r\n\r\n--b1\r\nContent-Type: text/plain\r\n\r\nplain body\r\n--b1\r\nContent-Type: text/html\r\n\r\n<p>html body</p>\r\n--b1--\r\n";
        let parsed = normalize_message(raw).expect("parse should succeed");

        assert_eq!(parsed.body, "plain body");
        assert_eq!(parsed.raw_body.trim(), "<p>html body</p>");
    }

    #[test]
    fn html_only_multipart_falls_back_to_stripped_text() {
        let raw = b"From: a@x.com\r\nSubject: H\r\nMIME-Version: 1.0\r\nContent-Type: multipart/alternative; boundary=\"b1\"\r\n\r\n--b1\r\nContent-Type: text/html\r\n\r\n<div>first line</div><div>second &amp; last</div>\r\n--b1--\r\n";
        let parsed = normalize_message(raw).expect("parse should succeed");

        assert_eq!(parsed.body, "first line\n\nsecond & last");
        assert!(parsed.raw_body.contains("<div>first line</div>"));
    }

    #[test]
    fn rfc2047_subject_is_decoded_and_collapsed() {
        let raw = b"From: a@x.com\r\nSubject: =?utf-8?q?Caf=C3=A9=20time?=\r\n\r\nbody";
        let parsed = normalize_message(raw).expect("parse should succeed");
        assert_eq!(parsed.subject, "Caf\u{e9} time");
    }

    #[test]
    fn folded_subject_collapses_to_single_spaces() {
        let raw = b"From: a@x.com\r\nSubject: Hello\r\n   World\r\n\r\nbody";
        let parsed = normalize_message(raw).expect("parse should succeed");
        assert_eq!(parsed.subject, "Hello World");
    }

    #[test]
    fn sender_header_stays_raw() {
        let raw = b"From: =?utf-8?q?Jane?= <jane@x.com>\r\nSubject: S\r\n\r\nbody";
        let parsed = normalize_message(raw).expect("parse should succeed");
        assert_eq!(parsed.sender, "=?utf-8?q?Jane?= <jane@x.com>");
    }

    #[test]
    fn missing_headers_use_documented_defaults() {
        let raw = b"To: user@example.com\r\n\r\nbody";
        let parsed = normalize_message(raw).expect("parse should succeed");

        assert_eq!(parsed.subject, "");
        assert_eq!(parsed.sender, "unknown");
        assert_eq!(parsed.date, "");
    }

    #[test]
    fn attachment_parts_are_skipped() {
        let raw = b"From: a@x.com\r\nSubject: A\r\nMIME-Version: 1.0\r\nContent-Type: multipart/mixed; boundary=\"b1\"\r\n\r\n--b1\r\nContent-Type: text/plain; name=\"notes.txt\"\r\nContent-Disposition: attachment; filename=\"notes.txt\"\r\n\r\nATTACHED TEXT\r\n--b1\r\nContent-Type: text/plain\r\n\r\nreal body\r\n--b1--\r\n";
        let parsed = normalize_message(raw).expect("parse should succeed");
        assert_eq!(parsed.body, "real body");
    }

    #[test]
    fn named_inline_part_counts_as_attachment() {
        let raw = b"From: a@x.com\r\nSubject: A\r\nMIME-Version: 1.0\r\nContent-Type: multipart/mixed; boundary=\"b1\"\r\n\r\n--b1\r\nContent-Type: text/plain; name=\"inline.txt\"\r\n\r\nNAMED PART\r\n--b1\r\nContent-Type: text/plain\r\n\r\nreal body\r\n--b1--\r\n";
        let parsed = normalize_message(raw).expect("parse should succeed");
        assert_eq!(parsed.body, "real body");
    }

    #[test]
    fn quoted_printable_body_is_decoded() {
        let raw = b"From: a@x.com\r\nSubject: QP\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\nCaf=C3=A9 time";
        let parsed = normalize_message(raw).expect("parse should succeed");
        assert_eq!(parsed.body, "Caf\u{e9} time");
    }

    #[test]
    fn base64_body_is_decoded() {
        let raw = b"From: a@x.com\r\nSubject: B64\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Transfer-Encoding: base64\r\n\r\naGVsbG8gd29ybGQ=";
        let parsed = normalize_message(raw).expect("parse should succeed");
        assert_eq!(parsed.body, "hello world");
    }

    #[test]
    fn latin1_charset_is_honoured() {
        let raw = b"From: a@x.com\r\nSubject: L\r\nContent-Type: text/plain; charset=iso-8859-1\r\n\r\ncaf\xe9";
        let parsed = normalize_message(raw).expect("parse should succeed");
        assert_eq!(parsed.body, "caf\u{e9}");
    }

    #[test]
    fn invalid_utf8_decodes_lossily_instead_of_failing() {
        let raw = b"From: a@x.com\r\nSubject: X\r\nContent-Type: text/plain; charset=utf-8\r\n\r\ncaf\xff";
        let parsed = normalize_message(raw).expect("parse should succeed");

        assert!(parsed.body.starts_with("caf"));
        assert_eq!(parsed.body.chars().count(), 4);
    }

    #[test]
    fn message_with_no_text_parts_yields_empty_body() {
        let raw = b"From: a@x.com\r\nSubject: I\r\nMIME-Version: 1.0\r\nContent-Type: multipart/mixed; boundary=\"b1\"\r\n\r\n--b1\r\nContent-Type: image/png\r\nContent-Disposition: attachment; filename=\"p.png\"\r\nContent-Transfer-Encoding: base64\r\n\r\naGk=\r\n--b1--\r\n";
        let parsed = normalize_message(raw).expect("parse should succeed");

        assert_eq!(parsed.body, "");
        assert_eq!(parsed.raw_body, "");
    }
}

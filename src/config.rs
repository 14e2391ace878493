//! Configuration module for the mailbox account and external services
//!
//! All configuration is loaded from environment variables with the
//! `MAIL_AGENT_` prefix. Missing required variables fail at load time;
//! nothing is re-read after startup.

use std::env;
use std::env::VarError;

use secrecy::SecretString;

use crate::errors::{AppError, AppResult};

/// Categories offered to the classification prompt when
/// `MAIL_AGENT_CATEGORIES` is unset.
const DEFAULT_CATEGORIES: &[&str] = &[
    "work",
    "personal",
    "finance",
    "shopping",
    "social",
    "newsletter",
    "spam",
];

/// IMAP account configuration
///
/// Holds connection details and credentials for the single configured
/// account. Passwords are stored using `SecretString` to prevent accidental
/// logging.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    /// IMAP server hostname
    pub host: String,
    /// IMAP server port (typically 993 for TLS)
    pub port: u16,
    /// Username for authentication
    pub user: String,
    /// Password stored in a type that prevents accidental logging
    pub pass: SecretString,
    /// Mailbox to operate on (UTF-7 encoded before SELECT/EXAMINE)
    pub mailbox: String,
    /// TCP connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// IMAP greeting/TLS handshake timeout in milliseconds
    pub greeting_timeout_ms: u64,
    /// Socket I/O timeout in milliseconds
    pub socket_timeout_ms: u64,
}

/// Text-transformation endpoint configuration
///
/// The endpoint speaks the OpenAI chat-completions request/response shape
/// and serves both summarization and classification.
#[derive(Clone)]
pub struct LlmConfig {
    /// Full chat-completions URL (e.g. `http://localhost:1234/v1/chat/completions`)
    pub url: String,
    /// Model identifier sent in every request
    pub model: String,
    /// Optional bearer token; omitted entirely when unset
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Process-wide configuration
///
/// Wraps the account, the external endpoint, and the classification
/// category enumeration. Constructed once and handed to the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// The single configured IMAP account
    pub imap: ImapConfig,
    /// The external text-transformation endpoint
    pub llm: LlmConfig,
    /// Valid classification categories, in prompt order
    pub categories: Vec<String>,
}

impl AppConfig {
    /// Load all configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if required environment variables are missing
    /// or malformed.
    ///
    /// # Example Environment
    ///
    /// ```text
    /// MAIL_AGENT_IMAP_HOST=imap.gmail.com
    /// MAIL_AGENT_IMAP_USER=user@gmail.com
    /// MAIL_AGENT_IMAP_PASS=app-password
    /// MAIL_AGENT_LLM_URL=http://localhost:1234/v1/chat/completions
    /// MAIL_AGENT_LLM_MODEL=qwen2.5-7b-instruct
    /// MAIL_AGENT_CATEGORIES=work, personal, events
    /// ```
    pub fn load_from_env() -> AppResult<Self> {
        let secure = parse_bool_env("MAIL_AGENT_IMAP_SECURE", true)?;
        if !secure {
            return Err(AppError::InvalidInput(
                "MAIL_AGENT_IMAP_SECURE=false is not supported; connections are TLS-only".into(),
            ));
        }

        let imap = ImapConfig {
            host: required_env("MAIL_AGENT_IMAP_HOST")?,
            port: parse_u16_env("MAIL_AGENT_IMAP_PORT", 993)?,
            user: required_env("MAIL_AGENT_IMAP_USER")?,
            pass: SecretString::new(required_env("MAIL_AGENT_IMAP_PASS")?.into()),
            mailbox: optional_env("MAIL_AGENT_IMAP_MAILBOX")?.unwrap_or_else(|| "INBOX".to_owned()),
            connect_timeout_ms: parse_u64_env("MAIL_AGENT_CONNECT_TIMEOUT_MS", 30_000)?,
            greeting_timeout_ms: parse_u64_env("MAIL_AGENT_GREETING_TIMEOUT_MS", 15_000)?,
            socket_timeout_ms: parse_u64_env("MAIL_AGENT_SOCKET_TIMEOUT_MS", 300_000)?,
        };

        let llm = LlmConfig {
            url: required_env("MAIL_AGENT_LLM_URL")?,
            model: required_env("MAIL_AGENT_LLM_MODEL")?,
            api_key: optional_env("MAIL_AGENT_LLM_API_KEY")?.map(|k| SecretString::new(k.into())),
        };

        let categories = match optional_env("MAIL_AGENT_CATEGORIES")? {
            Some(raw) => {
                let parsed = parse_categories(&raw);
                if parsed.is_empty() {
                    return Err(AppError::InvalidInput(
                        "MAIL_AGENT_CATEGORIES is set but contains no categories".into(),
                    ));
                }
                parsed
            }
            None => DEFAULT_CATEGORIES.iter().map(|c| (*c).to_owned()).collect(),
        };

        Ok(Self {
            imap,
            llm,
            categories,
        })
    }
}

/// Split a comma-separated category list, trimming entries and dropping
/// empty ones
fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Read a required environment variable, returning error if missing or empty
fn required_env(key: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::InvalidInput(format!(
            "missing required environment variable {key}"
        ))),
    }
}

/// Read an optional environment variable
///
/// Returns `None` when unset or blank.
///
/// # Errors
///
/// Returns `InvalidInput` if the variable contains non-unicode data.
fn optional_env(key: &str) -> AppResult<Option<String>> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(Some(v)),
        Ok(_) | Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

/// Parse a boolean environment variable with flexible values
///
/// Accepts: `1`, `true`, `yes`, `y`, `on` (truthy) or `0`, `false`, `no`,
/// `n`, `off` (falsy). Case-insensitive. Returns `default` if unset.
///
/// # Errors
///
/// Returns `InvalidInput` if the variable is set to an unrecognized value.
fn parse_bool_env(key: &str, default: bool) -> AppResult<bool> {
    match env::var(key) {
        Ok(v) => parse_bool_value(&v).ok_or_else(|| {
            AppError::InvalidInput(format!("invalid boolean environment variable {key}: '{v}'"))
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

fn parse_bool_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a `u16` environment variable with default fallback
///
/// Returns `default` if unset.
///
/// # Errors
///
/// Returns `InvalidInput` if the variable is set but not a valid `u16`.
fn parse_u16_env(key: &str, default: u16) -> AppResult<u16> {
    match env::var(key) {
        Ok(v) => v.parse::<u16>().map_err(|_| {
            AppError::InvalidInput(format!("invalid u16 environment variable {key}: '{v}'"))
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

/// Parse a `u64` environment variable with default fallback
///
/// Returns `default` if unset.
///
/// # Errors
///
/// Returns `InvalidInput` if the variable is set but not a valid `u64`.
fn parse_u64_env(key: &str, default: u64) -> AppResult<u64> {
    match env::var(key) {
        Ok(v) => v.parse::<u64>().map_err(|_| {
            AppError::InvalidInput(format!("invalid u64 environment variable {key}: '{v}'"))
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

//! In-memory email store and agent tool surface
//!
//! Fetches unseen mail from one IMAP mailbox with peek semantics,
//! normalizes raw MIME into clean text records, and exposes the
//! query/mutation operations an external reasoning process composes:
//! fetch, list, lookups by uid/title/field, summarize and classify
//! through an OpenAI-compatible endpoint, read-flag changes that
//! round-trip through the server, and removal. Every operation returns
//! a structured result, never an error, so an autonomous caller can
//! chain them safely.
//!
//! # Architecture
//!
//! - [`config`]: Environment-driven configuration for account, endpoint, and categories
//! - [`errors`]: Application error model
//! - [`gateway`]: Per-call IMAP transport with timeout wrappers
//! - [`mime`]: Message parsing and header/body normalization
//! - [`html`]: HTML-to-text stripping for HTML-only bodies
//! - [`store`]: In-memory uid-to-record store
//! - [`llm`]: Chat-completion client for summarize/classify calls
//! - [`extract`]: Classification reply parsing
//! - [`models`]: Record types and operation result shapes
//! - [`ops`]: The operation surface (`EmailService`)

pub mod config;
pub mod errors;
pub mod extract;
pub mod gateway;
pub mod html;
pub mod llm;
pub mod mime;
pub mod models;
pub mod ops;
pub mod store;

pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use gateway::{ImapGateway, MailboxGateway};
pub use llm::{ChatProvider, HttpChatClient};
pub use models::{Classification, EmailRecord};
pub use ops::EmailService;
pub use store::EmailStore;

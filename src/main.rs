//! Command-line front-end over the email operation surface
//!
//! One subcommand per operation; results print to stdout as JSON, logs
//! go to stderr. The store lives for one process run, so subcommands
//! that target stored records fetch unseen mail first and then run the
//! requested operation against the populated store.

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use mail_agent_tools::config::AppConfig;
use mail_agent_tools::gateway::ImapGateway;
use mail_agent_tools::llm::HttpChatClient;
use mail_agent_tools::ops::EmailService;

#[derive(Parser)]
#[command(name = "mail-agent-tools", version, about = "Inbox tool surface for an email agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch unseen messages and print the newly stored records
    Fetch,
    /// List every stored record
    List,
    /// Print all stored uids
    Uids,
    /// Print the full record for a uid
    Get { uid: u32 },
    /// Find the first record whose subject contains the query
    Title { query: String },
    /// Map uids to field values for records whose field contains the query
    Match { field: String, query: String },
    /// Print one field of one record
    Field { uid: u32, field: String },
    /// Summarize a record through the configured endpoint
    Summarize { uid: u32 },
    /// Classify a record through the configured endpoint
    Classify { uid: u32 },
    /// Mark a record read, server first
    Mark { uid: u32 },
    /// Mark a record unread, server first
    Unmark { uid: u32 },
    /// Delete a record from the store
    Remove { uid: u32 },
}

/// Application entry point
///
/// Initializes tracing from the environment, loads configuration, and
/// dispatches one operation.
///
/// # Environment Variables
///
/// See [`AppConfig::load_from_env`] for the full configuration surface.
///
/// # Example
///
/// ```text
/// MAIL_AGENT_IMAP_HOST=imap.example.com \
/// MAIL_AGENT_IMAP_USER=user@example.com \
/// MAIL_AGENT_IMAP_PASS=secret \
/// MAIL_AGENT_LLM_URL=http://localhost:1234/v1/chat/completions \
/// MAIL_AGENT_LLM_MODEL=local-model \
/// cargo run -- fetch
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_from_env()?;
    let gateway = ImapGateway::new(config.imap.clone());
    let provider = HttpChatClient::new(&config.llm);
    let mut service = EmailService::new(gateway, provider, config.llm.model, config.categories);

    match cli.command {
        Commands::Fetch => print_json(&service.fetch().await)?,
        Commands::List => {
            service.fetch().await;
            print_json(&service.list())?;
        }
        Commands::Uids => {
            service.fetch().await;
            print_json(&service.uids())?;
        }
        Commands::Get { uid } => {
            service.fetch().await;
            print_json(&service.get_by_uid(uid))?;
        }
        Commands::Title { query } => {
            service.fetch().await;
            print_json(&service.get_by_title(&query))?;
        }
        Commands::Match { field, query } => {
            service.fetch().await;
            print_json(&service.get_by_field_match(&field, &query))?;
        }
        Commands::Field { uid, field } => {
            service.fetch().await;
            print_json(&service.get_field_by_id(uid, &field))?;
        }
        Commands::Summarize { uid } => {
            service.fetch().await;
            print_json(&service.summarize(uid).await)?;
        }
        Commands::Classify { uid } => {
            service.fetch().await;
            print_json(&service.classify(uid).await)?;
        }
        Commands::Mark { uid } => {
            service.fetch().await;
            print_json(&service.mark_as_read(uid).await)?;
        }
        Commands::Unmark { uid } => {
            service.fetch().await;
            print_json(&service.unmark_as_read(uid).await)?;
        }
        Commands::Remove { uid } => {
            service.fetch().await;
            print_json(&service.remove(uid))?;
        }
    }
    Ok(())
}

/// Pretty-print one operation result to stdout
fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

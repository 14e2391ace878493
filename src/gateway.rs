//! Mailbox gateway
//!
//! Thin per-call IMAP client: every operation opens a fresh TLS
//! connection, authenticates, selects the configured mailbox, runs one
//! protocol exchange, and logs out. No session is reused, so the
//! gateway itself carries no connection state and calls never observe
//! each other. All network calls are TLS-only and timeout-bounded.

use std::sync::Arc;
use std::time::Duration;

use async_imap::types::Fetch;
use async_imap::{Client, Session};
use async_trait::async_trait;
use futures::TryStreamExt;
use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::ServerName;
use secrecy::ExposeSecret;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;
use utf7_imap::encode_utf7_imap;

use crate::config::ImapConfig;
use crate::errors::{AppError, AppResult};

/// Authenticated IMAP session over TLS
type ImapSession = Session<tokio_rustls::client::TlsStream<TcpStream>>;

/// The seam between operations and the remote mailbox
///
/// Production uses [`ImapGateway`]; operation tests use an in-memory
/// fake that records peeks and flag stores.
#[async_trait]
pub trait MailboxGateway: Send + Sync {
    /// UIDs of unseen messages in the configured mailbox, ascending
    async fn search_unseen(&self) -> AppResult<Vec<u32>>;

    /// Raw bytes of one message, fetched with peek semantics
    ///
    /// Peek leaves the remote unseen flag untouched.
    async fn fetch_raw(&self, uid: u32) -> AppResult<Vec<u8>>;

    /// Add or remove the `\Seen` flag on one message
    async fn set_read_flag(&self, uid: u32, read: bool) -> AppResult<()>;
}

/// IMAP implementation of [`MailboxGateway`]
///
/// Holds only configuration; connections are opened and closed inside
/// each call. Search and fetch select the mailbox read-only (EXAMINE)
/// so they cannot disturb server-side flags; flag stores select it
/// read-write (SELECT).
#[derive(Debug, Clone)]
pub struct ImapGateway {
    config: ImapConfig,
}

impl ImapGateway {
    /// Create a gateway for the configured account
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }

    fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.config.socket_timeout_ms)
    }

    /// Connect to the IMAP server and authenticate
    ///
    /// Performs the full connection sequence with timeouts:
    /// 1. TCP connect
    /// 2. TLS handshake with webpki root certificates
    /// 3. Read IMAP greeting
    /// 4. LOGIN authentication
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the hostname is invalid for TLS SNI
    /// - `Timeout` if any connection phase times out
    /// - `AuthFailed` if authentication fails
    /// - `Internal` for TCP, TLS, or greeting failures
    async fn connect_authenticated(&self) -> AppResult<ImapSession> {
        let connect_duration = Duration::from_millis(self.config.connect_timeout_ms);
        let greeting_duration = Duration::from_millis(self.config.greeting_timeout_ms);

        let tcp = timeout(
            connect_duration,
            TcpStream::connect((self.config.host.as_str(), self.config.port)),
        )
        .await
        .map_err(|_| AppError::Timeout("tcp connect timeout".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("tcp connect failed: {e}"))))?;

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(tls_config));

        let server_name = ServerName::try_from(self.config.host.clone())
            .map_err(|_| AppError::InvalidInput("invalid IMAP host for TLS SNI".to_owned()))?;
        let tls_stream = timeout(greeting_duration, connector.connect(server_name, tcp))
            .await
            .map_err(|_| AppError::Timeout("TLS handshake timeout".to_owned()))
            .and_then(|r| r.map_err(|e| AppError::Internal(format!("TLS handshake failed: {e}"))))?;

        let mut client = Client::new(tls_stream);
        let greeting = timeout(greeting_duration, client.read_response())
            .await
            .map_err(|_| AppError::Timeout("IMAP greeting timeout".to_owned()))
            .and_then(|r| r.map_err(|e| AppError::Internal(format!("IMAP greeting failed: {e}"))))?;

        if greeting.is_none() {
            return Err(AppError::Internal(
                "IMAP server closed connection before greeting".to_owned(),
            ));
        }

        let pass = self.config.pass.expose_secret();
        let session = timeout(
            greeting_duration,
            client.login(self.config.user.as_str(), pass),
        )
        .await
        .map_err(|_| AppError::Timeout("IMAP login timeout".to_owned()))
        .and_then(|r| {
            r.map_err(|(e, _)| {
                let msg = e.to_string();
                if msg.to_ascii_lowercase().contains("auth") || msg.contains("LOGIN") {
                    AppError::AuthFailed(msg)
                } else {
                    AppError::Internal(msg)
                }
            })
        })?;

        Ok(session)
    }

    /// Select the configured mailbox read-only via EXAMINE
    async fn select_readonly(&self, session: &mut ImapSession) -> AppResult<()> {
        let mailbox = encode_utf7_imap(self.config.mailbox.clone());
        timeout(self.socket_timeout(), session.examine(&mailbox))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "EXAMINE timed out for mailbox '{}'",
                    self.config.mailbox
                ))
            })
            .and_then(|r| {
                r.map_err(|e| {
                    AppError::NotFound(format!(
                        "cannot examine mailbox '{}': {e}",
                        self.config.mailbox
                    ))
                })
            })?;
        Ok(())
    }

    /// Select the configured mailbox read-write via SELECT
    async fn select_readwrite(&self, session: &mut ImapSession) -> AppResult<()> {
        let mailbox = encode_utf7_imap(self.config.mailbox.clone());
        timeout(self.socket_timeout(), session.select(&mailbox))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "SELECT timed out for mailbox '{}'",
                    self.config.mailbox
                ))
            })
            .and_then(|r| {
                r.map_err(|e| {
                    AppError::NotFound(format!(
                        "cannot select mailbox '{}': {e}",
                        self.config.mailbox
                    ))
                })
            })?;
        Ok(())
    }

    /// Log out and close the session, swallowing failures
    ///
    /// Runs on success paths only; error paths drop the session and let
    /// the server reap the connection.
    async fn logout_quietly(&self, mut session: ImapSession) {
        match timeout(self.socket_timeout(), session.logout()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "IMAP logout failed"),
            Err(_) => debug!("IMAP logout timed out"),
        }
    }
}

#[async_trait]
impl MailboxGateway for ImapGateway {
    async fn search_unseen(&self) -> AppResult<Vec<u32>> {
        let mut session = self.connect_authenticated().await?;
        self.select_readonly(&mut session).await?;

        let set = timeout(self.socket_timeout(), session.uid_search("UNSEEN"))
            .await
            .map_err(|_| AppError::Timeout("UID SEARCH timed out".to_owned()))
            .and_then(|r| r.map_err(|e| AppError::Internal(format!("uid search failed: {e}"))))?;
        let mut uids: Vec<u32> = set.into_iter().collect();
        uids.sort_unstable();

        debug!(unseen = uids.len(), "UID SEARCH UNSEEN completed");
        self.logout_quietly(session).await;
        Ok(uids)
    }

    async fn fetch_raw(&self, uid: u32) -> AppResult<Vec<u8>> {
        let mut session = self.connect_authenticated().await?;
        self.select_readonly(&mut session).await?;

        // BODY.PEEK[] keeps the remote unseen flag intact.
        let stream = timeout(
            self.socket_timeout(),
            session.uid_fetch(uid.to_string(), "(BODY.PEEK[])"),
        )
        .await
        .map_err(|_| AppError::Timeout("UID FETCH timed out".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("uid fetch failed: {e}"))))?;
        let fetches: Vec<Fetch> = timeout(self.socket_timeout(), stream.try_collect())
            .await
            .map_err(|_| AppError::Timeout("UID FETCH stream timed out".to_owned()))
            .and_then(|r| {
                r.map_err(|e| AppError::Internal(format!("uid fetch stream failed: {e}")))
            })?;

        let fetch = fetches
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("message uid {uid} not found")))?;
        let body = fetch
            .body()
            .ok_or_else(|| AppError::Internal("message has no body".to_owned()))?
            .to_vec();

        self.logout_quietly(session).await;
        Ok(body)
    }

    async fn set_read_flag(&self, uid: u32, read: bool) -> AppResult<()> {
        let mut session = self.connect_authenticated().await?;
        self.select_readwrite(&mut session).await?;

        let query = if read {
            "+FLAGS.SILENT (\\Seen)"
        } else {
            "-FLAGS.SILENT (\\Seen)"
        };
        let stream = timeout(
            self.socket_timeout(),
            session.uid_store(uid.to_string(), query),
        )
        .await
        .map_err(|_| AppError::Timeout("UID STORE timed out".to_owned()))
        .and_then(|r| r.map_err(|e| AppError::Internal(format!("uid store failed: {e}"))))?;
        let _: Vec<Fetch> = timeout(self.socket_timeout(), stream.try_collect())
            .await
            .map_err(|_| AppError::Timeout("UID STORE stream timed out".to_owned()))
            .and_then(|r| {
                r.map_err(|e| AppError::Internal(format!("uid store stream failed: {e}")))
            })?;

        debug!(uid, read, "UID STORE completed");
        self.logout_quietly(session).await;
        Ok(())
    }
}

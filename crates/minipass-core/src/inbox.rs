//! Inbox abstraction for the payment bot
//!
//! The bot reads Interac notification emails through the `Inbox` trait so the
//! matching pipeline can be exercised in tests without a live mailbox.
//! `ImapInbox` is the production implementation.
//!
//! Connection parameters come from settings (with environment fallbacks):
//! - `IMAP_SERVER` (falls back to `MAIL_SERVER`)
//! - `MAIL_USERNAME` / `MAIL_PASSWORD`
//! - `PROCESSED_FOLDER` - where handled notifications are moved

use tracing::{debug, warn};

use crate::db::Database;
use crate::error::{Error, Result};

/// A candidate notification pulled from the inbox
#[derive(Debug, Clone)]
pub struct InboxMessage {
    pub uid: Option<u32>,
    pub subject: String,
    pub from_email: String,
}

/// Source of payment notification emails
pub trait Inbox {
    /// Fetch messages whose subject contains the given keyword
    fn fetch_notifications(&mut self, subject_keyword: &str) -> Result<Vec<InboxMessage>>;

    /// Move a handled message out of the inbox
    ///
    /// Implementations must leave the message in place when the move fails;
    /// the dedup check on the payment log keeps re-polls harmless.
    fn archive(&mut self, uid: u32) -> Result<()>;

    /// Flush pending deletions and close the connection
    fn disconnect(&mut self) -> Result<()>;
}

/// IMAP connection parameters
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub processed_folder: String,
}

impl ImapConfig {
    /// Load from settings; None when mail credentials are not configured
    pub fn from_settings(db: &Database) -> Result<Option<Self>> {
        let username = db.get_setting_opt("MAIL_USERNAME")?;
        let password = db.get_setting_opt("MAIL_PASSWORD")?;
        let (Some(username), Some(password)) = (username, password) else {
            return Ok(None);
        };

        // Dedicated IMAP server setting first, the SMTP host otherwise
        let server = match db.get_setting_opt("IMAP_SERVER")? {
            Some(server) => server,
            None => db.get_setting("MAIL_SERVER", "imap.gmail.com")?,
        };

        Ok(Some(Self {
            server,
            username,
            password,
            processed_folder: db.get_setting("PROCESSED_FOLDER", "PaymentProcessed")?,
        }))
    }
}

type ImapSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

/// Live IMAP inbox
pub struct ImapInbox {
    session: ImapSession,
    processed_folder: String,
}

impl ImapInbox {
    /// Connect over TLS and select INBOX
    pub fn connect(config: &ImapConfig) -> Result<Self> {
        let tls = native_tls::TlsConnector::builder()
            .build()
            .map_err(|e| Error::Inbox(format!("TLS setup failed: {}", e)))?;

        let client = imap::connect(
            (config.server.as_str(), 993),
            config.server.as_str(),
            &tls,
        )
        .map_err(|e| Error::Inbox(format!("IMAP connect to {} failed: {}", config.server, e)))?;

        let mut session = client
            .login(&config.username, &config.password)
            .map_err(|(e, _)| Error::Inbox(format!("IMAP login failed: {}", e)))?;

        session
            .select("INBOX")
            .map_err(|e| Error::Inbox(format!("Failed to select INBOX: {}", e)))?;

        Ok(Self {
            session,
            processed_folder: config.processed_folder.clone(),
        })
    }
}

impl Inbox for ImapInbox {
    fn fetch_notifications(&mut self, subject_keyword: &str) -> Result<Vec<InboxMessage>> {
        // IMAP SEARCH matches substrings and strips encoded-words server-side
        let query = format!("SUBJECT \"{}\"", subject_keyword.replace('"', ""));
        let uids = self
            .session
            .uid_search(&query)
            .map_err(|e| Error::Inbox(format!("IMAP search failed: {}", e)))?;

        let mut messages = Vec::new();
        for uid in uids {
            let fetches = self
                .session
                .uid_fetch(uid.to_string(), "RFC822.HEADER")
                .map_err(|e| Error::Inbox(format!("IMAP fetch failed: {}", e)))?;

            for fetch in fetches.iter() {
                let Some(header_bytes) = fetch.header() else {
                    continue;
                };
                let (headers, _) = mailparse::parse_headers(header_bytes)
                    .map_err(|e| Error::Inbox(format!("Header parse failed: {}", e)))?;

                use mailparse::MailHeaderMap;
                let subject = headers.get_first_value("Subject").unwrap_or_default();
                let from_raw = headers.get_first_value("From").unwrap_or_default();
                let from_email = parse_from_address(&from_raw);

                messages.push(InboxMessage {
                    uid: Some(uid),
                    subject,
                    from_email,
                });
            }
        }

        debug!(count = messages.len(), "Fetched notification candidates");
        Ok(messages)
    }

    fn archive(&mut self, uid: u32) -> Result<()> {
        // Create-if-missing; most servers return an ignorable error when the
        // folder already exists
        if let Err(e) = self.session.create(&self.processed_folder) {
            debug!(folder = %self.processed_folder, error = %e, "Folder create skipped");
        }

        self.session
            .uid_copy(uid.to_string(), &self.processed_folder)
            .map_err(|e| {
                Error::Inbox(format!(
                    "Could not copy message to {}: {}",
                    self.processed_folder, e
                ))
            })?;

        // Only flag for deletion after a successful copy
        self.session
            .uid_store(uid.to_string(), "+FLAGS (\\Deleted)")
            .map_err(|e| Error::Inbox(format!("Could not flag message deleted: {}", e)))?;

        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Err(e) = self.session.expunge() {
            warn!("IMAP expunge failed: {}", e);
        }
        self.session
            .logout()
            .map_err(|e| Error::Inbox(format!("IMAP logout failed: {}", e)))?;
        Ok(())
    }
}

/// Extract the bare address from a From header value
fn parse_from_address(raw: &str) -> String {
    match mailparse::addrparse(raw) {
        Ok(list) => list
            .iter()
            .find_map(|addr| match addr {
                mailparse::MailAddr::Single(info) => Some(info.addr.clone()),
                mailparse::MailAddr::Group(group) => {
                    group.addrs.first().map(|a| a.addr.clone())
                }
            })
            .unwrap_or_else(|| raw.trim().to_string()),
        Err(_) => raw.trim().to_string(),
    }
}

/// In-memory inbox for tests
#[cfg(any(test, feature = "test-utils"))]
pub struct MockInbox {
    pub messages: Vec<InboxMessage>,
    pub archived: Vec<u32>,
    pub disconnected: bool,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockInbox {
    pub fn new(messages: Vec<InboxMessage>) -> Self {
        Self {
            messages,
            archived: Vec::new(),
            disconnected: false,
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Inbox for MockInbox {
    fn fetch_notifications(&mut self, subject_keyword: &str) -> Result<Vec<InboxMessage>> {
        let keyword = subject_keyword.to_lowercase();
        Ok(self
            .messages
            .iter()
            .filter(|m| m.subject.to_lowercase().contains(&keyword))
            .cloned()
            .collect())
    }

    fn archive(&mut self, uid: u32) -> Result<()> {
        self.archived.push(uid);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.disconnected = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_address_display_name() {
        assert_eq!(
            parse_from_address("Interac <notify@payments.interac.ca>"),
            "notify@payments.interac.ca"
        );
    }

    #[test]
    fn test_parse_from_address_bare() {
        assert_eq!(
            parse_from_address("notify@payments.interac.ca"),
            "notify@payments.interac.ca"
        );
    }
}

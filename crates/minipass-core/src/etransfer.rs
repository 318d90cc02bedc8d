//! Interac e-transfer notification parsing
//!
//! Interac notification subjects come in two French formats:
//!
//! - `Virement Interac : Remi Methot vous a envoyé 15,00 $`
//! - `Virement Interac : vous avez reçu 50,00 $ de Remi Methot et ce montant
//!   a été déposé automatiquement`
//!
//! Amounts use a comma as the decimal separator. Messages from unexpected
//! senders or with unrecognized subjects are skipped, never errors: the
//! inbox is shared with regular mail.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// A parsed e-transfer notification
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParsedTransfer {
    /// Sender name as the bank reports it
    pub sender_name: String,
    pub amount: f64,
    pub subject: String,
    pub from_email: String,
    /// IMAP UID, when the message came from a live mailbox
    pub uid: Option<u32>,
}

/// Validation settings for notification emails
#[derive(Debug, Clone)]
pub struct TransferFilter {
    /// Required subject prefix (case-insensitive)
    pub subject_keyword: String,
    /// Required sender address (case-insensitive exact match)
    pub expected_from: String,
}

impl Default for TransferFilter {
    fn default() -> Self {
        Self {
            subject_keyword: "Virement Interac :".to_string(),
            expected_from: "notify@payments.interac.ca".to_string(),
        }
    }
}

fn received_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // \s is Unicode-aware and covers the non-breaking thousands separator
    RE.get_or_init(|| Regex::new(r"reçu\s([\d\s]*\d,?\d*)\s*\$\s*de").unwrap())
}

fn received_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"de\s(.+?)\set ce montant").unwrap())
}

fn sent_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"envoyé\s([\d\s]*\d,?\d*)\s*\$").unwrap())
}

fn sent_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":\s*(.*?)\svous a envoyé").unwrap())
}

/// Parse a bank amount string ("15,00", "1 250,50") into f64
fn parse_amount(raw: &str) -> Option<f64> {
    let normalized: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    normalized.parse().ok()
}

/// Parse one notification's subject and sender into a transfer
///
/// Returns None when the message is not a conforming Interac notification.
pub fn parse_transfer(
    subject: &str,
    from_email: &str,
    uid: Option<u32>,
    filter: &TransferFilter,
) -> Option<ParsedTransfer> {
    let subject = subject.trim();

    if !subject
        .to_lowercase()
        .starts_with(&filter.subject_keyword.to_lowercase())
    {
        return None;
    }
    if !from_email.eq_ignore_ascii_case(&filter.expected_from) {
        debug!(from = from_email, "Ignored email from unexpected sender");
        return None;
    }

    // "reçu <amt> $ de <name> et ce montant" format first,
    // then the "<name> vous a envoyé <amt> $" fallback
    let mut amount = received_amount_re()
        .captures(subject)
        .and_then(|c| parse_amount(&c[1]));
    let mut name = received_name_re()
        .captures(subject)
        .map(|c| c[1].trim().to_string());

    if amount.is_none() {
        amount = sent_amount_re()
            .captures(subject)
            .and_then(|c| parse_amount(&c[1]));
    }
    if name.is_none() {
        name = sent_name_re()
            .captures(subject)
            .map(|c| c[1].trim().to_string());
    }

    match (amount, name) {
        (Some(amount), Some(sender_name)) if !sender_name.is_empty() => Some(ParsedTransfer {
            sender_name,
            amount,
            subject: subject.to_string(),
            from_email: from_email.to_string(),
            uid,
        }),
        _ => {
            debug!(subject, "Skipped unmatched notification subject");
            None
        }
    }
}

//! E-transfer payment matching
//!
//! Matches parsed Interac notifications against unpaid passports by fuzzy
//! name similarity plus an amount check, marks the winner paid, and records
//! every outcome in the payment log.

use tracing::{debug, info, warn};

use crate::db::{Database, NewEbankPayment};
use crate::error::Result;
use crate::etransfer::{parse_transfer, ParsedTransfer, TransferFilter};
use crate::inbox::Inbox;
use crate::mailer::Mailer;
use crate::models::{MatchResult, PassportWithMember};

/// Identity recorded on passes the bot marks paid
pub const BOT_IDENTITY: &str = "payment-bot";

/// Payment bot configuration, loaded from settings
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Minimum name similarity score (0-100) to accept a match
    pub threshold: i64,
    pub filter: TransferFilter,
}

impl BotConfig {
    pub fn from_settings(db: &Database) -> Result<Self> {
        Ok(Self {
            threshold: db.get_setting_i64("BANK_EMAIL_NAME_CONFIDENCE", 85)?,
            filter: TransferFilter {
                subject_keyword: db.get_setting("BANK_EMAIL_SUBJECT", "Virement Interac :")?,
                expected_from: db
                    .get_setting("BANK_EMAIL_FROM", "notify@payments.interac.ca")?,
            },
        })
    }
}

/// Counts from one bot run
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MatchingReport {
    pub fetched: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub skipped: usize,
}

/// Similarity score between a bank sender name and a pass holder name, 0-100
///
/// Bank names come through with varying order and casing ("METHOT REMI" vs
/// "Remi Methot"), so the score is the best of plain Jaro-Winkler,
/// token-sorted Jaro-Winkler, and a containment check.
pub fn name_similarity(a: &str, b: &str) -> i64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b || a.contains(&b) || b.contains(&a) {
        return 100;
    }

    let plain = strsim::jaro_winkler(&a, &b);

    let mut a_tokens: Vec<&str> = a.split_whitespace().collect();
    let mut b_tokens: Vec<&str> = b.split_whitespace().collect();
    a_tokens.sort_unstable();
    b_tokens.sort_unstable();
    let token_sorted = strsim::jaro_winkler(&a_tokens.join(" "), &b_tokens.join(" "));

    (plain.max(token_sorted) * 100.0).round() as i64
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the best unpaid passport for a transfer
///
/// Requires score >= threshold and |sold_amt - amount| < 1.0; ties go to the
/// higher score.
pub fn find_best_match<'a>(
    transfer: &ParsedTransfer,
    unpaid: &'a [PassportWithMember],
    threshold: i64,
) -> Option<(&'a PassportWithMember, i64)> {
    let mut best: Option<(&PassportWithMember, i64)> = None;

    for candidate in unpaid {
        let score = name_similarity(&transfer.sender_name, &candidate.member_name);
        if score < threshold {
            continue;
        }
        if (candidate.passport.sold_amt - transfer.amount).abs() >= 1.0 {
            debug!(
                pass_code = %candidate.passport.pass_code,
                score,
                expected = candidate.passport.sold_amt,
                received = transfer.amount,
                "Name matched but amount differs"
            );
            continue;
        }
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    best
}

/// Process the inbox once: fetch, parse, match, mark paid, archive
///
/// Every conforming notification produces a payment log row (MATCHED or
/// NO_MATCH). Already-seen subjects are skipped so a failed archive can't
/// double-pay a pass. Email send failures are logged and never abort the run.
pub fn run_payment_bot<I: Inbox>(
    db: &Database,
    inbox: &mut I,
    mailer: Option<&Mailer>,
    config: &BotConfig,
) -> Result<MatchingReport> {
    let mut report = MatchingReport::default();

    let messages = inbox.fetch_notifications(&config.filter.subject_keyword)?;
    report.fetched = messages.len();
    info!(count = messages.len(), "Payment bot fetched notifications");

    for message in messages {
        let Some(transfer) = parse_transfer(
            &message.subject,
            &message.from_email,
            message.uid,
            &config.filter,
        ) else {
            report.skipped += 1;
            continue;
        };

        if db.ebank_payment_seen(&transfer.subject)? {
            debug!(subject = %transfer.subject, "Notification already processed");
            report.skipped += 1;
            continue;
        }

        // Re-query per transfer: an earlier match in this run may have
        // removed a pass from the pool
        let unpaid = db.list_unpaid_passports()?;

        match find_best_match(&transfer, &unpaid, config.threshold) {
            Some((candidate, score)) => {
                let passport = db.mark_passport_paid(candidate.passport.id, BOT_IDENTITY)?;
                db.record_ebank_payment(&NewEbankPayment {
                    from_email: Some(&transfer.from_email),
                    subject: &transfer.subject,
                    bank_name: &transfer.sender_name,
                    bank_amount: transfer.amount,
                    matched_passport_id: Some(passport.id),
                    matched_name: Some(&candidate.member_name),
                    matched_amount: Some(passport.sold_amt),
                    name_score: score,
                    result: MatchResult::Matched,
                    marked_paid: true,
                    note: Some("Matched by payment bot"),
                })?;
                info!(
                    pass_code = %passport.pass_code,
                    holder = %candidate.member_name,
                    amount = transfer.amount,
                    score,
                    "Payment matched"
                );
                report.matched += 1;

                if let Some(mailer) = mailer {
                    if let Err(e) = mailer.notify_payment_received(db, &passport) {
                        warn!("Payment confirmation email failed: {}", e);
                    }
                }

                if let Some(uid) = transfer.uid {
                    if let Err(e) = inbox.archive(uid) {
                        // Leave the message; the dedup check covers the re-poll
                        warn!("Could not archive notification: {}", e);
                    }
                }
            }
            None => {
                db.record_ebank_payment(&NewEbankPayment {
                    from_email: Some(&transfer.from_email),
                    subject: &transfer.subject,
                    bank_name: &transfer.sender_name,
                    bank_amount: transfer.amount,
                    matched_passport_id: None,
                    matched_name: None,
                    matched_amount: None,
                    name_score: 0,
                    result: MatchResult::NoMatch,
                    marked_paid: false,
                    note: Some("No matching passport found"),
                })?;
                info!(
                    sender = %transfer.sender_name,
                    amount = transfer.amount,
                    "No matching passport"
                );
                report.unmatched += 1;
            }
        }
    }

    inbox.disconnect()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::inbox::{InboxMessage, MockInbox};
    use crate::models::{NewActivity, NewPassport};

    fn db_with_unpaid(name: &str, amount: f64) -> (Database, i64) {
        let db = Database::in_memory().unwrap();
        let activity_id = db
            .create_activity(
                &NewActivity {
                    name: "Tuesday Hockey".into(),
                    activity_type: None,
                    description: None,
                    start_date: None,
                    end_date: None,
                    status: None,
                },
                None,
            )
            .unwrap();
        let passport = db
            .create_passport(
                &NewPassport {
                    member_name: name.into(),
                    member_email: "holder@example.com".into(),
                    member_phone: None,
                    activity_id,
                    passport_type_id: None,
                    sold_amt: amount,
                    uses_remaining: 4,
                    paid: false,
                    notes: None,
                },
                None,
            )
            .unwrap();
        (db, passport.id)
    }

    fn bot_config() -> BotConfig {
        BotConfig {
            threshold: 85,
            filter: crate::etransfer::TransferFilter::default(),
        }
    }

    #[test]
    fn test_bot_matches_and_marks_paid() {
        let (db, passport_id) = db_with_unpaid("Remi Methot", 50.0);
        let mut inbox = MockInbox::new(vec![InboxMessage {
            uid: Some(7),
            subject: "Virement Interac : Remi Methot vous a envoyé 50,00 $".into(),
            from_email: "notify@payments.interac.ca".into(),
        }]);

        let report = run_payment_bot(&db, &mut inbox, None, &bot_config()).unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.matched, 1);
        assert_eq!(report.unmatched, 0);

        let passport = db.get_passport(passport_id).unwrap();
        assert!(passport.paid);
        assert_eq!(passport.marked_paid_by.as_deref(), Some(BOT_IDENTITY));

        // The message was archived and the connection closed
        assert_eq!(inbox.archived, vec![7]);
        assert!(inbox.disconnected);

        let log = db.list_ebank_payments(10).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].result, crate::models::MatchResult::Matched);
        assert_eq!(log[0].name_score, 100);
    }

    #[test]
    fn test_bot_amount_mismatch_logs_no_match() {
        let (db, passport_id) = db_with_unpaid("Remi Methot", 80.0);
        let mut inbox = MockInbox::new(vec![InboxMessage {
            uid: Some(3),
            subject: "Virement Interac : Remi Methot vous a envoyé 50,00 $".into(),
            from_email: "notify@payments.interac.ca".into(),
        }]);

        let report = run_payment_bot(&db, &mut inbox, None, &bot_config()).unwrap();
        assert_eq!(report.matched, 0);
        assert_eq!(report.unmatched, 1);
        assert!(!db.get_passport(passport_id).unwrap().paid);
        assert!(inbox.archived.is_empty());
    }

    #[test]
    fn test_bot_skips_already_seen_subject() {
        let (db, _) = db_with_unpaid("Remi Methot", 50.0);
        let subject = "Virement Interac : Remi Methot vous a envoyé 50,00 $";
        let message = InboxMessage {
            uid: Some(4),
            subject: subject.into(),
            from_email: "notify@payments.interac.ca".into(),
        };

        let mut inbox = MockInbox::new(vec![message.clone()]);
        run_payment_bot(&db, &mut inbox, None, &bot_config()).unwrap();

        // Same notification shows up again (archive failed upstream)
        let mut inbox = MockInbox::new(vec![message]);
        let report = run_payment_bot(&db, &mut inbox, None, &bot_config()).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.matched, 0);
        assert_eq!(db.list_ebank_payments(10).unwrap().len(), 1);
    }

    #[test]
    fn test_bot_best_score_wins() {
        let (db, exact_id) = db_with_unpaid("Remi Methot", 50.0);
        // Second unpaid pass with a near-miss name and the same amount
        let activity_id = db.get_passport(exact_id).unwrap().activity_id;
        db.create_passport(
            &NewPassport {
                member_name: "Remy Methot".into(),
                member_email: "other@example.com".into(),
                member_phone: None,
                activity_id,
                passport_type_id: None,
                sold_amt: 50.0,
                uses_remaining: 4,
                paid: false,
                notes: None,
            },
            None,
        )
        .unwrap();

        let unpaid = db.list_unpaid_passports().unwrap();
        let transfer = crate::etransfer::ParsedTransfer {
            sender_name: "Remi Methot".into(),
            amount: 50.0,
            subject: "s".into(),
            from_email: "notify@payments.interac.ca".into(),
            uid: None,
        };
        let (best, score) = find_best_match(&transfer, &unpaid, 85).unwrap();
        assert_eq!(best.passport.id, exact_id);
        assert_eq!(score, 100);
    }

    #[test]
    fn test_identical_names() {
        assert_eq!(name_similarity("Remi Methot", "Remi Methot"), 100);
    }

    #[test]
    fn test_case_and_spacing_insensitive() {
        assert_eq!(name_similarity("  REMI   METHOT ", "remi methot"), 100);
    }

    #[test]
    fn test_token_order_insensitive() {
        assert_eq!(name_similarity("Methot Remi", "Remi Methot"), 100);
    }

    #[test]
    fn test_containment_scores_full() {
        assert_eq!(name_similarity("Remi Methot", "Remi"), 100);
    }

    #[test]
    fn test_unrelated_names_score_low() {
        assert!(name_similarity("Remi Methot", "Alexandra Wong") < 85);
    }

    #[test]
    fn test_minor_typo_scores_high() {
        assert!(name_similarity("Remi Methot", "Remy Methot") >= 85);
    }

    #[test]
    fn test_empty_name_scores_zero() {
        assert_eq!(name_similarity("", "Remi Methot"), 0);
    }
}

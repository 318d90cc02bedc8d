//! SQL validation for the chatbot
//!
//! Generated SQL is never trusted: only single SELECT statements against
//! whitelisted tables are executed, over a connection that can roll back
//! nothing because it never writes. A LIMIT is appended when missing.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Row cap appended to queries without an explicit LIMIT
pub const MAX_RESULT_ROWS: usize = 100;

/// Keywords that must never appear in a generated query
const BLOCKED_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "REPLACE", "TRUNCATE", "ATTACH",
    "DETACH", "PRAGMA", "VACUUM", "REINDEX", "GRANT", "REVOKE", "EXEC", "EXECUTE",
];

/// Tables the chatbot may read
///
/// Credential-bearing tables (admins, admin_sessions, settings) and raw bank
/// notification data (ebank_payments) are deliberately absent.
const ALLOWED_TABLES: &[&str] = &[
    "activities",
    "passport_types",
    "passports",
    "members",
    "signups",
    "redemptions",
    "incomes",
    "expenses",
    "surveys",
    "survey_templates",
    "survey_responses",
    "reminder_logs",
    "email_logs",
    "audit_log",
    "chat_queries",
    "monthly_financial_summary",
];

fn dangerous_patterns() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i);\s*\w",            // statement chaining
            r"--",                    // line comments
            r"(?is)/\*.*?\*/",        // block comments
            r"(?i)\bchar\s*\(",       // obfuscation helpers
            r"(?i)\bload_extension\s*\(",
            r"(?i)\bunion\s+all\s+select\b",
            r"(?i)\binto\s+(outfile|dumpfile)\b",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn table_reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:from|join)\s+([a-zA-Z_][a-zA-Z0-9_]*)").unwrap())
}

fn limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blimit\s+\d+").unwrap())
}

/// Validate and sanitize a generated SQL statement
///
/// Returns the statement with whitespace collapsed, the trailing semicolon
/// stripped, and a LIMIT appended when missing.
pub fn validate_sql(sql: &str) -> Result<String> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(Error::BlockedQuery("Empty SQL query".to_string()));
    }

    let upper = sql.to_uppercase();
    let tokens: std::collections::HashSet<&str> = upper
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .collect();
    for keyword in BLOCKED_KEYWORDS {
        if tokens.contains(keyword) {
            return Err(Error::BlockedQuery(format!(
                "Blocked SQL keyword: {}",
                keyword
            )));
        }
    }

    if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
        return Err(Error::BlockedQuery(
            "Only SELECT statements are allowed".to_string(),
        ));
    }

    for pattern in dangerous_patterns() {
        if pattern.is_match(sql) {
            return Err(Error::BlockedQuery(
                "Query contains a disallowed pattern".to_string(),
            ));
        }
    }

    // CTE names introduced by WITH are legal "tables"; collect them first
    let cte_names: Vec<String> = cte_name_re()
        .captures_iter(sql)
        .map(|c| c[1].to_lowercase())
        .collect();

    for capture in table_reference_re().captures_iter(sql) {
        let table = capture[1].to_lowercase();
        if !ALLOWED_TABLES.contains(&table.as_str()) && !cte_names.contains(&table) {
            return Err(Error::BlockedQuery(format!(
                "Access to table '{}' is not allowed",
                table
            )));
        }
    }

    // Collapse whitespace and strip the trailing semicolon
    let mut sanitized = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    while sanitized.ends_with(';') {
        sanitized.pop();
    }

    if !limit_re().is_match(&sanitized) {
        sanitized = format!("{} LIMIT {}", sanitized, MAX_RESULT_ROWS);
    }

    Ok(sanitized)
}

fn cte_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b([a-zA-Z_][a-zA-Z0-9_]*)\s+as\s*\(").unwrap())
}

/// Mask emails and phone numbers in a text value
///
/// Result rows can contain member contact details; the chat surface only
/// ever sees masked versions.
pub fn mask_pii(text: &str) -> String {
    let masked = email_re()
        .replace_all(text, |caps: &regex::Captures<'_>| mask_email(&caps[0]))
        .into_owned();
    phone_re()
        .replace_all(&masked, |caps: &regex::Captures<'_>| mask_phone(&caps[0]))
        .into_owned()
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
    })
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap())
}

fn mask_email(email: &str) -> String {
    let Some((user, domain)) = email.split_once('@') else {
        return "*".repeat(email.len());
    };
    let masked_user = mask_word(user);
    let masked_domain = match domain.split_once('.') {
        Some((host, rest)) => format!("{}.{}", mask_word(host), rest),
        None => mask_word(domain),
    };
    format!("{}@{}", masked_user, masked_domain)
}

fn mask_word(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() <= 2 {
        "*".repeat(chars.len())
    } else {
        format!(
            "{}{}{}",
            chars[0],
            "*".repeat(chars.len() - 2),
            chars[chars.len() - 1]
        )
    }
}

fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("({}) ***-****", &digits[..3])
    } else {
        "*".repeat(phone.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_passes() {
        let sql = validate_sql("SELECT name FROM activities").unwrap();
        assert_eq!(sql, "SELECT name FROM activities LIMIT 100");
    }

    #[test]
    fn test_existing_limit_preserved() {
        let sql = validate_sql("SELECT name FROM activities LIMIT 5").unwrap();
        assert_eq!(sql, "SELECT name FROM activities LIMIT 5");
    }

    #[test]
    fn test_trailing_semicolon_stripped() {
        let sql = validate_sql("SELECT name FROM activities;").unwrap();
        assert!(!sql.contains(';'));
    }

    #[test]
    fn test_insert_blocked() {
        assert!(validate_sql("INSERT INTO activities (name) VALUES ('x')").is_err());
    }

    #[test]
    fn test_statement_chaining_blocked() {
        assert!(validate_sql("SELECT 1; SELECT 2").is_err());
    }

    #[test]
    fn test_comment_blocked() {
        assert!(validate_sql("SELECT name FROM activities -- sneaky").is_err());
    }

    #[test]
    fn test_settings_table_blocked() {
        assert!(validate_sql("SELECT value FROM settings").is_err());
    }

    #[test]
    fn test_admins_table_blocked() {
        assert!(validate_sql("SELECT password_hash FROM admins").is_err());
    }

    #[test]
    fn test_view_allowed() {
        assert!(validate_sql("SELECT * FROM monthly_financial_summary").is_ok());
    }

    #[test]
    fn test_join_table_checked() {
        assert!(validate_sql(
            "SELECT m.name FROM passports p JOIN admin_sessions m ON 1=1"
        )
        .is_err());
    }

    #[test]
    fn test_cte_allowed() {
        let sql = "WITH monthly AS (SELECT strftime('%Y-%m', created_at) m, COUNT(*) c \
                   FROM passports GROUP BY m) SELECT * FROM monthly";
        assert!(validate_sql(sql).is_ok());
    }

    #[test]
    fn test_mask_email() {
        let masked = mask_pii("contact remi.methot@example.com please");
        assert!(!masked.contains("remi.methot@example.com"));
        assert!(masked.contains('@'));
        assert!(masked.contains(".com"));
    }

    #[test]
    fn test_mask_phone() {
        let masked = mask_pii("call 514-555-1234");
        assert!(!masked.contains("555-1234"));
        assert!(masked.contains("(514)"));
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(mask_pii("Tuesday Hockey"), "Tuesday Hockey");
    }
}

//! Natural-language analytics over the application database
//!
//! Pipeline: detect the question's language, collect semantic glossary
//! hints, hand schema + hints + question to the AI backend for SQL
//! generation, validate the result with the SQL guard, execute read-only,
//! mask PII in the rows, and log the query.
//!
//! The AI never executes anything: every statement passes through
//! `sqlguard::validate_sql` first, and guard rejections are final.

mod glossary;
mod language;
mod sqlguard;

pub use glossary::context_hints;
pub use language::{detect_language, Language};
pub use sqlguard::{mask_pii, validate_sql, MAX_RESULT_ROWS};

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::ai::{AiBackend, AiClient};
use crate::db::Database;
use crate::error::{Error, Result};

/// Schema description included in every generation prompt
///
/// Only whitelisted tables appear here; the model has no reason to learn
/// about credential tables it could never query anyway.
const SCHEMA_SUMMARY: &str = r#"
Tables (SQLite):
- activities(id, name, activity_type, description, start_date, end_date, status, created_at)
- passport_types(id, activity_id, name, kind, price_per_user, sessions_included, target_revenue, status)
- passports(id, pass_code, member_id, activity_id, passport_type_id, passport_type_name,
  sold_amt, uses_remaining, paid, paid_date, created_at)
- members(id, name, email, phone, created_at)
- signups(id, member_id, activity_id, passport_type_id, subject, status, paid, created_at)
- redemptions(id, passport_id, redeemed_at, redeemed_by)
- incomes(id, activity_id, date, amount, description, category, payment_status)
- expenses(id, activity_id, date, amount, description, category, payment_status, due_date, payment_date)
- surveys(id, survey_token, activity_id, template_id, name, status, created_at)
- survey_responses(id, survey_id, passport_id, answers_json, submitted_at)
- monthly_financial_summary(month, activity_id, activity_name, passport_sales, other_income,
  cash_received, cash_paid, net_cash_flow, accounts_receivable, accounts_payable,
  total_revenue, total_expenses, net_income) -- a view, one row per month and activity
"#;

/// A chat answer: the executed SQL and masked result rows
#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub question: String,
    pub language: String,
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub row_count: i64,
    pub duration_ms: i64,
}

/// The chatbot query engine
pub struct ChatEngine {
    db: Database,
    ai: AiClient,
}

impl ChatEngine {
    pub fn new(db: Database, ai: AiClient) -> Self {
        Self { db, ai }
    }

    /// Answer a natural-language question about the data
    ///
    /// Every attempt is logged to `chat_queries`, including guard
    /// rejections and backend failures.
    pub async fn ask(&self, question: &str) -> Result<ChatAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidData("Question is empty".to_string()));
        }

        let started = Instant::now();
        let language = detect_language(question);

        let result = self.generate_and_run(question, language).await;
        let duration_ms = started.elapsed().as_millis() as i64;

        match result {
            Ok((sql, columns, rows)) => {
                let row_count = rows.len() as i64;
                self.db.log_chat_query(
                    question,
                    language.as_str(),
                    Some(&sql),
                    true,
                    None,
                    row_count,
                    duration_ms,
                )?;
                info!(language = language.as_str(), rows = row_count, "Chat query answered");
                Ok(ChatAnswer {
                    question: question.to_string(),
                    language: language.as_str().to_string(),
                    sql,
                    columns,
                    rows,
                    row_count,
                    duration_ms,
                })
            }
            Err(e) => {
                self.db.log_chat_query(
                    question,
                    language.as_str(),
                    None,
                    false,
                    Some(&e.to_string()),
                    0,
                    duration_ms,
                )?;
                Err(e)
            }
        }
    }

    async fn generate_and_run(
        &self,
        question: &str,
        language: Language,
    ) -> Result<(
        String,
        Vec<String>,
        Vec<serde_json::Map<String, serde_json::Value>>,
    )> {
        let prompt = build_prompt(question, language);
        debug!(language = language.as_str(), "Generating SQL");

        let completion = self.ai.generate_sql(&prompt).await?;
        let raw_sql = extract_sql(&completion)?;
        let sql = validate_sql(&raw_sql)?;

        let (columns, rows) = self.execute_readonly(&sql)?;
        Ok((sql, columns, rows))
    }

    /// Execute validated SQL and mask PII in the result rows
    fn execute_readonly(
        &self,
        sql: &str,
    ) -> Result<(Vec<String>, Vec<serde_json::Map<String, serde_json::Value>>)> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let column_count = columns.len();

        let mut rows = Vec::new();
        let mut raw_rows = stmt.query([])?;
        while let Some(row) = raw_rows.next()? {
            let mut object = serde_json::Map::new();
            for (i, name) in columns.iter().enumerate().take(column_count) {
                let value = match row.get_ref(i)? {
                    rusqlite::types::ValueRef::Null => serde_json::Value::Null,
                    rusqlite::types::ValueRef::Integer(v) => serde_json::Value::from(v),
                    rusqlite::types::ValueRef::Real(v) => serde_json::Value::from(v),
                    rusqlite::types::ValueRef::Text(v) => {
                        serde_json::Value::from(mask_pii(&String::from_utf8_lossy(v)))
                    }
                    rusqlite::types::ValueRef::Blob(_) => {
                        serde_json::Value::from("<binary>")
                    }
                };
                object.insert(name.clone(), value);
            }
            rows.push(object);
        }

        Ok((columns, rows))
    }
}

/// Build the SQL generation prompt
fn build_prompt(question: &str, language: Language) -> String {
    let hints = context_hints(question);
    let hints_block = if hints.is_empty() {
        String::new()
    } else {
        format!("Context hints:\n- {}\n\n", hints.join("\n- "))
    };

    let language_note = match language {
        Language::French => "The question is in French; column aliases may be French.\n",
        Language::English => "",
    };

    format!(
        "You translate questions about a sports pass management database into SQLite SQL.\n\
         {SCHEMA_SUMMARY}\n\
         {hints_block}{language_note}\
         Write ONE SELECT statement answering the question. No commentary, no DDL, no \
         modification statements. Return only SQL.\n\n\
         Question: {question}"
    )
}

/// Extract the SQL statement from a model completion
///
/// Handles code fences and leading prose; the first SELECT (or WITH) through
/// the end of the statement wins.
pub fn extract_sql(completion: &str) -> Result<String> {
    let mut text = completion.trim();

    // Strip markdown fences
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let after = after.strip_prefix("sql").or(after.strip_prefix("SQL")).unwrap_or(after);
        match after.find("```") {
            Some(end) => text = after[..end].trim(),
            None => text = after.trim(),
        }
    }

    // Locate the statement on the original text. A WITH only anchors the
    // statement when it actually opens a CTE; prose like "a query with a
    // join: SELECT ..." must anchor at the SELECT.
    let select_pos = select_re().find(text).map(|m| m.start());
    let with_pos = with_re().find(text).map(|m| m.start());
    let start = match (with_pos, select_pos) {
        (Some(w), Some(s)) if w < s && cte_re().is_match(&text[w..s]) => w,
        (_, Some(s)) => s,
        (Some(w), None) if cte_re().is_match(&text[w..]) => w,
        _ => {
            return Err(Error::Chat(
                "No SELECT statement in model output".to_string(),
            ))
        }
    };

    let statement = &text[start..];
    let statement = match statement.find(';') {
        Some(end) => &statement[..end],
        None => statement,
    };

    let trimmed = statement.trim();
    if trimmed.is_empty() {
        return Err(Error::Chat("No SELECT statement in model output".to_string()));
    }
    Ok(trimmed.to_string())
}

fn select_re() -> &'static regex::Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"(?i)\bselect\b").unwrap())
}

fn with_re() -> &'static regex::Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"(?i)\bwith\b").unwrap())
}

fn cte_re() -> &'static regex::Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"(?i)^with\s+\w+\s+as\s*\(").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;

    fn engine_with(completion: &str) -> ChatEngine {
        let db = Database::in_memory().unwrap();
        ChatEngine::new(db, AiClient::Mock(MockBackend::with_completion(completion)))
    }

    #[test]
    fn test_extract_plain_sql() {
        let sql = extract_sql("SELECT 1 AS one").unwrap();
        assert_eq!(sql, "SELECT 1 AS one");
    }

    #[test]
    fn test_extract_fenced_sql() {
        let sql = extract_sql("Here you go:\n```sql\nSELECT name FROM activities;\n```").unwrap();
        assert_eq!(sql, "SELECT name FROM activities");
    }

    #[test]
    fn test_extract_with_prose() {
        let sql = extract_sql("The query is: SELECT COUNT(*) FROM passports").unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM passports");
    }

    #[test]
    fn test_extract_no_sql() {
        assert!(extract_sql("I cannot answer that").is_err());
    }

    #[test]
    fn test_extract_cte_statement() {
        let sql =
            extract_sql("WITH monthly AS (SELECT 1 AS n) SELECT * FROM monthly").unwrap();
        assert!(sql.starts_with("WITH monthly"));
    }

    #[test]
    fn test_extract_prose_with_does_not_anchor() {
        let sql = extract_sql("A query with a twist: SELECT 1 AS n").unwrap();
        assert_eq!(sql, "SELECT 1 AS n");
    }

    #[tokio::test]
    async fn test_ask_happy_path() {
        let engine = engine_with("SELECT COUNT(*) AS passport_count FROM passports");
        let answer = engine.ask("how many passports?").await.unwrap();
        assert_eq!(answer.row_count, 1);
        assert_eq!(answer.columns, vec!["passport_count"]);
        assert_eq!(answer.rows[0]["passport_count"], 0);

        // The attempt is logged
        let log = engine.db.list_chat_queries(10).unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].success);
    }

    #[tokio::test]
    async fn test_ask_blocked_sql_logged() {
        let engine = engine_with("DELETE FROM passports");
        let result = engine.ask("delete everything").await;
        assert!(result.is_err());

        let log = engine.db.list_chat_queries(10).unwrap();
        assert_eq!(log.len(), 1);
        assert!(!log[0].success);
    }

    #[tokio::test]
    async fn test_pii_masked_in_rows() {
        let engine = engine_with("SELECT name, email FROM members");
        engine
            .db
            .insert_member("Remi Methot", "remi.methot@example.com", None)
            .unwrap();

        let answer = engine.ask("list member emails").await.unwrap();
        let email = answer.rows[0]["email"].as_str().unwrap();
        assert!(!email.contains("remi.methot"));
        assert!(email.contains('@'));
    }
}

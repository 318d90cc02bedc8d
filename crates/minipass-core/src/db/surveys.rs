//! Survey templates, surveys, and responses

use chrono::Utc;
use rusqlite::params;

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    Survey, SurveyQuestion, SurveyResponse, SurveyResults, SurveyStatus, SurveyTemplate,
};

/// Generate an opaque survey or response token
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<SurveyTemplate> {
    let questions_json: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(SurveyTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        questions: serde_json::from_str(&questions_json).unwrap_or_default(),
        created_at: parse_datetime(&created_at),
    })
}

fn row_to_survey(row: &rusqlite::Row<'_>) -> rusqlite::Result<Survey> {
    let status: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    let closed_at: Option<String> = row.get(7)?;
    Ok(Survey {
        id: row.get(0)?,
        survey_token: row.get(1)?,
        activity_id: row.get(2)?,
        template_id: row.get(3)?,
        name: row.get(4)?,
        status: status.parse().unwrap_or_default(),
        created_at: parse_datetime(&created_at),
        closed_at: closed_at.map(|s| parse_datetime(&s)),
    })
}

fn row_to_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<SurveyResponse> {
    let answers_json: String = row.get(4)?;
    let submitted_at: String = row.get(5)?;
    Ok(SurveyResponse {
        id: row.get(0)?,
        survey_id: row.get(1)?,
        response_token: row.get(2)?,
        passport_id: row.get(3)?,
        answers: serde_json::from_str(&answers_json).unwrap_or_default(),
        submitted_at: parse_datetime(&submitted_at),
    })
}

const SURVEY_COLS: &str =
    "id, survey_token, activity_id, template_id, name, status, created_at, closed_at";

impl Database {
    /// Create a survey template
    pub fn create_survey_template(
        &self,
        name: &str,
        description: Option<&str>,
        questions: &[SurveyQuestion],
    ) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(Error::InvalidData("Template name is required".to_string()));
        }
        if questions.is_empty() {
            return Err(Error::InvalidData(
                "Template needs at least one question".to_string(),
            ));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO survey_templates (name, description, questions_json) VALUES (?1, ?2, ?3)",
            params![name.trim(), description, serde_json::to_string(questions)?],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a survey template by id
    pub fn get_survey_template(&self, id: i64) -> Result<SurveyTemplate> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, description, questions_json, created_at
             FROM survey_templates WHERE id = ?1",
            params![id],
            row_to_template,
        )
        .map_err(|_| Error::NotFound(format!("Survey template not found: {}", id)))
    }

    /// List survey templates
    pub fn list_survey_templates(&self) -> Result<Vec<SurveyTemplate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, questions_json, created_at
             FROM survey_templates ORDER BY name",
        )?;
        let templates = stmt
            .query_map([], row_to_template)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    /// Update a survey template
    pub fn update_survey_template(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        questions: &[SurveyQuestion],
    ) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE survey_templates SET name = ?2, description = ?3, questions_json = ?4
             WHERE id = ?1",
            params![id, name.trim(), description, serde_json::to_string(questions)?],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Survey template not found: {}", id)));
        }
        Ok(())
    }

    /// Delete a survey template
    ///
    /// Refused while surveys reference it.
    pub fn delete_survey_template(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM surveys WHERE template_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if in_use > 0 {
            return Err(Error::Conflict(format!(
                "Template is used by {} survey(s)",
                in_use
            )));
        }
        let deleted = conn.execute("DELETE FROM survey_templates WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Survey template not found: {}", id)));
        }
        Ok(())
    }

    /// Create a survey for an activity from a template
    pub fn create_survey(&self, activity_id: i64, template_id: i64, name: &str) -> Result<Survey> {
        self.get_activity(activity_id)?;
        self.get_survey_template(template_id)?;

        let token = generate_token();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO surveys (survey_token, activity_id, template_id, name)
             VALUES (?1, ?2, ?3, ?4)",
            params![token, activity_id, template_id, name.trim()],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_survey(id)
    }

    /// Get a survey by id
    pub fn get_survey(&self, id: i64) -> Result<Survey> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM surveys WHERE id = ?1", SURVEY_COLS),
            params![id],
            row_to_survey,
        )
        .map_err(|_| Error::NotFound(format!("Survey not found: {}", id)))
    }

    /// Get a survey by its public token
    pub fn get_survey_by_token(&self, token: &str) -> Result<Survey> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM surveys WHERE survey_token = ?1", SURVEY_COLS),
            params![token],
            row_to_survey,
        )
        .map_err(|_| Error::NotFound(format!("Survey not found: {}", token)))
    }

    /// List surveys, optionally narrowed to one activity
    pub fn list_surveys(&self, activity_id: Option<i64>) -> Result<Vec<Survey>> {
        let conn = self.conn()?;
        let surveys = match activity_id {
            Some(activity_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM surveys WHERE activity_id = ?1 ORDER BY id DESC",
                    SURVEY_COLS
                ))?;
                let rows = stmt.query_map(params![activity_id], row_to_survey)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM surveys ORDER BY id DESC",
                    SURVEY_COLS
                ))?;
                let rows = stmt.query_map([], row_to_survey)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(surveys)
    }

    /// Submit a response to an open survey
    ///
    /// Validates answers against the template's question ids; unknown
    /// question keys are rejected rather than silently stored.
    pub fn submit_survey_response(
        &self,
        survey_token: &str,
        passport_id: Option<i64>,
        answers: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<SurveyResponse> {
        let survey = self.get_survey_by_token(survey_token)?;
        if survey.status != SurveyStatus::Open {
            return Err(Error::Conflict("Survey is closed".to_string()));
        }

        let template = self.get_survey_template(survey.template_id)?;
        for key in answers.keys() {
            if !template.questions.iter().any(|q| q.id == *key) {
                return Err(Error::InvalidData(format!("Unknown question: {}", key)));
            }
        }

        let token = generate_token();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO survey_responses (survey_id, response_token, passport_id, answers_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                survey.id,
                token,
                passport_id,
                serde_json::to_string(answers)?
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.query_row(
            "SELECT id, survey_id, response_token, passport_id, answers_json, submitted_at
             FROM survey_responses WHERE id = ?1",
            params![id],
            row_to_response,
        )
        .map_err(Into::into)
    }

    /// Aggregated results for a survey
    pub fn get_survey_results(&self, survey_id: i64) -> Result<SurveyResults> {
        let survey = self.get_survey(survey_id)?;
        let template = self.get_survey_template(survey.template_id)?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, survey_id, response_token, passport_id, answers_json, submitted_at
             FROM survey_responses WHERE survey_id = ?1 ORDER BY id",
        )?;
        let responses = stmt
            .query_map(params![survey_id], row_to_response)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        Ok(SurveyResults {
            survey,
            template,
            response_count: responses.len() as i64,
            responses,
        })
    }

    /// Close a survey (no further responses accepted)
    pub fn close_survey(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE surveys SET status = 'closed', closed_at = ?2 WHERE id = ?1",
            params![id, format_datetime(Utc::now())],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Survey not found: {}", id)));
        }
        Ok(())
    }

    /// Reopen a closed survey
    pub fn reopen_survey(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE surveys SET status = 'open', closed_at = NULL WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Survey not found: {}", id)));
        }
        Ok(())
    }

    /// Delete a survey and its responses
    pub fn delete_survey(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM surveys WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Survey not found: {}", id)));
        }
        Ok(())
    }
}

//! Email template library
//!
//! Templates are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/minipass/templates/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! This allows organizations to customize wording without modifying the
//! source, while automatically getting new default templates on upgrade.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default templates (compiled into binary)
mod defaults {
    pub const PASS_CREATED: &str = include_str!("../../../templates/pass_created.md");
    pub const PAYMENT_RECEIVED: &str = include_str!("../../../templates/payment_received.md");
    pub const PAYMENT_REMINDER: &str = include_str!("../../../templates/payment_reminder.md");
    pub const SIGNUP_RECEIVED: &str = include_str!("../../../templates/signup_received.md");
    pub const SURVEY_INVITATION: &str = include_str!("../../../templates/survey_invitation.md");
}

/// Known template IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    /// Pass created, sent to the holder with the QR code
    PassCreated,
    /// Payment confirmed (manually or by the payment bot)
    PaymentReceived,
    /// Unpaid pass reminder
    PaymentReminder,
    /// Signup received acknowledgement
    SignupReceived,
    /// Survey invitation with response link
    SurveyInvitation,
}

impl TemplateId {
    /// Get the string identifier for this template
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PassCreated => "pass_created",
            Self::PaymentReceived => "payment_received",
            Self::PaymentReminder => "payment_reminder",
            Self::SignupReceived => "signup_received",
            Self::SurveyInvitation => "survey_invitation",
        }
    }

    /// Get all known template IDs
    pub fn all() -> &'static [TemplateId] {
        &[
            Self::PassCreated,
            Self::PaymentReceived,
            Self::PaymentReminder,
            Self::SignupReceived,
            Self::SurveyInvitation,
        ]
    }

    /// Get the default embedded content for this template
    fn default_content(&self) -> &'static str {
        match self {
            Self::PassCreated => defaults::PASS_CREATED,
            Self::PaymentReceived => defaults::PAYMENT_RECEIVED,
            Self::PaymentReminder => defaults::PAYMENT_REMINDER,
            Self::SignupReceived => defaults::SIGNUP_RECEIVED,
            Self::SurveyInvitation => defaults::SURVEY_INVITATION,
        }
    }
}

/// Template frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    /// Subject line (may contain {{variables}})
    pub subject: String,
}

/// A loaded email template with metadata and HTML body
#[derive(Debug, Clone)]
pub struct EmailTemplate {
    /// Metadata from frontmatter
    pub metadata: TemplateMetadata,
    /// HTML body
    pub body: String,
    /// Whether this came from an override file
    pub is_override: bool,
}

impl EmailTemplate {
    /// Render the subject line with template variables replaced
    pub fn render_subject(&self, vars: &HashMap<&str, &str>) -> String {
        render_vars(&self.metadata.subject, vars)
    }

    /// Render the HTML body with template variables replaced
    pub fn render_body(&self, vars: &HashMap<&str, &str>) -> String {
        let rendered = render_vars(&self.body, vars);
        remove_unmatched_conditionals(&rendered, vars)
    }
}

/// Simple mustache-style replacement: {{var}}
fn render_vars(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}

/// Template library for loading and caching templates
pub struct TemplateLibrary {
    /// Override directory path
    override_dir: Option<PathBuf>,
    /// Cached parsed templates
    cache: HashMap<TemplateId, EmailTemplate>,
}

impl TemplateLibrary {
    /// Create a new template library with default paths
    pub fn new() -> Self {
        Self {
            override_dir: default_templates_dir(),
            cache: HashMap::new(),
        }
    }

    /// Create a template library with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Create a template library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a template by ID, loading from override or default
    pub fn get(&mut self, id: TemplateId) -> Result<&EmailTemplate> {
        if !self.cache.contains_key(&id) {
            let template = self.load(id)?;
            self.cache.insert(id, template);
        }
        Ok(self.cache.get(&id).unwrap())
    }

    /// Load a template (checking override first, then default)
    fn load(&self, id: TemplateId) -> Result<EmailTemplate> {
        if let Some(ref override_dir) = self.override_dir {
            let override_path = override_dir.join(format!("{}.md", id.as_str()));
            if override_path.exists() {
                let content = fs::read_to_string(&override_path).map_err(|e| {
                    Error::InvalidData(format!("Failed to read template override: {}", e))
                })?;
                let (metadata, body) = parse_template(&content)?;
                return Ok(EmailTemplate {
                    metadata,
                    body,
                    is_override: true,
                });
            }
        }

        let content = id.default_content();
        let (metadata, body) = parse_template(content)?;
        Ok(EmailTemplate {
            metadata,
            body,
            is_override: false,
        })
    }

    /// Check if a template has an override file
    pub fn has_override(&self, id: TemplateId) -> bool {
        if let Some(ref override_dir) = self.override_dir {
            override_dir.join(format!("{}.md", id.as_str())).exists()
        } else {
            false
        }
    }

    /// Get the override directory path
    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Clear the cache (useful after editing override files)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Default templates override directory
pub fn default_templates_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("minipass").join("templates").join("overrides"))
}

/// Parse a template file into metadata and body
fn parse_template(content: &str) -> Result<(TemplateMetadata, String)> {
    let content = content.trim();

    if !content.starts_with("---") {
        return Err(Error::InvalidData(
            "Template must start with YAML frontmatter (---)".into(),
        ));
    }

    let rest = &content[3..];
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Template frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = &rest[..end].trim();
    let body = &rest[end + 3..].trim();

    let metadata: TemplateMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid template frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

/// Remove unmatched conditional blocks from the template
///
/// `{{#if var}}...{{/if}}` blocks survive only when `var` is present and
/// non-empty.
fn remove_unmatched_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    loop {
        if let Some(if_start) = result.find("{{#if ") {
            let var_start = if_start + 6;
            if let Some(var_end) = result[var_start..].find("}}") {
                let var_name = &result[var_start..var_start + var_end];
                let block_start = var_start + var_end + 2;

                if let Some(endif_pos) = result[block_start..].find("{{/if}}") {
                    let block_content = &result[block_start..block_start + endif_pos];
                    let full_end = block_start + endif_pos + 7;

                    let should_include = vars.get(var_name).is_some_and(|v| !v.is_empty());

                    if should_include {
                        result = format!(
                            "{}{}{}",
                            &result[..if_start],
                            block_content,
                            &result[full_end..]
                        );
                    } else {
                        result = format!("{}{}", &result[..if_start], &result[full_end..]);
                    }
                    continue;
                }
            }
        }
        break;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_defaults_parse() {
        let mut lib = TemplateLibrary::embedded_only();
        for &id in TemplateId::all() {
            let template = lib.get(id).unwrap();
            assert_eq!(template.metadata.id, id.as_str());
            assert!(!template.metadata.subject.is_empty());
            assert!(!template.body.is_empty());
        }
    }

    #[test]
    fn test_render_subject_and_body() {
        let mut lib = TemplateLibrary::embedded_only();
        let template = lib.get(TemplateId::PassCreated).unwrap();

        let mut vars = HashMap::new();
        vars.insert("holder_name", "Remi Methot");
        vars.insert("activity_name", "Tuesday Hockey");
        vars.insert("pass_code", "ABCD1234ABCD1234");
        vars.insert("sessions", "4");
        vars.insert("amount", "50.00");

        let subject = template.render_subject(&vars);
        assert!(subject.contains("Tuesday Hockey"));

        let body = template.render_body(&vars);
        assert!(body.contains("Remi Methot"));
        assert!(body.contains("ABCD1234ABCD1234"));
        assert!(!body.contains("{{holder_name}}"));
    }

    #[test]
    fn test_conditional_blocks() {
        let template = EmailTemplate {
            metadata: TemplateMetadata {
                id: "test".into(),
                version: 1,
                subject: "Test".into(),
            },
            body: "Hello{{#if notes}} Note: {{notes}}{{/if}}!".into(),
            is_override: false,
        };

        let mut vars = HashMap::new();
        vars.insert("notes", "bring skates");
        assert_eq!(template.render_body(&vars), "Hello Note: bring skates!");

        let empty: HashMap<&str, &str> = HashMap::new();
        assert_eq!(template.render_body(&empty), "Hello!");
    }

    #[test]
    fn test_override_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pass_created.md"),
            "---\nid: pass_created\nversion: 99\nsubject: Custom subject\n---\nCustom body",
        )
        .unwrap();

        let mut lib = TemplateLibrary::with_override_dir(dir.path().to_path_buf());
        let template = lib.get(TemplateId::PassCreated).unwrap();
        assert!(template.is_override);
        assert_eq!(template.metadata.version, 99);
        assert_eq!(template.body, "Custom body");
    }
}

//! SMTP mailer with templated messages and inline QR codes
//!
//! Every delivery attempt is recorded in `email_logs` (SENT or FAILED with
//! the error). Notification helpers never fail the calling operation: a pass
//! should still be created when the SMTP server is down.

use std::collections::HashMap;
use std::sync::Mutex;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{EmailResult, Passport};
use crate::qr;
use crate::templates::{TemplateId, TemplateLibrary};

/// Content-ID the templates use to reference the inline QR image
const QR_CONTENT_ID: &str = "pass-qr";

/// SMTP connection parameters
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    /// Public base URL used in QR codes and survey links
    pub base_url: String,
}

impl MailerConfig {
    /// Load from settings; None when mail credentials are not configured
    pub fn from_settings(db: &Database) -> Result<Option<Self>> {
        let username = db.get_setting_opt("MAIL_USERNAME")?;
        let password = db.get_setting_opt("MAIL_PASSWORD")?;
        let (Some(username), Some(password)) = (username, password) else {
            return Ok(None);
        };

        let from_address = db.get_setting("MAIL_FROM", &username)?;

        Ok(Some(Self {
            server: db.get_setting("MAIL_SERVER", "smtp.gmail.com")?,
            port: db.get_setting_i64("MAIL_PORT", 587)? as u16,
            username,
            password,
            from_address,
            base_url: db.get_setting("APP_BASE_URL", "http://localhost:8080")?,
        }))
    }
}

/// Templated SMTP mailer
pub struct Mailer {
    config: MailerConfig,
    templates: Mutex<TemplateLibrary>,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Self {
        Self {
            config,
            templates: Mutex::new(TemplateLibrary::new()),
        }
    }

    /// Build a mailer from settings; None when mail is not configured
    pub fn from_settings(db: &Database) -> Result<Option<Self>> {
        Ok(MailerConfig::from_settings(db)?.map(Self::new))
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Render and send a templated email, logging the attempt
    ///
    /// `qr_svg` is attached inline and referenced from the HTML body via
    /// `cid:pass-qr`.
    pub fn send_template(
        &self,
        db: &Database,
        template_id: TemplateId,
        to: &str,
        vars: &HashMap<&str, &str>,
        pass_code: Option<&str>,
        qr_svg: Option<&str>,
    ) -> Result<()> {
        let (subject, html) = {
            let mut templates = self
                .templates
                .lock()
                .map_err(|_| Error::Email("Template cache poisoned".to_string()))?;
            let template = templates.get(template_id)?;
            (template.render_subject(vars), template.render_body(vars))
        };

        let context_json = serde_json::to_string(vars)?;
        let result = self.deliver(to, &subject, &html, qr_svg);

        match &result {
            Ok(()) => {
                db.log_email(
                    to,
                    &subject,
                    pass_code,
                    Some(template_id.as_str()),
                    Some(&context_json),
                    EmailResult::Sent,
                    None,
                )?;
                info!(to, template = template_id.as_str(), "Email sent");
            }
            Err(e) => {
                db.log_email(
                    to,
                    &subject,
                    pass_code,
                    Some(template_id.as_str()),
                    Some(&context_json),
                    EmailResult::Failed,
                    Some(&e.to_string()),
                )?;
                warn!(to, template = template_id.as_str(), error = %e, "Email failed");
            }
        }

        result
    }

    /// Assemble and deliver one message over SMTP
    fn deliver(&self, to: &str, subject: &str, html: &str, qr_svg: Option<&str>) -> Result<()> {
        let from: Mailbox = self
            .config
            .from_address
            .parse()
            .map_err(|e| Error::Email(format!("Invalid from address: {}", e)))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| Error::Email(format!("Invalid recipient {}: {}", to, e)))?;

        let builder = Message::builder().from(from).to(to_mailbox).subject(subject);

        let message = match qr_svg {
            Some(svg) => {
                let svg_type = ContentType::parse("image/svg+xml")
                    .map_err(|e| Error::Email(format!("Bad attachment type: {}", e)))?;
                builder
                    .multipart(
                        MultiPart::related()
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_HTML)
                                    .body(html.to_string()),
                            )
                            .singlepart(
                                Attachment::new_inline(QR_CONTENT_ID.to_string())
                                    .body(svg.as_bytes().to_vec(), svg_type),
                            ),
                    )
                    .map_err(|e| Error::Email(format!("Message build failed: {}", e)))?
            }
            None => builder
                .header(ContentType::TEXT_HTML)
                .body(html.to_string())
                .map_err(|e| Error::Email(format!("Message build failed: {}", e)))?,
        };

        let transport = SmtpTransport::starttls_relay(&self.config.server)
            .map_err(|e| Error::Email(format!("SMTP setup failed: {}", e)))?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build();

        transport
            .send(&message)
            .map_err(|e| Error::Email(format!("SMTP send failed: {}", e)))?;
        Ok(())
    }

    /// Variables shared by the pass lifecycle templates
    fn pass_vars(
        &self,
        db: &Database,
        passport: &Passport,
    ) -> Result<(String, HashMap<&'static str, String>)> {
        let member = db.get_member(passport.member_id)?;
        let activity = db.get_activity(passport.activity_id)?;

        let payment_instructions = match passport.passport_type_id {
            Some(type_id) => db
                .get_passport_type(type_id)
                .ok()
                .and_then(|pt| pt.payment_instructions),
            None => None,
        };

        let mut vars: HashMap<&'static str, String> = HashMap::new();
        vars.insert("holder_name", member.name.clone());
        vars.insert("activity_name", activity.name);
        vars.insert("pass_code", passport.pass_code.clone());
        vars.insert("sessions", passport.uses_remaining.to_string());
        vars.insert("amount", format!("{:.2}", passport.sold_amt));
        if let Some(instructions) = payment_instructions {
            vars.insert("payment_instructions", instructions);
        }

        Ok((member.email, vars))
    }

    /// Send the pass-created confirmation with the inline QR code
    pub fn notify_pass_created(&self, db: &Database, passport: &Passport) -> Result<()> {
        let (to, vars) = self.pass_vars(db, passport)?;
        let qr_svg = qr::pass_qr_svg(&self.config.base_url, &passport.pass_code)?;
        let borrowed: HashMap<&str, &str> =
            vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.send_template(
            db,
            TemplateId::PassCreated,
            &to,
            &borrowed,
            Some(&passport.pass_code),
            Some(&qr_svg),
        )
    }

    /// Send the payment-received confirmation
    pub fn notify_payment_received(&self, db: &Database, passport: &Passport) -> Result<()> {
        let (to, vars) = self.pass_vars(db, passport)?;
        let qr_svg = qr::pass_qr_svg(&self.config.base_url, &passport.pass_code)?;
        let borrowed: HashMap<&str, &str> =
            vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.send_template(
            db,
            TemplateId::PaymentReceived,
            &to,
            &borrowed,
            Some(&passport.pass_code),
            Some(&qr_svg),
        )
    }

    /// Send an unpaid-pass reminder
    pub fn send_payment_reminder(&self, db: &Database, passport: &Passport) -> Result<()> {
        let (to, vars) = self.pass_vars(db, passport)?;
        let borrowed: HashMap<&str, &str> =
            vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.send_template(
            db,
            TemplateId::PaymentReminder,
            &to,
            &borrowed,
            Some(&passport.pass_code),
            None,
        )
    }

    /// Acknowledge a public signup
    pub fn notify_signup_received(&self, db: &Database, signup_id: i64) -> Result<()> {
        let signup = db.get_signup(signup_id)?;
        let member = db.get_member(signup.member_id)?;
        let activity = db.get_activity(signup.activity_id)?;

        let passport_type_name = match signup.passport_type_id {
            Some(type_id) => db.get_passport_type(type_id).ok().map(|pt| pt.name),
            None => None,
        };

        let mut vars: HashMap<&str, &str> = HashMap::new();
        vars.insert("name", &member.name);
        vars.insert("activity_name", &activity.name);
        if let Some(ref type_name) = passport_type_name {
            vars.insert("passport_type_name", type_name);
        }

        self.send_template(db, TemplateId::SignupReceived, &member.email, &vars, None, None)
    }

    /// Invite an activity's pass holders to a survey
    ///
    /// Returns the number of invitations sent; individual failures are
    /// logged and skipped.
    pub fn send_survey_invitations(&self, db: &Database, survey_id: i64) -> Result<usize> {
        let survey = db.get_survey(survey_id)?;
        let activity = db.get_activity(survey.activity_id)?;
        let survey_url = format!(
            "{}/survey/{}",
            self.config.base_url.trim_end_matches('/'),
            survey.survey_token
        );

        let passports = db.list_passports(&crate::db::PassportFilter {
            activity_id: Some(survey.activity_id),
            limit: Some(i64::MAX),
            ..Default::default()
        })?;

        let mut sent = 0;
        for entry in passports {
            let mut vars: HashMap<&str, &str> = HashMap::new();
            vars.insert("holder_name", &entry.member_name);
            vars.insert("activity_name", &activity.name);
            vars.insert("survey_url", &survey_url);

            match self.send_template(
                db,
                TemplateId::SurveyInvitation,
                &entry.member_email,
                &vars,
                Some(&entry.passport.pass_code),
                None,
            ) {
                Ok(()) => sent += 1,
                Err(e) => warn!(to = %entry.member_email, "Survey invitation failed: {}", e),
            }
        }

        Ok(sent)
    }

    /// Re-send recent FAILED log entries as plain messages
    ///
    /// Uses the logged subject and context; template re-rendering is not
    /// attempted because the original render already succeeded.
    pub fn retry_failed(&self, db: &Database, limit: i64) -> Result<usize> {
        let failed = db.list_failed_emails(limit)?;
        let mut retried = 0;

        for entry in failed {
            let vars: HashMap<String, String> = entry
                .context_json
                .as_deref()
                .and_then(|json| serde_json::from_str(json).ok())
                .unwrap_or_default();
            let template_id = entry
                .template
                .as_deref()
                .and_then(|name| {
                    TemplateId::all()
                        .iter()
                        .find(|id| id.as_str() == name)
                        .copied()
                });

            let Some(template_id) = template_id else {
                continue;
            };

            let borrowed: HashMap<&str, &str> = vars
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let qr_svg = entry
                .pass_code
                .as_deref()
                .map(|code| qr::pass_qr_svg(&self.config.base_url, code))
                .transpose()?;

            match self.send_template(
                db,
                template_id,
                &entry.to_email,
                &borrowed,
                entry.pass_code.as_deref(),
                qr_svg.as_deref(),
            ) {
                Ok(()) => retried += 1,
                Err(e) => warn!(to = %entry.to_email, "Retry failed again: {}", e),
            }
        }

        Ok(retried)
    }

    /// Send a plain test message to verify SMTP settings
    pub fn send_test(&self, db: &Database, to: &str) -> Result<()> {
        let result = self.deliver(
            to,
            "Minipass email test",
            "<p>Your Minipass email settings work.</p>",
            None,
        );
        db.log_email(
            to,
            "Minipass email test",
            None,
            None,
            None,
            if result.is_ok() {
                EmailResult::Sent
            } else {
                EmailResult::Failed
            },
            result.as_ref().err().map(|e| e.to_string()).as_deref(),
        )?;
        result
    }
}

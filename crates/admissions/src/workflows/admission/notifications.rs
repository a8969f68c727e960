use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationStatus};

const BUILTIN_TEMPLATES: &str = include_str!("templates.json");
const FIRST_NAME_PLACEHOLDER: &str = "{first_name}";
const UNNAMED_CANDIDATE: &str = "Candidate";

/// Outbound e-mail hook. Delivery and retry policy belong to the implementation.
pub trait Mailer: Send + Sync {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("recipient rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("application has no e-mail address")]
    MissingRecipient,
    #[error(transparent)]
    Mailer(#[from] MailerError),
}

/// Status message templates. Bodies use `{first_name}` as the only placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTemplates {
    pub subject: String,
    pub fallback: String,
    #[serde(default)]
    pub statuses: HashMap<ApplicationStatus, String>,
}

impl NotificationTemplates {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_TEMPLATES).unwrap_or_else(|err| {
            tracing::error!(error = %err, "embedded notification templates are invalid");
            Self {
                subject: "Application Status Update".to_string(),
                fallback: format!(
                    "Dear {FIRST_NAME_PLACEHOLDER},\n\nYour application status has been updated."
                ),
                statuses: HashMap::new(),
            }
        })
    }

    /// Renders the body for `status`, falling back to the generic message.
    pub fn render(&self, status: ApplicationStatus, first_name: Option<&str>) -> String {
        let name = first_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNNAMED_CANDIDATE);
        self.statuses
            .get(&status)
            .unwrap_or(&self.fallback)
            .replace(FIRST_NAME_PLACEHOLDER, name)
    }
}

impl Default for NotificationTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Renders status templates and hands them to the mailer.
pub struct NotificationDispatcher<M> {
    mailer: Arc<M>,
    templates: NotificationTemplates,
}

impl<M> NotificationDispatcher<M>
where
    M: Mailer + 'static,
{
    pub fn new(mailer: Arc<M>) -> Self {
        Self::with_templates(mailer, NotificationTemplates::builtin())
    }

    pub fn with_templates(mailer: Arc<M>, templates: NotificationTemplates) -> Self {
        Self { mailer, templates }
    }

    pub fn templates(&self) -> &NotificationTemplates {
        &self.templates
    }

    pub fn set_templates(&mut self, templates: NotificationTemplates) {
        self.templates = templates;
    }

    pub fn notify(
        &self,
        application: &Application,
        status: ApplicationStatus,
    ) -> Result<(), NotificationError> {
        let recipient = application
            .profile
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(NotificationError::MissingRecipient)?;

        let body = self
            .templates
            .render(status, application.profile.first_name.as_deref());
        self.mailer
            .send_email(recipient, &self.templates.subject, &body)?;
        Ok(())
    }
}

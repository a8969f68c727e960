use admissions::config::DirectoryConfig;
use admissions::workflows::admission::{
    Clock, DirectoryError, DirectoryGateway, DisabledDirectory, HttpDirectoryGateway, Mailer,
    MailerError,
};
use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Mailer that records outgoing messages in the log instead of delivering them.
#[derive(Default)]
pub(crate) struct LogMailer {
    delivered: Mutex<Vec<String>>,
}

impl LogMailer {
    pub(crate) fn recipients(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Mailer for LogMailer {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        info!(to, subject, bytes = body.len(), "status e-mail queued");
        self.delivered
            .lock()
            .map_err(|_| MailerError::Transport("outbox mutex poisoned".to_string()))?
            .push(to.to_string());
        Ok(())
    }
}

/// Directory backend chosen from configuration at startup.
pub(crate) enum ConfiguredDirectory {
    Http(HttpDirectoryGateway),
    Disabled(DisabledDirectory),
}

impl ConfiguredDirectory {
    /// Builds the HTTP client when a service URL is configured. The blocking client must be
    /// created off the async workers.
    pub(crate) fn from_config(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        if !config.enabled() {
            return Ok(Self::Disabled(DisabledDirectory));
        }
        HttpDirectoryGateway::new(config).map(Self::Http)
    }

    pub(crate) fn describe(&self) -> &str {
        match self {
            ConfiguredDirectory::Http(gateway) => gateway.base_url(),
            ConfiguredDirectory::Disabled(_) => "disabled",
        }
    }
}

impl DirectoryGateway for ConfiguredDirectory {
    fn update_matricule(&self, old: &str, new: &str) -> Result<(), DirectoryError> {
        match self {
            ConfiguredDirectory::Http(gateway) => gateway.update_matricule(old, new),
            ConfiguredDirectory::Disabled(gateway) => gateway.update_matricule(old, new),
        }
    }

    fn register_matricule(&self, matricule: &str) -> Result<(), DirectoryError> {
        match self {
            ConfiguredDirectory::Http(gateway) => gateway.register_matricule(matricule),
            ConfiguredDirectory::Disabled(gateway) => gateway.register_matricule(matricule),
        }
    }
}

/// Clock pinned to a calendar date, used to replay the demo for a given intake year.
pub(crate) struct PinnedClock(pub(crate) DateTime<Utc>);

impl PinnedClock {
    pub(crate) fn on(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

impl Clock for PinnedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

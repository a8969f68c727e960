//! Student directory synchronization and its HTTP client.

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::DirectoryConfig;

/// Remote system of record for candidate matricules.
pub trait DirectoryGateway: Send + Sync {
    fn update_matricule(&self, old: &str, new: &str) -> Result<(), DirectoryError>;
    fn register_matricule(&self, matricule: &str) -> Result<(), DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory service returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("directory service unreachable: {0}")]
    Connectivity(String),
    #[error("invalid directory service url: {0}")]
    InvalidUrl(String),
}

/// Best-effort propagation of finalized matricules. Failures are logged and never returned.
pub struct DirectorySync<D> {
    gateway: Arc<D>,
}

impl<D> DirectorySync<D>
where
    D: DirectoryGateway + 'static,
{
    pub fn new(gateway: Arc<D>) -> Self {
        Self { gateway }
    }

    /// Updates the old mapping when one exists, then always registers the new matricule.
    pub fn sync_matricule(&self, old: Option<&str>, new: &str) {
        if let Some(old) = old.filter(|old| !old.is_empty()) {
            match self.gateway.update_matricule(old, new) {
                Ok(()) => info!(old, new, "directory matricule updated"),
                Err(err) => warn!(old, new, error = %err, "directory matricule update failed"),
            }
        }

        match self.gateway.register_matricule(new) {
            Ok(()) => info!(matricule = new, "directory matricule registered"),
            Err(err) => warn!(matricule = new, error = %err, "directory matricule registration failed"),
        }
    }
}

#[derive(Debug, Serialize)]
struct MatriculePayload<'a> {
    matricule: &'a str,
}

/// HTTP client for the directory service.
///
/// Uses the blocking reqwest client, so calls must not run on an async worker thread; the
/// router dispatches lifecycle work through `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct HttpDirectoryGateway {
    client: reqwest::blocking::Client,
    base: Url,
    base_url: String,
}

impl HttpDirectoryGateway {
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|err| DirectoryError::InvalidUrl(format!("{base_url}: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(DirectoryError::InvalidUrl(base_url));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| DirectoryError::Connectivity(err.to_string()))?;

        Ok(Self {
            client,
            base,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Appends percent-encoded path segments to the configured base.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, DirectoryError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| DirectoryError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn update_url(&self, old: &str) -> Result<Url, DirectoryError> {
        self.endpoint(&["api", "v1", "candidate", "update-matricule", old])
    }

    fn register_url(&self) -> Result<Url, DirectoryError> {
        self.endpoint(&["api", "v1", "candidate", "register-matricule"])
    }

    fn check(response: reqwest::blocking::Response) -> Result<(), DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().unwrap_or_default();
        Err(DirectoryError::Server {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }
}

impl DirectoryGateway for HttpDirectoryGateway {
    /// Only the old matricule is sent, as a path segment. The body is empty.
    fn update_matricule(&self, old: &str, _new: &str) -> Result<(), DirectoryError> {
        let response = self
            .client
            .put(self.update_url(old)?)
            .send()
            .map_err(|err| DirectoryError::Connectivity(err.to_string()))?;
        Self::check(response)
    }

    fn register_matricule(&self, matricule: &str) -> Result<(), DirectoryError> {
        let response = self
            .client
            .post(self.register_url()?)
            .json(&MatriculePayload { matricule })
            .send()
            .map_err(|err| DirectoryError::Connectivity(err.to_string()))?;
        Self::check(response)
    }
}

/// Gateway used when no directory service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledDirectory;

impl DirectoryGateway for DisabledDirectory {
    fn update_matricule(&self, _old: &str, _new: &str) -> Result<(), DirectoryError> {
        Ok(())
    }

    fn register_matricule(&self, _matricule: &str) -> Result<(), DirectoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(base_url: &str) -> DirectoryConfig {
        DirectoryConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn urls_follow_directory_routes() {
        let gateway =
            HttpDirectoryGateway::new(&config("https://directory.example.edu/")).expect("client");
        assert_eq!(gateway.base_url(), "https://directory.example.edu");
        assert_eq!(
            gateway.update_url("2026ING0001").expect("url").as_str(),
            "https://directory.example.edu/api/v1/candidate/update-matricule/2026ING0001"
        );
        assert_eq!(
            gateway.register_url().expect("url").as_str(),
            "https://directory.example.edu/api/v1/candidate/register-matricule"
        );
    }

    #[test]
    fn base_path_prefix_is_preserved() {
        let gateway =
            HttpDirectoryGateway::new(&config("http://10.0.0.5:8080/directory")).expect("client");
        assert_eq!(
            gateway.register_url().expect("url").as_str(),
            "http://10.0.0.5:8080/directory/api/v1/candidate/register-matricule"
        );
    }

    #[test]
    fn old_matricule_is_a_single_encoded_segment() {
        let gateway =
            HttpDirectoryGateway::new(&config("https://directory.example.edu")).expect("client");
        let url = gateway.update_url("A/B C").expect("url");

        assert_eq!(
            url.as_str(),
            "https://directory.example.edu/api/v1/candidate/update-matricule/A%2FB%20C"
        );
        assert_eq!(url.path_segments().map(Iterator::count), Some(5));
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        for base_url in ["directory.example.edu", "mailto:admissions@example.edu"] {
            assert!(
                matches!(
                    HttpDirectoryGateway::new(&config(base_url)),
                    Err(DirectoryError::InvalidUrl(_))
                ),
                "{base_url} should be rejected"
            );
        }
    }

    #[test]
    fn unreachable_service_surfaces_connectivity_errors() {
        let gateway = HttpDirectoryGateway::new(&config("http://127.0.0.1:9")).expect("client");

        match gateway.register_matricule("2026ING0001") {
            Err(DirectoryError::Connectivity(_)) => {}
            other => panic!("expected connectivity error, got {other:?}"),
        }
    }
}

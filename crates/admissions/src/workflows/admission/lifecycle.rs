//! Application state machine: intake, completeness checks, review statuses, enrollment.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::{info, warn};

use super::directory::{DirectoryGateway, DirectorySync};
use super::documents::{DocumentBundleError, DocumentBundleValidator, DocumentFile};
use super::domain::{
    Application, ApplicationId, ApplicationStatus, CandidateDetails, Document, DocumentId,
    EducationDetails, FamilyDetails, Program,
};
use super::matricule::MatriculeGenerator;
use super::notifications::{Mailer, NotificationDispatcher, NotificationTemplates};
use super::repository::{ApplicationRepository, RepositoryError};

/// Source of the current time, injectable for deterministic tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// State machine over admission applications.
///
/// Enforces the required-section check on submission and the terminal `Student` guard on every
/// status change. Review statuses may move in any direction. Notifications and directory
/// synchronization happen after the change is persisted and their failures are only logged.
pub struct ApplicationLifecycle<R, M, D> {
    repository: Arc<R>,
    notifications: NotificationDispatcher<M>,
    directory: DirectorySync<D>,
    validator: DocumentBundleValidator,
    generator: MatriculeGenerator,
    clock: Arc<dyn Clock>,
}

impl<R, M, D> ApplicationLifecycle<R, M, D>
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    pub fn new(repository: Arc<R>, mailer: Arc<M>, directory: Arc<D>) -> Self {
        Self {
            repository,
            notifications: NotificationDispatcher::new(mailer),
            directory: DirectorySync::new(directory),
            validator: DocumentBundleValidator::new(),
            generator: MatriculeGenerator::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_templates(mut self, templates: NotificationTemplates) -> Self {
        self.notifications.set_templates(templates);
        self
    }

    /// Open a new application in the pending state.
    pub fn initialize(&self, details: CandidateDetails) -> Result<Application, AdmissionError> {
        let program = details
            .program
            .ok_or_else(|| AdmissionError::Validation("program selection is required".into()))?;
        let matricule = supplied_matricule(details.matricule);
        self.ensure_not_applied(matricule.as_deref(), program)?;

        let mut application = Application::new(details.profile, program);
        application.matricule = matricule;
        application.education = details.education;
        application.family = details.family;

        let stored = self.persist_new(application)?;
        info!(
            application_id = ?stored.id,
            program = %stored.program,
            matricule = ?stored.matricule,
            "application initialized"
        );
        Ok(stored)
    }

    /// Open and submit an application with every section and the full document bundle at once.
    /// The bundle is validated before anything is stored.
    pub fn submit_complete<F: DocumentFile>(
        &self,
        details: CandidateDetails,
        files: &[F],
    ) -> Result<Application, AdmissionError> {
        let program = details
            .program
            .ok_or_else(|| AdmissionError::Validation("program selection is required".into()))?;
        let matricule = supplied_matricule(details.matricule);
        self.ensure_not_applied(matricule.as_deref(), program)?;

        let documents = if files.is_empty() {
            Vec::new()
        } else {
            self.validator.validate_and_build(files)?
        };

        let mut application = Application::new(details.profile, program);
        application.matricule = matricule;
        application.education = details.education;
        application.family = details.family;
        application.documents = documents;

        let missing = application.missing_sections();
        if !missing.is_empty() {
            return Err(AdmissionError::Incomplete { missing });
        }

        application.status = ApplicationStatus::Submitted;
        application.submitted_at = Some(self.clock.now());

        let stored = self.persist_new(application)?;
        info!(
            application_id = ?stored.id,
            documents = stored.documents.len(),
            "complete application submitted"
        );
        self.announce(&stored, ApplicationStatus::Submitted);
        Ok(stored)
    }

    pub fn attach_education_details(
        &self,
        id: ApplicationId,
        details: EducationDetails,
    ) -> Result<Application, AdmissionError> {
        let mut application = self.fetch(id)?;
        application.education = Some(details);
        Ok(self.repository.save(application)?)
    }

    pub fn attach_family_details(
        &self,
        id: ApplicationId,
        details: FamilyDetails,
    ) -> Result<Application, AdmissionError> {
        let mut application = self.fetch(id)?;
        application.family = Some(details);
        Ok(self.repository.save(application)?)
    }

    /// Mark the application submitted once every required section is present. Resubmission is
    /// permitted, re-runs the completeness check, and keeps the first submission timestamp.
    pub fn submit(&self, id: ApplicationId) -> Result<Application, AdmissionError> {
        let mut application = self.fetch(id)?;
        if application.status.is_terminal() {
            return Err(AdmissionError::TerminalState);
        }

        let missing = application.missing_sections();
        if !missing.is_empty() {
            return Err(AdmissionError::Incomplete { missing });
        }

        application.status = ApplicationStatus::Submitted;
        if application.submitted_at.is_none() {
            application.submitted_at = Some(self.clock.now());
        }
        let stored = self.repository.save(application)?;

        info!(application_id = %id, "application submitted");
        self.announce(&stored, ApplicationStatus::Submitted);
        Ok(stored)
    }

    /// Move the application to `status`. Reaching `Student` regenerates the matricule and
    /// freezes the application.
    pub fn transition_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, AdmissionError> {
        let mut application = self.fetch(id)?;
        if application.status.is_terminal() {
            return Err(AdmissionError::TerminalState);
        }
        if status == ApplicationStatus::Pending {
            return Err(AdmissionError::Validation(
                "applications cannot return to the pending state".into(),
            ));
        }

        let previous_status = application.status;
        let previous_matricule = application.matricule.clone();
        application.status = status;

        let finalized = if status == ApplicationStatus::Student {
            let year = self.clock.now().year();
            let matricule = self
                .generator
                .generate(Some(application.program), id.0, year);
            application.matricule = Some(matricule.clone());
            Some(matricule)
        } else {
            None
        };

        let stored = self.repository.save(application)?;
        info!(
            application_id = %id,
            from = previous_status.label(),
            to = status.label(),
            "application status changed"
        );

        self.announce(&stored, status);
        if let Some(matricule) = finalized {
            self.directory
                .sync_matricule(previous_matricule.as_deref(), &matricule);
        }

        Ok(stored)
    }

    /// Attach a complete document bundle, matching files to types by catalog position.
    pub fn upload_document_bundle<F: DocumentFile>(
        &self,
        id: ApplicationId,
        files: &[F],
    ) -> Result<Application, AdmissionError> {
        let mut application = self.fetch(id)?;
        let documents = self.validator.validate_and_build(files)?;
        application.documents.extend(documents);
        Ok(self.repository.save(application)?)
    }

    /// Append documents with caller-supplied type labels.
    pub fn add_documents<F: DocumentFile, L: AsRef<str>>(
        &self,
        id: ApplicationId,
        files: &[F],
        labels: &[L],
    ) -> Result<Application, AdmissionError> {
        let mut application = self.fetch(id)?;
        let documents = self.validator.build_with_types(files, labels)?;
        application.documents.extend(documents);
        Ok(self.repository.save(application)?)
    }

    pub fn get(&self, id: ApplicationId) -> Result<Application, AdmissionError> {
        self.fetch(id)
    }

    pub fn get_by_matricule(&self, matricule: &str) -> Result<Option<Application>, AdmissionError> {
        Ok(self.repository.find_by_matricule(matricule)?)
    }

    pub fn list(&self) -> Result<Vec<Application>, AdmissionError> {
        Ok(self.repository.find_all()?)
    }

    pub fn document(
        &self,
        id: ApplicationId,
        document_id: DocumentId,
    ) -> Result<Document, AdmissionError> {
        let application = self.fetch(id)?;
        application
            .document(document_id)
            .cloned()
            .ok_or_else(|| AdmissionError::NotFound(format!("document {}", document_id.0)))
    }

    /// Remove the application together with everything it owns.
    pub fn delete(&self, id: ApplicationId) -> Result<(), AdmissionError> {
        match self.repository.delete(id) {
            Ok(()) => {
                info!(application_id = %id, "application deleted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(not_found(id)),
            Err(err) => Err(err.into()),
        }
    }

    fn fetch(&self, id: ApplicationId) -> Result<Application, AdmissionError> {
        self.repository
            .find_by_id(id)?
            .ok_or_else(|| not_found(id))
    }

    fn ensure_not_applied(
        &self,
        matricule: Option<&str>,
        program: Program,
    ) -> Result<(), AdmissionError> {
        let Some(matricule) = matricule else {
            return Ok(());
        };
        if self
            .repository
            .find_by_matricule_and_program(matricule, program)?
            .is_some()
        {
            return Err(AdmissionError::Conflict {
                matricule: matricule.to_string(),
                program,
            });
        }
        Ok(())
    }

    /// Store a new application, generating its matricule from the assigned identity when the
    /// candidate supplied none.
    fn persist_new(&self, application: Application) -> Result<Application, AdmissionError> {
        let mut stored = self.repository.save(application)?;
        if stored.matricule.is_some() {
            return Ok(stored);
        }

        let id = stored.id.ok_or_else(|| {
            RepositoryError::Unavailable("repository did not assign an identity".into())
        })?;
        let year = self.clock.now().year();
        stored.matricule = Some(self.generator.generate(Some(stored.program), id.0, year));
        Ok(self.repository.save(stored)?)
    }

    fn announce(&self, application: &Application, status: ApplicationStatus) {
        if let Err(err) = self.notifications.notify(application, status) {
            warn!(
                application_id = ?application.id,
                status = status.label(),
                error = %err,
                "status notification not delivered"
            );
        }
    }
}

fn supplied_matricule(matricule: Option<String>) -> Option<String> {
    matricule
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn not_found(id: ApplicationId) -> AdmissionError {
    AdmissionError::NotFound(format!("application {id}"))
}

/// Error raised by the application lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("{0}")]
    Validation(String),
    #[error("you have already applied for the {program} program")]
    Conflict { matricule: String, program: Program },
    #[error("{0} not found")]
    NotFound(String),
    #[error(
        "all details must be completed before submitting the application (missing: {})",
        .missing.join(", ")
    )]
    Incomplete { missing: Vec<&'static str> },
    #[error("status cannot change once the candidate is a student")]
    TerminalState,
    #[error(transparent)]
    Documents(DocumentBundleError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AdmissionError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::DuplicateApplication { matricule, program } => {
                AdmissionError::Conflict { matricule, program }
            }
            other => AdmissionError::Repository(other),
        }
    }
}

impl From<DocumentBundleError> for AdmissionError {
    fn from(value: DocumentBundleError) -> Self {
        match value {
            DocumentBundleError::LabelCountMismatch { .. } | DocumentBundleError::UnknownType(_) => {
                AdmissionError::Validation(value.to_string())
            }
            other => AdmissionError::Documents(other),
        }
    }
}

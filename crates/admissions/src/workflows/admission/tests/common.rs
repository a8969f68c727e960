use std::sync::{Arc, Barrier, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::admission::directory::{DirectoryError, DirectoryGateway};
use crate::workflows::admission::documents::InMemoryFile;
use crate::workflows::admission::domain::{
    Application, ApplicationId, CandidateDetails, CandidateProfile, EducationDetails,
    FamilyDetails, Program,
};
use crate::workflows::admission::lifecycle::{ApplicationLifecycle, Clock};
use crate::workflows::admission::notifications::{Mailer, MailerError};
use crate::workflows::admission::repository::{
    ApplicationRepository, InMemoryApplicationRepository, RepositoryError,
};
use crate::workflows::admission::{admission_router, DocumentType};

pub(super) type TestLifecycle =
    ApplicationLifecycle<InMemoryApplicationRepository, MemoryMailer, MemoryDirectory>;

pub(super) fn profile(first_name: &str) -> CandidateProfile {
    CandidateProfile {
        first_name: Some(first_name.to_string()),
        last_name: Some("Nkemelu".to_string()),
        nationality: Some("Cameroonian".to_string()),
        region_of_origin: Some("Littoral".to_string()),
        address: Some("12 Rue Joss, Douala".to_string()),
        whatsapp_number: Some("+237650000001".to_string()),
        email: Some(format!("{}@mail.example.cm", first_name.to_lowercase())),
        phone_number: Some("+237690000001".to_string()),
        date_of_birth: chrono::NaiveDate::from_ymd_opt(2005, 3, 14),
    }
}

pub(super) fn education() -> EducationDetails {
    EducationDetails {
        last_institution: Some("Lycee Bilingue de Bonaberi".to_string()),
        highest_qualification: Some("GCE A Level".to_string()),
        field_of_study: Some("Mathematics".to_string()),
        graduation_year: Some(2024),
        average_grade: Some("B".to_string()),
    }
}

pub(super) fn family() -> FamilyDetails {
    FamilyDetails {
        father_name: Some("Jean Nkemelu".to_string()),
        father_occupation: Some("Teacher".to_string()),
        mother_name: Some("Marie Nkemelu".to_string()),
        mother_occupation: Some("Nurse".to_string()),
        guardian_name: None,
        guardian_phone: None,
        guardian_email: None,
    }
}

/// Intake payload with personal data only.
pub(super) fn candidate(program: Program) -> CandidateDetails {
    CandidateDetails {
        matricule: None,
        program: Some(program),
        profile: profile("Awa"),
        education: None,
        family: None,
    }
}

pub(super) fn complete_candidate(program: Program) -> CandidateDetails {
    CandidateDetails {
        education: Some(education()),
        family: Some(family()),
        ..candidate(program)
    }
}

/// One in-memory file per catalog entry, in catalog order.
pub(super) fn bundle_files() -> Vec<InMemoryFile> {
    DocumentType::CATALOG
        .iter()
        .map(|kind| {
            InMemoryFile::new(
                format!("{}.pdf", kind.label().to_lowercase()),
                format!("%PDF {}", kind.label()).into_bytes(),
            )
        })
        .collect()
}

/// 2026-09-01, so generated matricules carry the 2026 prefix.
pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 8, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(super) fn build_lifecycle() -> (
    TestLifecycle,
    Arc<InMemoryApplicationRepository>,
    Arc<MemoryMailer>,
    Arc<MemoryDirectory>,
) {
    build_lifecycle_with(MemoryMailer::default(), MemoryDirectory::default())
}

pub(super) fn build_lifecycle_with(
    mailer: MemoryMailer,
    directory: MemoryDirectory,
) -> (
    TestLifecycle,
    Arc<InMemoryApplicationRepository>,
    Arc<MemoryMailer>,
    Arc<MemoryDirectory>,
) {
    let repository = Arc::new(InMemoryApplicationRepository::new());
    let mailer = Arc::new(mailer);
    let directory = Arc::new(directory);
    let lifecycle = ApplicationLifecycle::new(repository.clone(), mailer.clone(), directory.clone())
        .with_clock(Arc::new(FixedClock(fixed_now())));
    (lifecycle, repository, mailer, directory)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SentEmail {
    pub(super) to: String,
    pub(super) subject: String,
    pub(super) body: String,
}

#[derive(Default)]
pub(super) struct MemoryMailer {
    sent: Mutex<Vec<SentEmail>>,
    failing: bool,
}

impl MemoryMailer {
    pub(super) fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub(super) fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

impl Mailer for MemoryMailer {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        if self.failing {
            return Err(MailerError::Transport("smtp relay offline".to_string()));
        }
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum DirectoryCall {
    Update { old: String, new: String },
    Register { matricule: String },
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    calls: Mutex<Vec<DirectoryCall>>,
    unreachable: bool,
}

impl MemoryDirectory {
    pub(super) fn unreachable() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            unreachable: true,
        }
    }

    pub(super) fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().expect("directory mutex poisoned").clone()
    }

    fn record(&self, call: DirectoryCall) -> Result<(), DirectoryError> {
        self.calls
            .lock()
            .expect("directory mutex poisoned")
            .push(call);
        if self.unreachable {
            return Err(DirectoryError::Connectivity("connection refused".to_string()));
        }
        Ok(())
    }
}

impl DirectoryGateway for MemoryDirectory {
    fn update_matricule(&self, old: &str, new: &str) -> Result<(), DirectoryError> {
        self.record(DirectoryCall::Update {
            old: old.to_string(),
            new: new.to_string(),
        })
    }

    fn register_matricule(&self, matricule: &str) -> Result<(), DirectoryError> {
        self.record(DirectoryCall::Register {
            matricule: matricule.to_string(),
        })
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn save(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_id(&self, _id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_matricule_and_program(
        &self,
        _matricule: &str,
        _program: Program,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_matricule(&self, _matricule: &str) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_all(&self) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: ApplicationId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// In-memory store whose duplicate lookup waits until every intake has performed it, so all
/// of them reach `save` believing the matricule is free.
pub(super) struct RacingRepository {
    inner: InMemoryApplicationRepository,
    lookups: Barrier,
}

impl RacingRepository {
    pub(super) fn new(intakes: usize) -> Self {
        Self {
            inner: InMemoryApplicationRepository::new(),
            lookups: Barrier::new(intakes),
        }
    }
}

impl ApplicationRepository for RacingRepository {
    fn save(&self, application: Application) -> Result<Application, RepositoryError> {
        self.inner.save(application)
    }

    fn find_by_id(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.find_by_id(id)
    }

    fn find_by_matricule_and_program(
        &self,
        matricule: &str,
        program: Program,
    ) -> Result<Option<Application>, RepositoryError> {
        let found = self.inner.find_by_matricule_and_program(matricule, program);
        self.lookups.wait();
        found
    }

    fn find_by_matricule(&self, matricule: &str) -> Result<Option<Application>, RepositoryError> {
        self.inner.find_by_matricule(matricule)
    }

    fn find_all(&self) -> Result<Vec<Application>, RepositoryError> {
        self.inner.find_all()
    }

    fn delete(&self, id: ApplicationId) -> Result<(), RepositoryError> {
        self.inner.delete(id)
    }
}

pub(super) fn router_with_lifecycle(lifecycle: TestLifecycle) -> axum::Router {
    admission_router(Arc::new(lifecycle))
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

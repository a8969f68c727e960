//! End-to-end admission scenarios driven through the public lifecycle facade and the HTTP router.

mod common {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, TimeZone, Utc};

    use admissions::workflows::admission::{
        ApplicationLifecycle, CandidateDetails, CandidateProfile, Clock, DirectoryError,
        DirectoryGateway, EducationDetails, FamilyDetails, InMemoryApplicationRepository,
        InMemoryFile, Mailer, MailerError, Program,
    };

    pub(super) type Lifecycle =
        ApplicationLifecycle<InMemoryApplicationRepository, RecordingMailer, RecordingDirectory>;

    pub(super) struct Year2027;

    impl Clock for Year2027 {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2027, 1, 15, 9, 0, 0)
                .single()
                .expect("valid timestamp")
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingMailer {
        pub(super) outbox: Mutex<Vec<(String, String)>>,
    }

    impl Mailer for RecordingMailer {
        fn send_email(&self, to: &str, _subject: &str, body: &str) -> Result<(), MailerError> {
            self.outbox
                .lock()
                .expect("outbox mutex poisoned")
                .push((to.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingDirectory {
        pub(super) registered: Mutex<Vec<String>>,
        pub(super) renamed: Mutex<Vec<(String, String)>>,
    }

    impl DirectoryGateway for RecordingDirectory {
        fn update_matricule(&self, old: &str, new: &str) -> Result<(), DirectoryError> {
            self.renamed
                .lock()
                .expect("directory mutex poisoned")
                .push((old.to_string(), new.to_string()));
            Ok(())
        }

        fn register_matricule(&self, matricule: &str) -> Result<(), DirectoryError> {
            self.registered
                .lock()
                .expect("directory mutex poisoned")
                .push(matricule.to_string());
            Ok(())
        }
    }

    pub(super) fn build() -> (Lifecycle, Arc<RecordingMailer>, Arc<RecordingDirectory>) {
        let mailer = Arc::new(RecordingMailer::default());
        let directory = Arc::new(RecordingDirectory::default());
        let lifecycle = ApplicationLifecycle::new(
            Arc::new(InMemoryApplicationRepository::new()),
            mailer.clone(),
            directory.clone(),
        )
        .with_clock(Arc::new(Year2027));
        (lifecycle, mailer, directory)
    }

    pub(super) fn details(first_name: &str, program: Program) -> CandidateDetails {
        CandidateDetails {
            matricule: None,
            program: Some(program),
            profile: CandidateProfile {
                first_name: Some(first_name.to_string()),
                last_name: Some("Tchoua".to_string()),
                email: Some(format!("{}@students.example.cm", first_name.to_lowercase())),
                phone_number: Some("+237677000000".to_string()),
                ..CandidateProfile::default()
            },
            education: None,
            family: None,
        }
    }

    pub(super) fn education() -> EducationDetails {
        EducationDetails {
            last_institution: Some("Lycee Classique de Bafoussam".to_string()),
            highest_qualification: Some("Baccalaureat C".to_string()),
            graduation_year: Some(2026),
            ..EducationDetails::default()
        }
    }

    pub(super) fn family() -> FamilyDetails {
        FamilyDetails {
            guardian_name: Some("Esther Tchoua".to_string()),
            guardian_phone: Some("+237699000000".to_string()),
            ..FamilyDetails::default()
        }
    }

    pub(super) fn bundle() -> Vec<InMemoryFile> {
        (1..=5)
            .map(|n| InMemoryFile::new(format!("scan-{n}.pdf"), vec![n as u8; 16]))
            .collect()
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use admissions::workflows::admission::{
    admission_router, roster_csv, AdmissionError, ApplicationStatus, DocumentId, DocumentType,
    Program,
};
use common::*;

#[test]
fn candidate_progresses_from_intake_to_enrollment() {
    let (lifecycle, mailer, directory) = build();

    let application = lifecycle
        .initialize(details("Brice", Program::Engineering))
        .expect("intake");
    let id = application.id.expect("identity assigned");
    assert_eq!(application.matricule.as_deref(), Some("2027ING0001"));

    lifecycle
        .attach_education_details(id, education())
        .expect("education");
    lifecycle.attach_family_details(id, family()).expect("family");
    lifecycle
        .upload_document_bundle(id, &bundle())
        .expect("documents");
    lifecycle.submit(id).expect("submitted");

    for status in [
        ApplicationStatus::ApplicationAccepted,
        ApplicationStatus::ExamRegistered,
        ApplicationStatus::AdmissionOffered,
    ] {
        lifecycle.transition_status(id, status).expect("review step");
    }
    let student = lifecycle
        .transition_status(id, ApplicationStatus::Student)
        .expect("enrolled");

    assert_eq!(student.status, ApplicationStatus::Student);
    assert_eq!(student.matricule.as_deref(), Some("2027ING0001"));
    assert!(matches!(
        lifecycle.transition_status(id, ApplicationStatus::AdmissionRejected),
        Err(AdmissionError::TerminalState)
    ));

    let transcript = lifecycle
        .document(id, DocumentId(3))
        .expect("transcript stored");
    assert_eq!(transcript.document_type, DocumentType::AcademicTranscript);
    assert_eq!(transcript.filename, "scan-3.pdf");

    let outbox = mailer.outbox.lock().expect("outbox").clone();
    assert_eq!(outbox.len(), 5);
    assert!(outbox
        .iter()
        .all(|(to, _)| to == "brice@students.example.cm"));
    assert_eq!(
        directory.registered.lock().expect("registered").clone(),
        vec!["2027ING0001".to_string()]
    );
    assert_eq!(directory.renamed.lock().expect("renamed").len(), 1);
}

#[test]
fn roster_reflects_every_application() {
    let (lifecycle, _, _) = build();
    for (name, program) in [
        ("Brice", Program::Engineering),
        ("Clarisse", Program::Management),
        ("Dieudonne", Program::License),
    ] {
        lifecycle.initialize(details(name, program)).expect("intake");
    }

    let applications = lifecycle.list().expect("list");
    let csv = roster_csv(&applications).expect("roster");
    let matricules: Vec<&str> = csv
        .lines()
        .skip(1)
        .filter_map(|line| line.split(',').nth(1))
        .collect();

    assert_eq!(
        matricules,
        vec!["2027ING0001", "2027MGT0002", "2027LIC0003"]
    );
}

#[tokio::test]
async fn router_serves_complete_submissions() {
    let (lifecycle, mailer, _) = build();
    let mut candidate = details("Clarisse", Program::Management);
    candidate.education = Some(education());
    candidate.family = Some(family());
    lifecycle
        .submit_complete(candidate, &bundle())
        .expect("complete submission");
    let router = admission_router(Arc::new(lifecycle));

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/applications/1")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("body");
    let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(payload["status"], "SUBMITTED");
    assert_eq!(payload["matricule"], "2027MGT0001");
    assert_eq!(payload["documents"].as_array().map(Vec::len), Some(5));

    let response = router
        .oneshot(
            Request::get("/api/v1/applications")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mailer.outbox.lock().expect("outbox").len(), 1);
}

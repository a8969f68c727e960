use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::directory::DirectoryGateway;
use super::documents::{DocumentBundleError, InMemoryFile};
use super::domain::{
    ApplicationId, ApplicationStatus, ApplicationSummary, CandidateDetails, DocumentId,
    EducationDetails, FamilyDetails,
};
use super::lifecycle::{AdmissionError, ApplicationLifecycle};
use super::notifications::Mailer;
use super::repository::{ApplicationRepository, RepositoryError};
use super::roster::roster_csv;

type SharedLifecycle<R, M, D> = Arc<ApplicationLifecycle<R, M, D>>;

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub struct UploadedFilePayload {
    pub filename: String,
    #[serde(default)]
    pub content: Vec<u8>,
}

/// Intake payload plus the full document bundle, stored in one step.
#[derive(Debug, Deserialize)]
pub struct CompleteApplicationRequest {
    #[serde(flatten)]
    pub details: CandidateDetails,
    #[serde(default)]
    pub files: Vec<UploadedFilePayload>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentBundleRequest {
    pub files: Vec<UploadedFilePayload>,
}

#[derive(Debug, Deserialize)]
pub struct AddDocumentsRequest {
    pub files: Vec<UploadedFilePayload>,
    pub document_types: Vec<String>,
}

/// Router builder exposing the admission lifecycle over HTTP.
pub fn admission_router<R, M, D>(lifecycle: SharedLifecycle<R, M, D>) -> Router
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            post(initialize_handler::<R, M, D>).get(list_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/complete",
            post(complete_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/roster.csv",
            get(roster_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/by-matricule/:matricule",
            get(matricule_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(get_handler::<R, M, D>).delete(delete_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/:application_id/education",
            put(education_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/:application_id/family",
            put(family_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/:application_id/submit",
            post(submit_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            put(status_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/:application_id/documents",
            post(add_documents_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/:application_id/documents/bundle",
            post(bundle_handler::<R, M, D>),
        )
        .route(
            "/api/v1/applications/:application_id/documents/:document_id",
            get(document_handler::<R, M, D>),
        )
        .with_state(lifecycle)
}

/// Lifecycle calls may block on the directory service, so they run off the async workers.
async fn run_blocking<R, M, D, T, F>(
    lifecycle: SharedLifecycle<R, M, D>,
    operation: F,
) -> Result<T, AdmissionError>
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
    T: Send + 'static,
    F: FnOnce(&ApplicationLifecycle<R, M, D>) -> Result<T, AdmissionError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || operation(&lifecycle))
        .await
        .map_err(|err| {
            AdmissionError::Repository(RepositoryError::Unavailable(format!(
                "lifecycle task failed: {err}"
            )))
        })?
}

fn summary_response(status: StatusCode, summary: ApplicationSummary) -> Response {
    (status, Json(summary)).into_response()
}

pub(crate) fn error_response(error: AdmissionError) -> Response {
    let status = match &error {
        AdmissionError::Validation(_) => StatusCode::BAD_REQUEST,
        AdmissionError::Conflict { .. } | AdmissionError::TerminalState => StatusCode::CONFLICT,
        AdmissionError::NotFound(_) => StatusCode::NOT_FOUND,
        AdmissionError::Incomplete { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AdmissionError::Documents(DocumentBundleError::CountMismatch { .. }) => {
            StatusCode::BAD_REQUEST
        }
        AdmissionError::Documents(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AdmissionError::Repository(RepositoryError::StaleWrite { .. })
        | AdmissionError::Repository(RepositoryError::DuplicateMatricule(_))
        | AdmissionError::Repository(RepositoryError::DuplicateApplication { .. }) => {
            StatusCode::CONFLICT
        }
        AdmissionError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AdmissionError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = match &error {
        AdmissionError::Incomplete { missing } => json!({
            "error": error.to_string(),
            "missing": missing,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, Json(payload)).into_response()
}

fn to_files(payloads: Vec<UploadedFilePayload>) -> Vec<InMemoryFile> {
    payloads
        .into_iter()
        .map(|payload| InMemoryFile::new(payload.filename, payload.content))
        .collect()
}

pub(crate) async fn initialize_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Json(details): Json<CandidateDetails>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    match run_blocking(lifecycle, move |lifecycle| lifecycle.initialize(details)).await {
        Ok(application) => summary_response(StatusCode::CREATED, application.summary()),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Json(request): Json<CompleteApplicationRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let CompleteApplicationRequest { details, files } = request;
    let files = to_files(files);
    match run_blocking(lifecycle, move |lifecycle| {
        lifecycle.submit_complete(details, files.as_slice())
    })
    .await
    {
        Ok(application) => summary_response(StatusCode::CREATED, application.summary()),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    match run_blocking(lifecycle, |lifecycle| lifecycle.list()).await {
        Ok(applications) => {
            let summaries: Vec<ApplicationSummary> =
                applications.iter().map(|application| application.summary()).collect();
            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn roster_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let applications = match run_blocking(lifecycle, |lifecycle| lifecycle.list()).await {
        Ok(applications) => applications,
        Err(error) => return error_response(error),
    };

    match roster_csv(&applications) {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn matricule_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Path(matricule): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let lookup = matricule.clone();
    match run_blocking(lifecycle, move |lifecycle| {
        lifecycle.get_by_matricule(&lookup)
    })
    .await
    {
        Ok(Some(application)) => summary_response(StatusCode::OK, application.summary()),
        Ok(None) => error_response(AdmissionError::NotFound(format!("matricule {matricule}"))),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let id = ApplicationId(application_id);
    match run_blocking(lifecycle, move |lifecycle| lifecycle.get(id)).await {
        Ok(application) => summary_response(StatusCode::OK, application.summary()),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let id = ApplicationId(application_id);
    match run_blocking(lifecycle, move |lifecycle| lifecycle.delete(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn education_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Path(application_id): Path<u64>,
    Json(details): Json<EducationDetails>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let id = ApplicationId(application_id);
    match run_blocking(lifecycle, move |lifecycle| {
        lifecycle.attach_education_details(id, details)
    })
    .await
    {
        Ok(application) => summary_response(StatusCode::OK, application.summary()),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn family_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Path(application_id): Path<u64>,
    Json(details): Json<FamilyDetails>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let id = ApplicationId(application_id);
    match run_blocking(lifecycle, move |lifecycle| {
        lifecycle.attach_family_details(id, details)
    })
    .await
    {
        Ok(application) => summary_response(StatusCode::OK, application.summary()),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let id = ApplicationId(application_id);
    match run_blocking(lifecycle, move |lifecycle| lifecycle.submit(id)).await {
        Ok(application) => summary_response(StatusCode::OK, application.summary()),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Path(application_id): Path<u64>,
    Json(request): Json<StatusUpdateRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let id = ApplicationId(application_id);
    match run_blocking(lifecycle, move |lifecycle| {
        lifecycle.transition_status(id, request.status)
    })
    .await
    {
        Ok(application) => summary_response(StatusCode::OK, application.summary()),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn bundle_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Path(application_id): Path<u64>,
    Json(request): Json<DocumentBundleRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let id = ApplicationId(application_id);
    let files = to_files(request.files);
    match run_blocking(lifecycle, move |lifecycle| {
        lifecycle.upload_document_bundle(id, files.as_slice())
    })
    .await
    {
        Ok(application) => summary_response(StatusCode::CREATED, application.summary()),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_documents_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Path(application_id): Path<u64>,
    Json(request): Json<AddDocumentsRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let id = ApplicationId(application_id);
    let AddDocumentsRequest {
        files,
        document_types,
    } = request;
    let files = to_files(files);
    match run_blocking(lifecycle, move |lifecycle| {
        lifecycle.add_documents(id, files.as_slice(), document_types.as_slice())
    })
    .await
    {
        Ok(application) => summary_response(StatusCode::CREATED, application.summary()),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn document_handler<R, M, D>(
    State(lifecycle): State<SharedLifecycle<R, M, D>>,
    Path((application_id, document_id)): Path<(u64, u32)>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
    D: DirectoryGateway + 'static,
{
    let id = ApplicationId(application_id);
    let document_id = DocumentId(document_id);
    match run_blocking(lifecycle, move |lifecycle| {
        lifecycle.document(id, document_id)
    })
    .await
    {
        Ok(document) => {
            let content_type = mime_guess::from_path(&document.filename)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            let disposition = format!(
                "attachment; filename=\"{}\"",
                document.filename.replace('"', "")
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                document.content,
            )
                .into_response()
        }
        Err(error) => error_response(error),
    }
}

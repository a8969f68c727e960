//! Admission application lifecycle: intake, document bundles, review statuses, and matricule
//! assignment once a candidate becomes a student.

pub mod directory;
pub mod documents;
pub mod domain;
pub mod lifecycle;
pub mod matricule;
pub mod notifications;
pub mod repository;
pub mod roster;
pub mod router;

#[cfg(test)]
mod tests;

pub use directory::{
    DirectoryError, DirectoryGateway, DirectorySync, DisabledDirectory, HttpDirectoryGateway,
};
pub use documents::{
    DiskFile, DocumentBundleError, DocumentBundleValidator, DocumentFile, InMemoryFile,
};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSummary, CandidateDetails,
    CandidateProfile, Document, DocumentId, DocumentSummary, DocumentType, EducationDetails,
    FamilyDetails, Program, UnknownLabel,
};
pub use lifecycle::{AdmissionError, ApplicationLifecycle, Clock, SystemClock};
pub use matricule::{program_code, MatriculeGenerator, FALLBACK_PROGRAM_CODE};
pub use notifications::{
    Mailer, MailerError, NotificationDispatcher, NotificationError, NotificationTemplates,
};
pub use repository::{ApplicationRepository, InMemoryApplicationRepository, RepositoryError};
pub use roster::{roster_csv, write_roster, RosterError};
pub use router::admission_router;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Storage-assigned identity of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Academic track a candidate applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Program {
    Engineering,
    Management,
    License,
}

impl Program {
    pub const ALL: [Program; 3] = [Program::Engineering, Program::Management, Program::License];

    pub const fn label(self) -> &'static str {
        match self {
            Program::Engineering => "ENGINEERING",
            Program::Management => "MANAGEMENT",
            Program::License => "LICENSE",
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Program {
    type Err = UnknownLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Program::ALL
            .into_iter()
            .find(|program| program.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownLabel::new("program", value))
    }
}

/// Review status of an application. `Pending` is the pre-submission state and `Student` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Submitted,
    ApplicationAccepted,
    ApplicationRejected,
    ExamRegistered,
    AdmissionOffered,
    AdmissionRejected,
    Student,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Submitted,
        ApplicationStatus::ApplicationAccepted,
        ApplicationStatus::ApplicationRejected,
        ApplicationStatus::ExamRegistered,
        ApplicationStatus::AdmissionOffered,
        ApplicationStatus::AdmissionRejected,
        ApplicationStatus::Student,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::ApplicationAccepted => "APPLICATION_ACCEPTED",
            ApplicationStatus::ApplicationRejected => "APPLICATION_REJECTED",
            ApplicationStatus::ExamRegistered => "EXAM_REGISTERED",
            ApplicationStatus::AdmissionOffered => "ADMISSION_OFFERED",
            ApplicationStatus::AdmissionRejected => "ADMISSION_REJECTED",
            ApplicationStatus::Student => "STUDENT",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Student)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownLabel::new("status", value))
    }
}

/// Supporting document kinds. The declared order is the order files must follow in a bundle
/// upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    BirthCertificate,
    NationalId,
    AcademicTranscript,
    PassportPhoto,
    MedicalCertificate,
}

impl DocumentType {
    pub const CATALOG: [DocumentType; 5] = [
        DocumentType::BirthCertificate,
        DocumentType::NationalId,
        DocumentType::AcademicTranscript,
        DocumentType::PassportPhoto,
        DocumentType::MedicalCertificate,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::BirthCertificate => "BIRTH_CERTIFICATE",
            DocumentType::NationalId => "NATIONAL_ID",
            DocumentType::AcademicTranscript => "ACADEMIC_TRANSCRIPT",
            DocumentType::PassportPhoto => "PASSPORT_PHOTO",
            DocumentType::MedicalCertificate => "MEDICAL_CERTIFICATE",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentType {
    type Err = UnknownLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DocumentType::CATALOG
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownLabel::new("document type", value))
    }
}

/// Raised when a wire label does not name a known enumeration member.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownLabel {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Personal and contact attributes captured at intake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nationality: Option<String>,
    pub region_of_origin: Option<String>,
    pub address: Option<String>,
    pub whatsapp_number: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationDetails {
    pub last_institution: Option<String>,
    pub highest_qualification: Option<String>,
    pub field_of_study: Option<String>,
    pub graduation_year: Option<u16>,
    pub average_grade: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyDetails {
    pub father_name: Option<String>,
    pub father_occupation: Option<String>,
    pub mother_name: Option<String>,
    pub mother_occupation: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_email: Option<String>,
}

/// Intake payload used to open an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateDetails {
    pub matricule: Option<String>,
    pub program: Option<Program>,
    #[serde(flatten)]
    pub profile: CandidateProfile,
    pub education: Option<EducationDetails>,
    pub family: Option<FamilyDetails>,
}

/// Position of a document within its application, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u32);

/// Stored supporting document. Never mutated once attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub document_type: DocumentType,
    pub filename: String,
    pub content: Vec<u8>,
}

/// Aggregate root owning education, family, and document records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: Option<ApplicationId>,
    pub matricule: Option<String>,
    pub profile: CandidateProfile,
    pub program: Program,
    pub status: ApplicationStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub education: Option<EducationDetails>,
    pub family: Option<FamilyDetails>,
    pub documents: Vec<Document>,
    pub version: u64,
}

impl Application {
    /// Unsaved application in the pre-submission state.
    pub fn new(profile: CandidateProfile, program: Program) -> Self {
        Self {
            id: None,
            matricule: None,
            profile,
            program,
            status: ApplicationStatus::Pending,
            submitted_at: None,
            education: None,
            family: None,
            documents: Vec::new(),
            version: 0,
        }
    }

    /// Names of the sections still required before submission.
    pub fn missing_sections(&self) -> Vec<&'static str> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(|text| !text.trim().is_empty())
                .unwrap_or(false)
        };

        let mut missing = Vec::new();
        if !present(&self.profile.first_name) {
            missing.push("first_name");
        }
        if !present(&self.profile.last_name) {
            missing.push("last_name");
        }
        if !present(&self.profile.email) {
            missing.push("email");
        }
        if !present(&self.profile.phone_number) {
            missing.push("phone_number");
        }
        if self.education.is_none() {
            missing.push("education");
        }
        if self.family.is_none() {
            missing.push("family");
        }
        missing
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.documents.get(index)
    }

    pub fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            id: self.id,
            matricule: self.matricule.clone(),
            first_name: self.profile.first_name.clone(),
            last_name: self.profile.last_name.clone(),
            program: self.program,
            status: self.status.label(),
            submitted_at: self.submitted_at,
            education_complete: self.education.is_some(),
            family_complete: self.family.is_some(),
            documents: self
                .documents
                .iter()
                .enumerate()
                .map(|(index, document)| DocumentSummary {
                    id: DocumentId(index as u32 + 1),
                    document_type: document.document_type,
                    filename: document.filename.clone(),
                    size: document.content.len(),
                })
                .collect(),
        }
    }
}

/// Outward view of an application with document contents elided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationSummary {
    pub id: Option<ApplicationId>,
    pub matricule: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub program: Program,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub education_complete: bool,
    pub family_complete: bool,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub document_type: DocumentType,
    pub filename: String,
    pub size: usize,
}

use std::io::Write;

use serde::Serialize;

use super::domain::Application;

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to write roster csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush roster csv: {0}")]
    Io(#[from] std::io::Error),
    #[error("roster csv is not valid utf-8")]
    Encoding,
}

#[derive(Debug, Serialize)]
struct RosterRow<'a> {
    application_id: String,
    matricule: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    program: &'static str,
    status: &'static str,
    submitted_at: String,
    documents: usize,
}

impl<'a> From<&'a Application> for RosterRow<'a> {
    fn from(application: &'a Application) -> Self {
        Self {
            application_id: application
                .id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            matricule: application.matricule.as_deref().unwrap_or(""),
            first_name: application.profile.first_name.as_deref().unwrap_or(""),
            last_name: application.profile.last_name.as_deref().unwrap_or(""),
            program: application.program.label(),
            status: application.status.label(),
            submitted_at: application
                .submitted_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
            documents: application.documents.len(),
        }
    }
}

/// Write one CSV row per application, ordered by identity.
pub fn write_roster<W: Write>(applications: &[Application], writer: W) -> Result<(), RosterError> {
    let mut sorted: Vec<&Application> = applications.iter().collect();
    sorted.sort_by_key(|application| application.id);

    let mut csv_writer = csv::Writer::from_writer(writer);
    for application in sorted {
        csv_writer.serialize(RosterRow::from(application))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn roster_csv(applications: &[Application]) -> Result<String, RosterError> {
    let mut buffer = Vec::new();
    write_roster(applications, &mut buffer)?;
    String::from_utf8(buffer).map_err(|_| RosterError::Encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::admission::domain::{
        ApplicationId, ApplicationStatus, CandidateProfile, Program,
    };

    fn application(id: u64, first_name: &str, status: ApplicationStatus) -> Application {
        let mut application = Application::new(
            CandidateProfile {
                first_name: Some(first_name.to_string()),
                last_name: Some("Mbarga".to_string()),
                ..CandidateProfile::default()
            },
            Program::Management,
        );
        application.id = Some(ApplicationId(id));
        application.matricule = Some(format!("2026MGT{id:04}"));
        application.status = status;
        application
    }

    #[test]
    fn roster_lists_applications_in_identity_order() {
        let applications = vec![
            application(2, "Awa", ApplicationStatus::Student),
            application(1, "Paul", ApplicationStatus::Submitted),
        ];

        let csv = roster_csv(&applications).expect("roster renders");
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "application_id,matricule,first_name,last_name,program,status,submitted_at,documents"
        );
        assert_eq!(lines[1], "1,2026MGT0001,Paul,Mbarga,MANAGEMENT,SUBMITTED,,0");
        assert_eq!(lines[2], "2,2026MGT0002,Awa,Mbarga,MANAGEMENT,STUDENT,,0");
    }

    #[test]
    fn empty_roster_has_no_rows() {
        let csv = roster_csv(&[]).expect("roster renders");
        assert!(csv.is_empty());
    }
}

use crate::infra::{LogMailer, PinnedClock};
use admissions::error::AppError;
use admissions::workflows::admission::{
    roster_csv, Application, ApplicationLifecycle, ApplicationStatus, CandidateDetails,
    CandidateProfile, DisabledDirectory, DocumentType, EducationDetails, FamilyDetails,
    InMemoryApplicationRepository, InMemoryFile, Program,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Program the sample candidate applies to (ENGINEERING, MANAGEMENT, LICENSE)
    #[arg(long, default_value = "ENGINEERING")]
    pub(crate) program: Program,
    /// Intake date (YYYY-MM-DD) used for timestamps and the matricule year. Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Stop after the admission offer instead of enrolling the candidate.
    #[arg(long)]
    pub(crate) skip_enrollment: bool,
    /// Print the CSV roster once the walkthrough finishes.
    #[arg(long)]
    pub(crate) roster: bool,
}

type DemoLifecycle = ApplicationLifecycle<InMemoryApplicationRepository, LogMailer, DisabledDirectory>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        program,
        today,
        skip_enrollment,
        roster,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let mailer = Arc::new(LogMailer::default());
    let lifecycle = ApplicationLifecycle::new(
        Arc::new(InMemoryApplicationRepository::new()),
        mailer.clone(),
        Arc::new(DisabledDirectory),
    )
    .with_clock(Arc::new(PinnedClock::on(today)));

    println!("Admission lifecycle demo ({program}, {today})");
    let application = lifecycle.initialize(demo_candidate(program))?;
    let id = match application.id {
        Some(id) => id,
        None => return Ok(()),
    };
    print_step("Application opened", &application);

    if let Err(err) = lifecycle.submit(id) {
        println!("  Submission refused: {err}");
    }

    lifecycle.attach_education_details(id, demo_education())?;
    lifecycle.attach_family_details(id, demo_family())?;
    let documents = lifecycle.upload_document_bundle(id, &demo_bundle())?;
    println!(
        "- Attached {} documents: {}",
        documents.documents.len(),
        documents
            .documents
            .iter()
            .map(|document| document.document_type.label())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let submitted = lifecycle.submit(id)?;
    print_step("Submitted", &submitted);

    let mut steps = vec![
        ApplicationStatus::ApplicationAccepted,
        ApplicationStatus::ExamRegistered,
        ApplicationStatus::AdmissionOffered,
    ];
    if !skip_enrollment {
        steps.push(ApplicationStatus::Student);
    }
    for status in steps {
        let updated = lifecycle.transition_status(id, status)?;
        print_step("Status changed", &updated);
    }

    if !skip_enrollment {
        match lifecycle.transition_status(id, ApplicationStatus::AdmissionRejected) {
            Err(err) => println!("  Further changes refused: {err}"),
            Ok(_) => println!("  Unexpected: enrolled candidate changed status"),
        }
    }

    println!("- Notifications sent to: {}", mailer.recipients().join(", "));

    if roster {
        print_roster(&lifecycle)?;
    }

    Ok(())
}

fn print_step(label: &str, application: &Application) {
    println!(
        "- {label}: {} | matricule {} | status {}",
        application
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
        application.matricule.as_deref().unwrap_or("-"),
        application.status
    );
}

fn print_roster(lifecycle: &DemoLifecycle) -> Result<(), AppError> {
    let applications = lifecycle.list()?;
    match roster_csv(&applications) {
        Ok(csv) => {
            println!("\nRoster");
            print!("{csv}");
        }
        Err(err) => println!("  Roster unavailable: {err}"),
    }
    Ok(())
}

fn demo_candidate(program: Program) -> CandidateDetails {
    CandidateDetails {
        matricule: None,
        program: Some(program),
        profile: CandidateProfile {
            first_name: Some("Awa".to_string()),
            last_name: Some("Ngono".to_string()),
            nationality: Some("Cameroonian".to_string()),
            region_of_origin: Some("Centre".to_string()),
            email: Some("awa.ngono@example.cm".to_string()),
            phone_number: Some("+237690112233".to_string()),
            ..CandidateProfile::default()
        },
        education: None,
        family: None,
    }
}

fn demo_education() -> EducationDetails {
    EducationDetails {
        last_institution: Some("Lycee General Leclerc".to_string()),
        highest_qualification: Some("Baccalaureat C".to_string()),
        field_of_study: Some("Mathematics".to_string()),
        graduation_year: Some(2025),
        average_grade: Some("14.5/20".to_string()),
    }
}

fn demo_family() -> FamilyDetails {
    FamilyDetails {
        father_name: Some("Paul Ngono".to_string()),
        mother_name: Some("Berthe Ngono".to_string()),
        ..FamilyDetails::default()
    }
}

fn demo_bundle() -> Vec<InMemoryFile> {
    DocumentType::CATALOG
        .iter()
        .map(|kind| {
            InMemoryFile::new(
                format!("{}.pdf", kind.label().to_lowercase()),
                format!("sample {}", kind.label()).into_bytes(),
            )
        })
        .collect()
}

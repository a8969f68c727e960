//! Matricule generation.

use super::domain::Program;

/// Code used when no program is known.
pub const FALLBACK_PROGRAM_CODE: &str = "OTH";

/// Canonical program code table shared by every matricule call site.
pub const fn program_code(program: Option<Program>) -> &'static str {
    match program {
        Some(Program::Engineering) => "ING",
        Some(Program::Management) => "MGT",
        Some(Program::License) => "LIC",
        None => FALLBACK_PROGRAM_CODE,
    }
}

/// Builds enrollment identifiers of the form `{year}{program code}{sequence}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatriculeGenerator;

impl MatriculeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// The sequence is zero-padded to at least four digits. Pass the application identity so
    /// regeneration for the same application and year is idempotent.
    pub fn generate(&self, program: Option<Program>, sequence: u64, year: i32) -> String {
        format!("{year:04}{}{sequence:04}", program_code(program))
    }
}

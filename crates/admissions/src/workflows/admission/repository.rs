//! Application storage. Uniqueness rules are checked inside `save`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::domain::{Application, ApplicationId, ApplicationStatus, Program};

/// Storage abstraction so the lifecycle can be exercised in isolation.
///
/// `save` assigns an identity when the application has none and must reject writes whose
/// `version` no longer matches the stored row, bumping the version on success. Implementations
/// also guarantee that a matricule appears at most once per program and that finalized
/// (`Student`) matricules are unique across programs. Both checks happen inside the write.
pub trait ApplicationRepository: Send + Sync {
    fn save(&self, application: Application) -> Result<Application, RepositoryError>;
    fn find_by_id(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn find_by_matricule_and_program(
        &self,
        matricule: &str,
        program: Program,
    ) -> Result<Option<Application>, RepositoryError>;
    fn find_by_matricule(&self, matricule: &str) -> Result<Option<Application>, RepositoryError>;
    fn find_all(&self) -> Result<Vec<Application>, RepositoryError>;
    fn delete(&self, id: ApplicationId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("application {id} was modified concurrently (expected version {expected}, found {found})")]
    StaleWrite {
        id: ApplicationId,
        expected: u64,
        found: u64,
    },
    #[error("matricule {0} is already assigned to a student")]
    DuplicateMatricule(String),
    #[error("an application for matricule {matricule} in {program} already exists")]
    DuplicateApplication { matricule: String, program: Program },
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Process-local repository keyed by application identity.
#[derive(Debug, Default, Clone)]
pub struct InMemoryApplicationRepository {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    records: BTreeMap<ApplicationId, Application>,
}

impl InMemoryApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn save(&self, mut application: Application) -> Result<Application, RepositoryError> {
        let mut state = self.lock()?;

        let id = match application.id {
            Some(id) => {
                let stored = state.records.get(&id).ok_or(RepositoryError::NotFound)?;
                if stored.version != application.version {
                    return Err(RepositoryError::StaleWrite {
                        id,
                        expected: application.version,
                        found: stored.version,
                    });
                }
                id
            }
            None => {
                state.next_id += 1;
                ApplicationId(state.next_id)
            }
        };

        if let Some(matricule) = application.matricule.as_deref() {
            let applied = state.records.values().any(|other| {
                other.id != Some(id)
                    && other.program == application.program
                    && other.matricule.as_deref() == Some(matricule)
            });
            if applied {
                return Err(RepositoryError::DuplicateApplication {
                    matricule: matricule.to_string(),
                    program: application.program,
                });
            }
        }

        if application.status == ApplicationStatus::Student {
            if let Some(matricule) = application.matricule.as_deref() {
                let taken = state.records.values().any(|other| {
                    other.id != Some(id)
                        && other.status == ApplicationStatus::Student
                        && other.matricule.as_deref() == Some(matricule)
                });
                if taken {
                    return Err(RepositoryError::DuplicateMatricule(matricule.to_string()));
                }
            }
        }

        application.id = Some(id);
        application.version += 1;
        state.records.insert(id, application.clone());
        Ok(application)
    }

    fn find_by_id(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.records.get(&id).cloned())
    }

    fn find_by_matricule_and_program(
        &self,
        matricule: &str,
        program: Program,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .records
            .values()
            .find(|record| {
                record.program == program && record.matricule.as_deref() == Some(matricule)
            })
            .cloned())
    }

    fn find_by_matricule(&self, matricule: &str) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .records
            .values()
            .find(|record| record.matricule.as_deref() == Some(matricule))
            .cloned())
    }

    fn find_all(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(self.lock()?.records.values().cloned().collect())
    }

    fn delete(&self, id: ApplicationId) -> Result<(), RepositoryError> {
        self.lock()?
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

use std::path::PathBuf;

use super::domain::{Document, DocumentType, UnknownLabel};

/// Uploaded file whose bytes may need to be read from an external source.
pub trait DocumentFile {
    fn filename(&self) -> &str;
    fn read_bytes(&self) -> std::io::Result<Vec<u8>>;
}

/// File already held in memory, e.g. a decoded request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryFile {
    pub filename: String,
    pub content: Vec<u8>,
}

impl InMemoryFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

impl DocumentFile for InMemoryFile {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.content.clone())
    }
}

/// File read lazily from the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskFile {
    path: PathBuf,
    filename: String,
}

impl DiskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, filename }
    }
}

impl DocumentFile for DiskFile {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

/// Failures raised while turning uploaded files into document records.
#[derive(Debug, thiserror::Error)]
pub enum DocumentBundleError {
    #[error("you must upload all required documents ({required} files), received {found}")]
    CountMismatch { required: usize, found: usize },
    #[error("failed to process document: {filename}")]
    Io {
        filename: String,
        #[source]
        source: std::io::Error,
    },
    #[error("received {files} files but {labels} document types")]
    LabelCountMismatch { files: usize, labels: usize },
    #[error(transparent)]
    UnknownType(#[from] UnknownLabel),
}

/// Checks uploaded files against the document catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentBundleValidator;

impl DocumentBundleValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn required_count(&self) -> usize {
        DocumentType::CATALOG.len()
    }

    /// Builds one document per catalog entry. Files are matched to types by position, so the
    /// caller must order them as `DocumentType::CATALOG` is declared. Nothing is returned unless
    /// every file was read.
    pub fn validate_and_build<F: DocumentFile>(
        &self,
        files: &[F],
    ) -> Result<Vec<Document>, DocumentBundleError> {
        let required = self.required_count();
        if files.len() != required {
            return Err(DocumentBundleError::CountMismatch {
                required,
                found: files.len(),
            });
        }

        files
            .iter()
            .zip(DocumentType::CATALOG)
            .map(|(file, document_type)| read_document(file, document_type))
            .collect()
    }

    /// Builds documents from an explicit parallel list of type labels, without the bundle count
    /// requirement.
    pub fn build_with_types<F: DocumentFile, L: AsRef<str>>(
        &self,
        files: &[F],
        labels: &[L],
    ) -> Result<Vec<Document>, DocumentBundleError> {
        if files.len() != labels.len() {
            return Err(DocumentBundleError::LabelCountMismatch {
                files: files.len(),
                labels: labels.len(),
            });
        }

        let types = labels
            .iter()
            .map(|label| label.as_ref().parse::<DocumentType>())
            .collect::<Result<Vec<_>, _>>()?;

        files
            .iter()
            .zip(types)
            .map(|(file, document_type)| read_document(file, document_type))
            .collect()
    }
}

fn read_document<F: DocumentFile>(
    file: &F,
    document_type: DocumentType,
) -> Result<Document, DocumentBundleError> {
    let content = file.read_bytes().map_err(|source| DocumentBundleError::Io {
        filename: file.filename().to_string(),
        source,
    })?;

    Ok(Document {
        document_type,
        filename: file.filename().to_string(),
        content,
    })
}

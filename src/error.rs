use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upload rejected by server with HTTP status {0}")]
    HttpStatus(u16),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Server returned an empty response")]
    EmptyResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upload failed for image {index}: {source}")]
    BatchItem {
        index: usize,
        #[source]
        source: Box<UploadError>,
    },
}

impl UploadError {
    /// HTTP status carried by this error, looking through batch wrapping.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            UploadError::HttpStatus(status) => Some(*status),
            UploadError::BatchItem { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// Position of the failing item when this error came out of a batch.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            UploadError::BatchItem { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub(crate) fn in_batch(self, index: usize) -> Self {
        UploadError::BatchItem {
            index,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, UploadError>;

use mime::Mime;
use reqwest::multipart::{Form, Part};
use tokio::fs;

use crate::error::{Result, UploadError};
use crate::source::{BinarySource, ResolvedSource};

/// Form field name the upload endpoints read the image from.
pub const FILE_FIELD: &str = "file";

/// The single part of an upload body, with the image bytes loaded.
#[derive(Debug, Clone)]
pub struct MultipartPayload {
    pub field: &'static str,
    pub filename: String,
    pub mime: Mime,
    pub data: Vec<u8>,
}

impl MultipartPayload {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Builds the form. The boundary, and with it the request Content-Type,
    /// is chosen by reqwest when the form is attached to a request.
    pub fn into_form(self) -> Result<Form> {
        let part = Part::bytes(self.data)
            .file_name(self.filename)
            .mime_str(self.mime.as_ref())
            .map_err(|e| UploadError::InvalidInput(format!("Invalid MIME type: {}", e)))?;

        Ok(Form::new().part(self.field, part))
    }
}

pub struct MultipartEncoder;

impl MultipartEncoder {
    /// Loads the bytes behind a resolved source into a one-part payload.
    pub async fn encode(source: ResolvedSource) -> Result<MultipartPayload> {
        let data = match source.binary {
            BinarySource::Inline(bytes) => bytes.to_vec(),
            BinarySource::File(path) => fs::read(&path).await.map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read image file");
                UploadError::Io(e)
            })?,
        };

        Ok(MultipartPayload {
            field: FILE_FIELD,
            filename: source.filename,
            mime: source.mime,
            data,
        })
    }
}

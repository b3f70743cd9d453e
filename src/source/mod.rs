//! Turns a caller-supplied image reference into something that can be
//! uploaded: a binary source plus a file name and MIME type that are always
//! populated.

pub mod media_type;
pub mod normalizer;

use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use chrono::Utc;
use mime::Mime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Result, UploadError};

pub use normalizer::{
    AndroidPathNormalizer, PassthroughNormalizer, PathNormalizer, Platform, ANDROID_FILE_SCHEME,
};

const DATA_URI_SCHEME: &str = "data:";

/// Where an image comes from: a local path/URI as handed over by a camera or
/// gallery picker, or a structured payload that may carry the bytes inline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceReference {
    Uri(String),
    Inline(InlineSource),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InlineSource {
    #[serde(default)]
    pub uri: Option<String>,
    /// Base64 payload, optionally prefixed with a `data:<mime>;base64,` header.
    #[serde(default, alias = "data")]
    pub base64: Option<String>,
    #[serde(default, alias = "name")]
    pub filename: Option<String>,
    #[serde(default, alias = "type")]
    pub mime: Option<String>,
}

impl SourceReference {
    pub fn uri(uri: impl Into<String>) -> Self {
        SourceReference::Uri(uri.into())
    }

    pub fn base64(payload: impl Into<String>) -> Self {
        SourceReference::Inline(InlineSource {
            base64: Some(payload.into()),
            ..Default::default()
        })
    }

    fn parts(&self) -> SourceParts<'_> {
        match self {
            SourceReference::Uri(uri) => SourceParts {
                uri: Some(uri.as_str()),
                ..Default::default()
            },
            SourceReference::Inline(inline) => SourceParts {
                uri: inline.uri.as_deref(),
                base64: inline.base64.as_deref(),
                filename: inline.filename.as_deref(),
                mime: inline.mime.as_deref(),
            },
        }
    }
}

impl From<&str> for SourceReference {
    fn from(uri: &str) -> Self {
        SourceReference::uri(uri)
    }
}

impl From<String> for SourceReference {
    fn from(uri: String) -> Self {
        SourceReference::Uri(uri)
    }
}

impl From<InlineSource> for SourceReference {
    fn from(inline: InlineSource) -> Self {
        SourceReference::Inline(inline)
    }
}

#[derive(Default)]
struct SourceParts<'a> {
    uri: Option<&'a str>,
    base64: Option<&'a str>,
    filename: Option<&'a str>,
    mime: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinarySource {
    File(PathBuf),
    Inline(Bytes),
}

#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub binary: BinarySource,
    pub filename: String,
    pub mime: Mime,
}

/// Resolves [`SourceReference`]s using the path normalizer picked for the
/// target platform.
#[derive(Clone)]
pub struct PathResolver {
    normalizer: Arc<dyn PathNormalizer>,
}

impl PathResolver {
    pub fn new(normalizer: Arc<dyn PathNormalizer>) -> Self {
        Self { normalizer }
    }

    pub fn for_platform(platform: Platform) -> Self {
        Self::new(platform.normalizer())
    }

    pub fn resolve(&self, reference: &SourceReference) -> Result<ResolvedSource> {
        let parts = reference.parts();

        // The URI goes to the normalizer untouched; trimming only decides
        // whether it is present.
        let mut uri = parts.uri.filter(|u| !u.trim().is_empty());
        let mut payload = non_empty(parts.base64);

        // A data URI is an inline payload, never a path, and takes the
        // URI's precedence over a separate base64 field.
        if let Some(u) = uri {
            let trimmed = u.trim();
            if trimmed.starts_with(DATA_URI_SCHEME) {
                payload = Some(trimmed);
                uri = None;
            }
        }

        let (binary, name_hint, embedded_mime) = if let Some(u) = uri {
            let path = self.normalizer.normalize(u);
            (BinarySource::File(PathBuf::from(path)), Some(path), None)
        } else if let Some(p) = payload {
            let (data, embedded_mime) = decode_payload(p)?;
            (BinarySource::Inline(data), None, embedded_mime)
        } else {
            return Err(UploadError::InvalidInput(
                "No image file or encoded image data was provided".to_string(),
            ));
        };

        let filename = non_empty(parts.filename)
            .map(str::to_string)
            .or_else(|| name_hint.and_then(last_segment).map(str::to_string));

        let mime = explicit_mime(parts.mime)
            .or(embedded_mime)
            .or_else(|| {
                filename
                    .as_deref()
                    .and_then(media_type::extension_of)
                    .or_else(|| name_hint.map(strip_query).and_then(media_type::extension_of))
                    .map(media_type::mime_from_extension)
            })
            .unwrap_or_else(media_type::fallback_mime);

        let filename = filename.unwrap_or_else(|| placeholder_filename(&mime));

        tracing::debug!(filename = %filename, mime = %mime, "Resolved upload source");

        Ok(ResolvedSource {
            binary,
            filename,
            mime,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn strip_query(uri: &str) -> &str {
    uri.split(['?', '#']).next().unwrap_or(uri)
}

fn last_segment(uri: &str) -> Option<&str> {
    strip_query(uri)
        .rsplit(media_type::PATH_SEPARATORS)
        .next()
        .filter(|segment| !segment.is_empty())
}

fn explicit_mime(value: Option<&str>) -> Option<Mime> {
    let raw = non_empty(value)?;
    match raw.parse::<Mime>() {
        Ok(mime) => Some(mime),
        Err(e) => {
            tracing::warn!(mime = %raw, error = %e, "Ignoring unparsable MIME type");
            None
        }
    }
}

/// Decodes a base64 payload, peeling off an optional data URI header.
fn decode_payload(payload: &str) -> Result<(Bytes, Option<Mime>)> {
    let (header_mime, encoded) = match payload.strip_prefix(DATA_URI_SCHEME) {
        Some(rest) => {
            let (header, encoded) = rest.split_once(',').ok_or_else(|| {
                UploadError::InvalidInput("Malformed data URI: missing ','".to_string())
            })?;
            let media_type = header.strip_suffix(";base64").ok_or_else(|| {
                UploadError::InvalidInput("Only base64 data URIs are supported".to_string())
            })?;
            (media_type.parse::<Mime>().ok(), encoded)
        }
        None => (None, payload),
    };

    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let data = general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| UploadError::InvalidInput(format!("Failed to decode base64: {}", e)))?;

    if data.is_empty() {
        return Err(UploadError::InvalidInput(
            "Encoded image data is empty".to_string(),
        ));
    }

    Ok((Bytes::from(data), header_mime))
}

fn placeholder_filename(mime: &Mime) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!(
        "upload_{}_{}.{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        &id[..8],
        media_type::extension_for(mime)
    )
}

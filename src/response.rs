//! Interpretation of upload responses.
//!
//! The backend answers either with a JSON document holding the hosted URL or
//! with the bare URL as plain text. The body is classified once into a
//! [`ResponseBody`] and the URL is read from that.

use serde_json::Value as JsonValue;

use crate::error::{Result, UploadError};

/// JSON fields that may hold the hosted URL, in lookup order.
pub const URL_FIELDS: [&str; 3] = ["response", "data", "url"];

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The body parsed as JSON. `raw` is the untouched body text.
    Structured { value: JsonValue, raw: String },
    PlainText(String),
}

impl ResponseBody {
    pub fn classify(raw: &str) -> Self {
        let looks_structured = matches!(raw.trim_start().chars().next(), Some('{') | Some('['));

        if looks_structured {
            match serde_json::from_str::<JsonValue>(raw.trim()) {
                Ok(value) => {
                    return ResponseBody::Structured {
                        value,
                        raw: raw.to_string(),
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Response looked like JSON but did not parse");
                }
            }
        }

        ResponseBody::PlainText(raw.to_string())
    }

    /// The hosted URL. Structured bodies without a usable URL field fall
    /// back to the raw text.
    pub fn url(&self) -> &str {
        match self {
            ResponseBody::Structured { value, raw } => URL_FIELDS
                .iter()
                .find_map(|field| {
                    value
                        .get(*field)
                        .and_then(JsonValue::as_str)
                        .filter(|url| !url.is_empty())
                })
                .unwrap_or(raw.as_str()),
            ResponseBody::PlainText(raw) => raw.as_str(),
        }
    }
}

pub struct ResponseInterpreter;

impl ResponseInterpreter {
    /// Extracts the hosted URL from a successful response body. Only a body
    /// with no bytes at all is rejected; anything else yields a URL.
    pub fn interpret(raw: &str) -> Result<String> {
        if raw.is_empty() {
            return Err(UploadError::EmptyResponse);
        }

        Ok(ResponseBody::classify(raw).url().to_string())
    }
}

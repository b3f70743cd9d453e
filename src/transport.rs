use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::EndpointConfig;
use crate::error::{Result, UploadError};
use crate::multipart::MultipartPayload;

pub const AVATAR_PATH: &str = "uploadavatar";
pub const IMAGE_PATH: &str = "uploadImagev2";

/// Which upload endpoint a request goes to, with the ids it is scoped by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "endpoint", rename_all = "snake_case")]
pub enum UploadTarget {
    Avatar { store_id: String, user_id: String },
    Image { store_id: String },
}

impl UploadTarget {
    pub fn avatar(store_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        UploadTarget::Avatar {
            store_id: store_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn image(store_id: impl Into<String>) -> Self {
        UploadTarget::Image {
            store_id: store_id.into(),
        }
    }

    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            UploadTarget::Avatar { .. } => "avatar",
            UploadTarget::Image { .. } => "image",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
    mobile_base_url: String,
}

impl Endpoints {
    pub fn new(base_url: impl Into<String>, mobile_base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            mobile_base_url: mobile_base_url.into(),
        }
    }

    pub fn url_for(&self, target: &UploadTarget) -> Result<Url> {
        let (base, path) = match target {
            UploadTarget::Avatar { .. } => (&self.base_url, AVATAR_PATH),
            UploadTarget::Image { .. } => (&self.mobile_base_url, IMAGE_PATH),
        };

        let raw = format!("{}/{}", base.trim_end_matches('/'), path);
        let mut url = Url::parse(&raw)
            .map_err(|e| UploadError::Config(format!("Invalid endpoint '{}': {}", raw, e)))?;

        {
            let mut query = url.query_pairs_mut();
            match target {
                UploadTarget::Avatar { store_id, user_id } => {
                    query.append_pair("storeid", store_id);
                    query.append_pair("userid", user_id);
                }
                UploadTarget::Image { store_id } => {
                    query.append_pair("storeid", store_id);
                }
            }
        }

        Ok(url)
    }
}

impl From<&EndpointConfig> for Endpoints {
    fn from(config: &EndpointConfig) -> Self {
        Self::new(config.base_url.clone(), config.mobile_base_url.clone())
    }
}

/// Status line and body of a completed upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a one-part multipart upload and reports the raw response.
///
/// Implementations must return [`UploadError::HttpStatus`] for any status
/// outside `[200, 300)` and must leave the Content-Type header to the HTTP
/// client so the multipart boundary is announced.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn send(&self, url: Url, payload: MultipartPayload) -> Result<RawResponse>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport whose client never follows redirects. A 3xx answer to an
    /// upload is reported as [`UploadError::HttpStatus`]; following it would
    /// replay the POST as a body-less GET.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| UploadError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Uses a caller-built client as is, including its redirect policy.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn send(&self, url: Url, payload: MultipartPayload) -> Result<RawResponse> {
        let form = payload.into_form()?;

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(format!("Failed to send upload: {}", e)))?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            if let Ok(body) = response.text().await {
                tracing::debug!(status, body = %body, "Upload rejected");
            }
            return Err(UploadError::HttpStatus(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Transport(format!("Failed to read response: {}", e)))?;

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{closed_port_url, MockBackend, Reply};

    fn endpoints() -> Endpoints {
        Endpoints::new("https://api.example.com/api/", "https://m.example.com/mobile")
    }

    fn payload() -> MultipartPayload {
        MultipartPayload {
            field: crate::multipart::FILE_FIELD,
            filename: "a.jpg".to_string(),
            mime: mime::IMAGE_JPEG,
            data: b"jpeg".to_vec(),
        }
    }

    #[test]
    fn test_avatar_url() {
        let url = endpoints()
            .url_for(&UploadTarget::avatar("42", "7"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/uploadavatar?storeid=42&userid=7"
        );
    }

    #[test]
    fn test_image_url_has_only_store_id() {
        let url = endpoints().url_for(&UploadTarget::image("42")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://m.example.com/mobile/uploadImagev2?storeid=42"
        );
    }

    #[test]
    fn test_success_range() {
        for status in [200, 201, 204, 299] {
            assert!(RawResponse { status, body: String::new() }.is_success());
        }
        for status in [199, 300, 404, 500] {
            assert!(!RawResponse { status, body: String::new() }.is_success());
        }
    }

    #[tokio::test]
    async fn test_transport_lets_client_set_boundary() {
        let backend = MockBackend::start(vec![Reply::ok("https://cdn/x.jpg")]).await;
        let url = backend.endpoints().url_for(&UploadTarget::image("9")).unwrap();

        let response = HttpTransport::new().unwrap().send(url, payload()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "https://cdn/x.jpg");

        let received = backend.received().await;
        assert_eq!(received.len(), 1);
        let request = &received[0];
        assert!(request
            .content_type
            .starts_with("multipart/form-data; boundary="));
        assert_eq!(request.query.get("storeid").map(String::as_str), Some("9"));
        assert_eq!(request.field_names, vec!["file".to_string()]);
        assert_eq!(request.file_name.as_deref(), Some("a.jpg"));
        assert_eq!(request.file_content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(request.file_data, b"jpeg".to_vec());
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let backend = MockBackend::start(vec![Reply::status(500, "boom")]).await;
        let url = backend.endpoints().url_for(&UploadTarget::image("9")).unwrap();

        let err = HttpTransport::new().unwrap().send(url, payload()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_redirect_is_not_followed() {
        let backend = MockBackend::start(vec![Reply::redirect(303, "/login")]).await;
        let url = backend.endpoints().url_for(&UploadTarget::image("9")).unwrap();

        let err = HttpTransport::new().unwrap().send(url, payload()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(303));
        assert_eq!(backend.login_hits(), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let url = Url::parse(&closed_port_url("uploadImagev2?storeid=1")).unwrap();
        let err = HttpTransport::new().unwrap().send(url, payload()).await.unwrap_err();
        assert!(matches!(err, UploadError::Transport(_)));
    }
}

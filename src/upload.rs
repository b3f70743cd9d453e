use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{Result, UploadError};
use crate::metrics::SharedMetrics;
use crate::multipart::MultipartEncoder;
use crate::response::ResponseInterpreter;
use crate::source::{PathResolver, SourceReference};
use crate::transport::{Endpoints, HttpTransport, UploadTarget, UploadTransport};

/// Steps of a single upload. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Idle,
    ResolvingPath,
    Encoding,
    Transmitting,
    Interpreting,
    Succeeded,
    Failed,
}

impl UploadStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStage::Succeeded | UploadStage::Failed)
    }
}

/// Tracks where one upload is, so failures can be reported with the step
/// that produced them.
struct UploadCycle {
    stage: UploadStage,
    endpoint: &'static str,
}

impl UploadCycle {
    fn new(endpoint: &'static str) -> Self {
        Self {
            stage: UploadStage::Idle,
            endpoint,
        }
    }

    fn enter(&mut self, next: UploadStage) {
        debug_assert!(!self.stage.is_terminal());
        tracing::debug!(
            endpoint = self.endpoint,
            from = ?self.stage,
            to = ?next,
            "Upload stage transition"
        );
        self.stage = next;
    }

    fn fail(&mut self, error: &UploadError) {
        tracing::warn!(
            endpoint = self.endpoint,
            stage = ?self.stage,
            error = %error,
            "Upload failed"
        );
        self.stage = UploadStage::Failed;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub source: SourceReference,
    pub target: UploadTarget,
}

/// Caller-facing result of one upload. A successful outcome always carries
/// a URL and a failed one never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    success: bool,
    message: String,
    url: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(url: String) -> Self {
        Self {
            success: true,
            message: "Image uploaded successfully".to_string(),
            url: Some(url),
        }
    }

    pub fn failed(error: &UploadError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            url: None,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl From<Result<String>> for UploadOutcome {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(url) => UploadOutcome::succeeded(url),
            Err(e) => UploadOutcome::failed(&e),
        }
    }
}

/// Anything that can turn a source reference into a hosted URL.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, source: &SourceReference, target: &UploadTarget) -> Result<String>;
}

#[async_trait]
impl<T: MediaUploader + ?Sized> MediaUploader for &T {
    async fn upload(&self, source: &SourceReference, target: &UploadTarget) -> Result<String> {
        (**self).upload(source, target).await
    }
}

#[async_trait]
impl<T: MediaUploader + ?Sized> MediaUploader for Arc<T> {
    async fn upload(&self, source: &SourceReference, target: &UploadTarget) -> Result<String> {
        (**self).upload(source, target).await
    }
}

#[derive(Clone)]
pub struct UploadClient {
    endpoints: Endpoints,
    resolver: PathResolver,
    transport: Arc<dyn UploadTransport>,
    metrics: Option<SharedMetrics>,
}

impl UploadClient {
    pub fn new(
        endpoints: Endpoints,
        resolver: PathResolver,
        transport: Arc<dyn UploadTransport>,
    ) -> Self {
        Self {
            endpoints,
            resolver,
            transport,
            metrics: None,
        }
    }

    /// Client with the HTTP transport and the normalizer for the configured
    /// platform.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        Ok(Self::new(
            Endpoints::from(&config.endpoints),
            PathResolver::for_platform(config.platform),
            Arc::new(HttpTransport::new()?),
        ))
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn upload_avatar(
        &self,
        source: &SourceReference,
        store_id: &str,
        user_id: &str,
    ) -> Result<String> {
        self.upload_to(source, &UploadTarget::avatar(store_id, user_id))
            .await
    }

    pub async fn upload_image(&self, source: &SourceReference, store_id: &str) -> Result<String> {
        self.upload_to(source, &UploadTarget::image(store_id)).await
    }

    pub async fn upload_request(&self, request: &UploadRequest) -> Result<String> {
        self.upload_to(&request.source, &request.target).await
    }

    /// Same as [`upload_request`](Self::upload_request), flattened into an
    /// [`UploadOutcome`].
    pub async fn upload_outcome(&self, request: &UploadRequest) -> UploadOutcome {
        self.upload_request(request).await.into()
    }

    pub async fn upload_to(&self, source: &SourceReference, target: &UploadTarget) -> Result<String> {
        let started = Instant::now();
        let mut cycle = UploadCycle::new(target.label());

        let result = self.run_cycle(&mut cycle, source, target).await;

        match &result {
            Ok(url) => {
                cycle.enter(UploadStage::Succeeded);
                tracing::info!(endpoint = target.label(), url = %url, "Image uploaded");
            }
            Err(e) => cycle.fail(e),
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_upload(
                target.label(),
                result.is_ok(),
                started.elapsed().as_secs_f64(),
            );
        }

        result
    }

    async fn run_cycle(
        &self,
        cycle: &mut UploadCycle,
        source: &SourceReference,
        target: &UploadTarget,
    ) -> Result<String> {
        cycle.enter(UploadStage::ResolvingPath);
        let url = self.endpoints.url_for(target)?;
        let resolved = self.resolver.resolve(source)?;

        cycle.enter(UploadStage::Encoding);
        let payload = MultipartEncoder::encode(resolved).await?;
        tracing::debug!(
            endpoint = target.label(),
            filename = %payload.filename,
            mime = %payload.mime,
            bytes = payload.len(),
            "Encoded upload"
        );
        let payload_len = payload.len();

        cycle.enter(UploadStage::Transmitting);
        let response = self.transport.send(url, payload).await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_bytes(target.label(), payload_len);
        }
        if !response.is_success() {
            return Err(UploadError::HttpStatus(response.status));
        }

        cycle.enter(UploadStage::Interpreting);
        ResponseInterpreter::interpret(&response.body)
    }
}

#[async_trait]
impl MediaUploader for UploadClient {
    async fn upload(&self, source: &SourceReference, target: &UploadTarget) -> Result<String> {
        self.upload_to(source, target).await
    }
}

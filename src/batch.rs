//! Sequential, fail-fast upload of an ordered list of images.
//!
//! Items are uploaded one after another in input order. The first failure
//! stops the batch: later items are never attempted, and the caller gets the
//! failing index instead of a partial list. Items uploaded before the
//! failure stay on the server.

use futures_util::stream::{self, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UploadError};
use crate::metrics::SharedMetrics;
use crate::source::SourceReference;
use crate::transport::UploadTarget;
use crate::upload::MediaUploader;

/// Record pairing an uploaded image with its hosted URL, as consumed by the
/// signup and warranty-case flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub fileid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub index: usize,
    pub source: SourceReference,
}

impl BatchItem {
    pub fn enumerate(sources: &[SourceReference]) -> Vec<BatchItem> {
        sources
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, source)| BatchItem { index, source })
            .collect()
    }
}

pub struct BatchUploader<U> {
    uploader: U,
    target: UploadTarget,
    metrics: Option<SharedMetrics>,
}

impl<U: MediaUploader> BatchUploader<U> {
    pub fn new(uploader: U, target: UploadTarget) -> Self {
        Self {
            uploader,
            target,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Uploads every source in order. On success the result has one entry
    /// per input, in input order. On failure the error is
    /// [`UploadError::BatchItem`] tagged with the first failing index.
    pub async fn upload_all(&self, sources: &[SourceReference]) -> Result<Vec<UploadedFile>> {
        let uploader = &self.uploader;
        let target = &self.target;

        tracing::info!(
            endpoint = target.label(),
            items = sources.len(),
            "Starting image batch"
        );

        let items = BatchItem::enumerate(sources)
            .into_iter()
            .map(Ok::<BatchItem, UploadError>);

        let result = stream::iter(items)
            .try_fold(
                Vec::with_capacity(sources.len()),
                |mut uploaded, item: BatchItem| async move {
                    let url = uploader
                        .upload(&item.source, target)
                        .await
                        .map_err(|e| e.in_batch(item.index))?;

                    tracing::debug!(index = item.index, url = %url, "Batch item uploaded");
                    uploaded.push(UploadedFile { fileid: url });
                    Ok::<_, UploadError>(uploaded)
                },
            )
            .await;

        match &result {
            Ok(uploaded) => {
                tracing::info!(items = uploaded.len(), "Image batch uploaded");
            }
            Err(e) => {
                tracing::warn!(
                    index = ?e.batch_index(),
                    error = %e,
                    "Image batch aborted"
                );
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_batch(result.is_ok());
        }

        result
    }
}

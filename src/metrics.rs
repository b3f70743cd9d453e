// Prometheus metrics for uploads

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

pub struct UploadMetrics {
    pub registry: Registry,

    pub uploads_total: IntCounterVec,
    pub upload_bytes: CounterVec,
    pub upload_duration: HistogramVec,

    pub batches_total: IntCounterVec,
}

impl UploadMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let uploads_total = IntCounterVec::new(
            Opts::new("media_uploads_total", "Total number of single image uploads"),
            &["endpoint", "outcome"],
        )?;
        registry.register(Box::new(uploads_total.clone()))?;

        let upload_bytes = CounterVec::new(
            Opts::new("media_upload_bytes_total", "Total image bytes sent"),
            &["endpoint"],
        )?;
        registry.register(Box::new(upload_bytes.clone()))?;

        let upload_duration = HistogramVec::new(
            HistogramOpts::new(
                "media_upload_duration_seconds",
                "Duration of single image uploads in seconds",
            ),
            &["endpoint"],
        )?;
        registry.register(Box::new(upload_duration.clone()))?;

        let batches_total = IntCounterVec::new(
            Opts::new("media_batches_total", "Total number of image batches"),
            &["outcome"],
        )?;
        registry.register(Box::new(batches_total.clone()))?;

        Ok(Self {
            registry,
            uploads_total,
            upload_bytes,
            upload_duration,
            batches_total,
        })
    }

    pub fn record_upload(&self, endpoint: &str, succeeded: bool, duration_secs: f64) {
        self.uploads_total
            .with_label_values(&[endpoint, outcome_label(succeeded)])
            .inc();
        self.upload_duration
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    pub fn record_bytes(&self, endpoint: &str, bytes: usize) {
        self.upload_bytes
            .with_label_values(&[endpoint])
            .inc_by(bytes as f64);
    }

    pub fn record_batch(&self, succeeded: bool) {
        self.batches_total
            .with_label_values(&[outcome_label(succeeded)])
            .inc();
    }

    /// Renders all metrics in the Prometheus text format.
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn outcome_label(succeeded: bool) -> &'static str {
    if succeeded {
        "success"
    } else {
        "failure"
    }
}

pub type SharedMetrics = Arc<UploadMetrics>;

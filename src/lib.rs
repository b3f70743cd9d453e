//! Client-side image upload for the warranty and retail-operations backend.
//!
//! A caller hands over a [`SourceReference`] (camera/gallery path or inline
//! base64 payload). [`UploadClient`] resolves it, sends it as a one-part
//! multipart body, and returns the hosted URL. [`BatchUploader`] does the
//! same for an ordered list and stops at the first failure.

pub mod batch;
pub mod config;
pub mod error;
pub mod metrics;
pub mod multipart;
pub mod response;
pub mod source;
pub mod transport;
pub mod upload;

#[cfg(test)]
mod test_server;

pub use batch::{BatchItem, BatchUploader, UploadedFile};
pub use config::{Config, EndpointConfig};
pub use error::{Result, UploadError};
pub use metrics::{SharedMetrics, UploadMetrics};
pub use multipart::{MultipartEncoder, MultipartPayload, FILE_FIELD};
pub use response::{ResponseBody, ResponseInterpreter};
pub use source::{
    BinarySource, InlineSource, PathNormalizer, PathResolver, Platform, ResolvedSource,
    SourceReference,
};
pub use transport::{Endpoints, HttpTransport, RawResponse, UploadTarget, UploadTransport};
pub use upload::{MediaUploader, UploadClient, UploadOutcome, UploadRequest, UploadStage};

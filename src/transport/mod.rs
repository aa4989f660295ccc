//! HTTP boundary isolating network mechanics from orchestration.
//!
//! [`Transport`] is the raw, object-safe seam (bytes in, bytes out) so the
//! coordinator and resources can be driven by an in-memory double in tests.
//! [`TransportClient`] layers typed JSON decoding on top of it.

mod client;
mod http;
mod progress;

pub use client::{MultipartUpload, TransportClient};
pub use http::HttpTransport;
pub use progress::ProgressSink;

use crate::error::TransportError;
use crate::upload::UploadFile;
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path`, returning the body of a 2xx response.
    async fn get(&self, path: &str) -> Result<Bytes, TransportError>;

    /// POST `file` as multipart form field `file`, reporting byte progress
    /// through `progress` while the body is being sent.
    async fn post_multipart(
        &self,
        path: &str,
        file: UploadFile,
        progress: ProgressSink,
    ) -> Result<Bytes, TransportError>;

    /// POST `file` as multipart form field `file` without progress reporting.
    async fn post_multipart_once(&self, path: &str, file: UploadFile)
        -> Result<Bytes, TransportError>;
}

use super::{HttpTransport, ProgressSink, Transport};
use crate::config::ApiConfig;
use crate::error::TransportError;
use crate::upload::UploadFile;
use bytes::Bytes;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// An upload in two independent halves: byte progress and the decoded outcome.
///
/// Nothing is sent until `outcome` is first polled.
pub struct MultipartUpload<T> {
    pub progress: mpsc::UnboundedReceiver<u8>,
    pub outcome: BoxFuture<'static, Result<T, TransportError>>,
}

/// Typed access to the delivery API. Cheap to clone; every consumer gets one
/// passed in explicitly.
#[derive(Clone)]
pub struct TransportClient {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportClient").finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, TransportError> {
    serde_json::from_slice(body).map_err(TransportError::from)
}

impl TransportClient {
    pub fn http(config: &ApiConfig) -> Result<Self, TransportError> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let body = self.transport.get(path).await?;
        decode(&body)
    }

    pub fn post_multipart<T>(&self, path: &str, file: UploadFile) -> MultipartUpload<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (sink, progress) = ProgressSink::channel();
        let transport = Arc::clone(&self.transport);
        let path = path.to_string();

        let outcome: BoxFuture<'static, Result<T, TransportError>> = Box::pin(async move {
            let body = transport.post_multipart(&path, file, sink).await?;
            decode(&body)
        });

        MultipartUpload { progress, outcome }
    }

    pub async fn post_multipart_json<T: DeserializeOwned>(
        &self,
        path: &str,
        file: UploadFile,
    ) -> Result<T, TransportError> {
        let body = self.transport.post_multipart_once(path, file).await?;
        decode(&body)
    }

    pub async fn fetch_blob(&self, path: &str) -> Result<Bytes, TransportError> {
        self.transport.get(path).await
    }
}

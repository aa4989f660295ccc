use super::{ProgressSink, Transport};
use crate::config::ApiConfig;
use crate::error::TransportError;
use crate::upload::UploadFile;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, warn};

/// Multipart bodies are handed to the connection in chunks of this size; each
/// chunk pulled counts as sent for progress purposes.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<Bytes, TransportError> {
        let response = request.send().await.map_err(|e| {
            let err = TransportError::from(e);
            warn!(path, error = %err, "Request failed before a response arrived");
            err
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.text().await {
                Ok(text) if !text.trim().is_empty() => text,
                _ => status.canonical_reason().unwrap_or("Unknown error").to_string(),
            };
            warn!(path, status = status.as_u16(), "Request rejected by server");
            return Err(TransportError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(format!("Failed to read response body: {}", e)))
    }

    fn file_part(file: &UploadFile, body: reqwest::Body) -> Result<Part, TransportError> {
        let part = Part::stream_with_length(body, file.size_bytes()).file_name(file.name().to_string());
        match file.mime_type() {
            Some(mime) => part.mime_str(mime).map_err(TransportError::from),
            None => Ok(part),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Bytes, TransportError> {
        debug!(path, "GET");
        self.send(self.client.get(self.build_url(path)), path).await
    }

    async fn post_multipart(
        &self,
        path: &str,
        file: UploadFile,
        progress: ProgressSink,
    ) -> Result<Bytes, TransportError> {
        let total = file.size_bytes();
        let contents = file.contents().clone();
        let chunks: Vec<Bytes> = (0..contents.len())
            .step_by(UPLOAD_CHUNK_BYTES)
            .map(|start| contents.slice(start..(start + UPLOAD_CHUNK_BYTES).min(contents.len())))
            .collect();

        progress.report_bytes(0, total);
        let sink = progress.clone();
        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            sink.report_bytes(sent, total);
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let part = Self::file_part(&file, reqwest::Body::wrap_stream(stream))?;
        let form = Form::new().part("file", part);

        debug!(path, file = file.name(), bytes = total, "POST multipart (tracked)");
        let body = self
            .send(self.client.post(self.build_url(path)).multipart(form), path)
            .await?;
        progress.report_percent(100);
        Ok(body)
    }

    async fn post_multipart_once(
        &self,
        path: &str,
        file: UploadFile,
    ) -> Result<Bytes, TransportError> {
        let part = Self::file_part(&file, reqwest::Body::from(file.contents().clone()))?;
        let form = Form::new().part("file", part);

        debug!(path, file = file.name(), "POST multipart");
        self.send(self.client.post(self.build_url(path)).multipart(form), path)
            .await
    }
}

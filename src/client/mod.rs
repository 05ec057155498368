pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use self::http::HttpTransport;
use crate::error::TransportError;
use crate::models::chat::HistoryEntry;
use crate::models::pdf::{ ChunkDetail, HealthStatus, PdfHandle };

pub const DEFAULT_API_URL: &str = "http://localhost:9000";

/// Raw body of an `/ask` response, read incrementally until exhausted.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// The backend question-answering service as seen by the client.
///
/// No retries: a failed request surfaces immediately to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<PdfHandle, TransportError>;

    async fn list(&self) -> Result<Vec<PdfHandle>, TransportError>;

    /// Fails with `TransportError` on a non-success status before any of the
    /// body has been read.
    async fn ask(
        &self,
        question: &str,
        pdf_id: Option<&str>,
        history: &[HistoryEntry]
    ) -> Result<ByteStream, TransportError>;

    async fn get_chunk(&self, pdf_id: &str, chunk_id: i64) -> Result<ChunkDetail, TransportError>;

    async fn health(&self) -> Result<HealthStatus, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            connect_timeout: Some(Duration::from_secs(10)),
        }
    }
}

pub fn new_client(config: &ClientConfig) -> Result<Arc<dyn Transport>, TransportError> {
    let client = HttpTransport::from_config(config)?;
    Ok(Arc::new(client))
}

use async_trait::async_trait;
use futures::TryStreamExt;
use log::{ debug, info };
use reqwest::multipart::{ Form, Part };
use reqwest::{ Client as HttpClient, Response };
use serde::Serialize;
use std::path::Path;
use url::Url;

use super::{ ByteStream, ClientConfig, Transport };
use crate::error::TransportError;
use crate::models::chat::HistoryEntry;
use crate::models::pdf::{ ChunkDetail, HealthStatus, PdfHandle, PdfList };

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
    base_url: Url,
}

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    pdf_id: Option<&'a str>,
    chat_history: &'a [HistoryEntry],
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::from_config(
            &(ClientConfig {
                base_url: base_url.to_string(),
                ..ClientConfig::default()
            })
        )
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| TransportError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl {
                url: config.base_url.clone(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }
        // so that joining "ask" keeps any path prefix
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = HttpClient::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> Result<Url, TransportError> {
        self.base_url.join(route).map_err(|e| TransportError::InvalidUrl {
            url: format!("{}{}", self.base_url, route),
            reason: e.to_string(),
        })
    }

    async fn check_status(resp: Response) -> Result<Response, TransportError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let message = resp.text().await.unwrap_or_default();
        Err(TransportError::Status { status, message })
    }
}

fn validate_pdf_path(path: &Path) -> Result<String, TransportError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TransportError::InvalidFile {
            path: path.display().to_string(),
            reason: "path has no file name".to_string(),
        })?;
    if !file_name.to_lowercase().ends_with(".pdf") {
        return Err(TransportError::InvalidFile {
            path: path.display().to_string(),
            reason: "only PDF files are supported".to_string(),
        });
    }
    Ok(file_name.to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload(&self, path: &Path) -> Result<PdfHandle, TransportError> {
        let file_name = validate_pdf_path(path)?;
        let bytes = tokio::fs::read(path).await?;
        info!("Uploading {} ({} bytes)", file_name, bytes.len());

        let part = Part::bytes(bytes).file_name(file_name.clone()).mime_str("application/pdf")?;
        let form = Form::new().part("file", part);
        let resp = self.http.post(self.endpoint("upload")?).multipart(form).send().await?;
        let resp = Self::check_status(resp).await?;

        let mut handle: PdfHandle = resp.json().await?;
        if handle.name.is_empty() {
            handle.name = file_name;
        }
        Ok(handle)
    }

    async fn list(&self) -> Result<Vec<PdfHandle>, TransportError> {
        let resp = self.http.get(self.endpoint("pdfs")?).send().await?;
        let resp = Self::check_status(resp).await?;
        let list: PdfList = resp.json().await?;
        Ok(list.pdfs)
    }

    async fn ask(
        &self,
        question: &str,
        pdf_id: Option<&str>,
        history: &[HistoryEntry]
    ) -> Result<ByteStream, TransportError> {
        let req = AskRequest {
            question,
            pdf_id,
            chat_history: history,
        };
        debug!("Asking (pdf_id={:?}, history={} message(s))", pdf_id, history.len());

        let resp = self.http.post(self.endpoint("ask")?).json(&req).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(Box::pin(resp.bytes_stream().map_err(TransportError::from)))
    }

    async fn get_chunk(&self, pdf_id: &str, chunk_id: i64) -> Result<ChunkDetail, TransportError> {
        let mut url = self.endpoint("pdfs")?;
        url
            .path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            })?
            .pop_if_empty()
            .push(pdf_id)
            .push("chunks")
            .push(&chunk_id.to_string());

        let resp = self.http.get(url).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn health(&self) -> Result<HealthStatus, TransportError> {
        let resp = self.http.get(self.endpoint("health")?).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_path_prefix() {
        let transport = HttpTransport::new("http://localhost:9000/api").unwrap();
        assert_eq!(transport.endpoint("ask").unwrap().as_str(), "http://localhost:9000/api/ask");

        let transport = HttpTransport::new("http://localhost:9000").unwrap();
        assert_eq!(transport.endpoint("pdfs").unwrap().as_str(), "http://localhost:9000/pdfs");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(HttpTransport::new("not a url"), Err(TransportError::InvalidUrl { .. })));
        assert!(
            matches!(HttpTransport::new("mailto:me@example.com"), Err(TransportError::InvalidUrl { .. }))
        );
    }

    #[test]
    fn only_pdf_files_are_uploaded() {
        assert_eq!(validate_pdf_path(Path::new("/tmp/Report.PDF")).unwrap(), "Report.PDF");
        assert!(
            matches!(
                validate_pdf_path(Path::new("/tmp/notes.txt")),
                Err(TransportError::InvalidFile { .. })
            )
        );
    }

    #[test]
    fn ask_body_sends_null_pdf_id() {
        let history: Vec<HistoryEntry> = Vec::new();
        let body = serde_json
            ::to_value(AskRequest { question: "q", pdf_id: None, chat_history: &history })
            .unwrap();
        assert_eq!(body, serde_json::json!({"question":"q","pdf_id":null,"chat_history":[]}));
    }
}

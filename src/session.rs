use log::{ error, info, warn };
use std::path::{ Path, PathBuf };
use std::sync::Arc;

use crate::client::Transport;
use crate::error::TransportError;
use crate::models::chat::{ Conversation, Message };
use crate::models::pdf::PdfHandle;
use crate::stream::{ drive, AnswerAssembler, StreamObserver };

#[derive(Debug, Default)]
pub struct UploadReport {
    pub uploaded: Vec<PdfHandle>,
    pub failed: Vec<(PathBuf, TransportError)>,
}

/// Client-side chat state: known documents, the selected one, and the
/// transcript. One question is in flight at a time; `send_message` takes
/// `&mut self` so overlapping asks on one transcript cannot be issued.
pub struct ChatSession {
    transport: Arc<dyn Transport>,
    pdfs: Vec<PdfHandle>,
    active_pdf_id: Option<String>,
    conversation: Conversation,
    is_typing: bool,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            pdfs: Vec::new(),
            active_pdf_id: None,
            conversation: Conversation::new(),
            is_typing: false,
        }
    }

    pub fn pdfs(&self) -> &[PdfHandle] {
        &self.pdfs
    }

    pub fn active_pdf_id(&self) -> Option<&str> {
        self.active_pdf_id.as_deref()
    }

    pub fn active_pdf(&self) -> Option<&PdfHandle> {
        let id = self.active_pdf_id.as_deref()?;
        self.pdfs.iter().find(|p| p.id == id)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub async fn refresh_pdfs(&mut self) -> Result<&[PdfHandle], TransportError> {
        self.pdfs = self.transport.list().await?;
        info!("Loaded {} document(s)", self.pdfs.len());
        Ok(&self.pdfs)
    }

    /// Uploads one file after another. A failure is logged and recorded but
    /// does not stop the remaining uploads.
    pub async fn upload_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> UploadReport {
        let mut report = UploadReport::default();
        for path in paths {
            let path = path.as_ref();
            match self.transport.upload(path).await {
                Ok(handle) => {
                    info!("Uploaded {} as {}", path.display(), handle.id);
                    self.pdfs.push(handle.clone());
                    report.uploaded.push(handle);
                }
                Err(e) => {
                    error!("Failed to upload {}: {}", path.display(), e);
                    report.failed.push((path.to_path_buf(), e));
                }
            }
        }
        report
    }

    /// Selecting the active document again clears the selection.
    pub fn select_pdf(&mut self, pdf_id: &str) -> Option<&str> {
        if self.active_pdf_id.as_deref() == Some(pdf_id) {
            self.active_pdf_id = None;
        } else {
            if !self.pdfs.iter().any(|p| p.id == pdf_id) {
                warn!("Selecting document '{}' which is not in the local list", pdf_id);
            }
            self.active_pdf_id = Some(pdf_id.to_string());
        }
        self.active_pdf_id.as_deref()
    }

    /// Asks a question about the active document (or none) and streams the
    /// answer into the transcript.
    ///
    /// Blank input is ignored. On a transport failure the apology message is
    /// appended to the transcript and the error is returned.
    pub async fn send_message<O: StreamObserver + ?Sized>(
        &mut self,
        text: &str,
        observer: &mut O
    ) -> Result<Option<Message>, TransportError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let history = self.conversation.history();
        self.conversation.push(Message::user(text));
        observer.on_update(&self.conversation);
        self.is_typing = true;

        let result = match
            self.transport.ask(text, self.active_pdf_id.as_deref(), &history).await
        {
            Ok(body) => drive(body, &mut self.conversation, observer).await,
            Err(e) => {
                error!("Ask request failed: {}", e);
                let mut assembler = AnswerAssembler::new();
                assembler.begin();
                assembler.fail(&mut self.conversation, observer);
                Err(e)
            }
        };

        self.is_typing = false;
        result
    }

    pub fn clear(&mut self) {
        self.conversation = Conversation::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ByteStream;
    use crate::models::chat::{ HistoryEntry, Role };
    use crate::models::pdf::{ ChunkDetail, HealthStatus };
    use crate::stream::{ DiagnosticCounter, APOLOGY };
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedTransport {
        answer: Vec<&'static str>,
        fail_ask: bool,
        asked: Mutex<Vec<(String, Option<String>, Vec<HistoryEntry>)>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn upload(&self, path: &Path) -> Result<PdfHandle, TransportError> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.ends_with(".pdf") {
                Ok(PdfHandle { id: format!("pdf_{}", name), name: name.to_string(), chunks: None })
            } else {
                Err(TransportError::InvalidFile {
                    path: name.to_string(),
                    reason: "not a pdf".into(),
                })
            }
        }

        async fn list(&self) -> Result<Vec<PdfHandle>, TransportError> {
            Ok(vec![PdfHandle { id: "pdf_1".into(), name: "a.pdf".into(), chunks: Some(3) }])
        }

        async fn ask(
            &self,
            question: &str,
            pdf_id: Option<&str>,
            history: &[HistoryEntry]
        ) -> Result<ByteStream, TransportError> {
            self.asked
                .lock()
                .unwrap()
                .push((question.to_string(), pdf_id.map(String::from), history.to_vec()));
            if self.fail_ask {
                return Err(TransportError::Status { status: 500, message: "boom".into() });
            }
            let parts: Vec<Result<Bytes, TransportError>> = self.answer
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect();
            Ok(Box::pin(stream::iter(parts)))
        }

        async fn get_chunk(&self, _pdf_id: &str, _chunk_id: i64) -> Result<ChunkDetail, TransportError> {
            unimplemented!()
        }

        async fn health(&self) -> Result<HealthStatus, TransportError> {
            Ok(HealthStatus { status: "healthy".into() })
        }
    }

    #[tokio::test]
    async fn streams_answer_after_the_user_message() {
        let transport = Arc::new(ScriptedTransport {
            answer: vec!["{\"type\":\"chunk\",\"content\":\"Hel", "lo\"}\n"],
            ..Default::default()
        });
        let mut session = ChatSession::new(transport.clone());
        let mut counter = DiagnosticCounter::default();

        let answer = session.send_message("hi", &mut counter).await.unwrap().unwrap();

        assert_eq!(answer.content, "Hello");
        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(!session.is_typing());
        assert_eq!(counter.updates, 2);
    }

    #[tokio::test]
    async fn sends_prior_history_and_active_pdf() {
        let transport = Arc::new(ScriptedTransport {
            answer: vec!["{\"type\":\"chunk\",\"content\":\"A\"}\n"],
            ..Default::default()
        });
        let mut session = ChatSession::new(transport.clone());
        session.refresh_pdfs().await.unwrap();
        session.select_pdf("pdf_1");

        session.send_message("first", &mut DiagnosticCounter::default()).await.unwrap();
        session.send_message("second", &mut DiagnosticCounter::default()).await.unwrap();

        let asked = transport.asked.lock().unwrap();
        assert_eq!(asked[0].0, "first");
        assert_eq!(asked[0].1.as_deref(), Some("pdf_1"));
        assert!(asked[0].2.is_empty());
        assert_eq!(
            asked[1].2,
            vec![
                HistoryEntry { role: Role::User, content: "first".into() },
                HistoryEntry { role: Role::Assistant, content: "A".into() }
            ]
        );
    }

    #[tokio::test]
    async fn failed_ask_appends_apology() {
        let transport = Arc::new(ScriptedTransport { fail_ask: true, ..Default::default() });
        let mut session = ChatSession::new(transport);

        let result = session.send_message("hi", &mut DiagnosticCounter::default()).await;

        assert!(matches!(result, Err(TransportError::Status { status: 500, .. })));
        let last = session.conversation().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, APOLOGY);
        assert_eq!(last.sources, None);
        assert!(!session.is_typing());
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut session = ChatSession::new(transport.clone());

        assert!(session.send_message("   ", &mut DiagnosticCounter::default()).await.unwrap().is_none());
        assert!(session.conversation().is_empty());
        assert!(transport.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_continues_past_failures() {
        let mut session = ChatSession::new(Arc::new(ScriptedTransport::default()));

        let report = session.upload_files(&["a.pdf", "notes.txt", "b.pdf"]).await;

        assert_eq!(report.uploaded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, PathBuf::from("notes.txt"));
        assert_eq!(session.pdfs().len(), 2);
    }

    #[test]
    fn selecting_twice_clears_the_selection() {
        let mut session = ChatSession::new(Arc::new(ScriptedTransport::default()));
        assert_eq!(session.select_pdf("pdf_1"), Some("pdf_1"));
        assert_eq!(session.select_pdf("pdf_2"), Some("pdf_2"));
        assert_eq!(session.select_pdf("pdf_2"), None);
        assert_eq!(session.active_pdf_id(), None);
    }
}

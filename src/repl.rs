use futures::StreamExt;
use log::{ error, info };
use std::io::Write;
use tokio::io::{ stdin, AsyncBufReadExt, BufReader };
use tokio_stream::wrappers::LinesStream;

use crate::error::TransportError;
use crate::models::chat::{ Conversation, Message, Role, SourceRef };
use crate::models::pdf::PdfHandle;
use crate::session::ChatSession;
use crate::stream::observer::{ Diagnostic, LogObserver, StreamObserver };

/// Prints the growing answer to a terminal, writing only what is new since
/// the previous publish.
pub struct TerminalRenderer<W: Write> {
    out: W,
    message_index: Option<usize>,
    printed: usize,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            message_index: None,
            printed: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Closes the current answer, listing its sources if it has any.
    pub fn finish_answer(&mut self, answer: Option<&Message>) {
        if self.message_index.take().is_some() {
            let _ = writeln!(self.out);
        }
        if let Some(sources) = answer.and_then(|m| m.sources.as_deref()) {
            if !sources.is_empty() {
                let _ = writeln!(self.out, "{}", format_sources(sources));
            }
        }
        self.printed = 0;
        let _ = self.out.flush();
    }
}

impl<W: Write> StreamObserver for TerminalRenderer<W> {
    fn on_update(&mut self, conversation: &Conversation) {
        let Some(last) = conversation.last() else {
            return;
        };
        if last.role != Role::Assistant {
            return;
        }

        let index = conversation.len() - 1;
        if self.message_index != Some(index) {
            if self.message_index.is_some() {
                let _ = writeln!(self.out);
            }
            let _ = write!(self.out, "assistant> ");
            self.message_index = Some(index);
            self.printed = 0;
        }

        match last.content.get(self.printed..) {
            Some(delta) => {
                let _ = write!(self.out, "{}", delta);
            }
            None => {
                // content was rewritten rather than extended
                let _ = write!(self.out, "\r\nassistant> {}", last.content);
            }
        }
        self.printed = last.content.len();
        let _ = self.out.flush();
    }

    fn on_diagnostic(&mut self, diagnostic: &Diagnostic) {
        LogObserver.on_diagnostic(diagnostic);
    }
}

pub fn format_sources(sources: &[SourceRef]) -> String {
    let refs: Vec<String> = sources
        .iter()
        .map(|s| format!("{}#{}", s.pdf_id, s.chunk_id))
        .collect();
    format!("sources: {}", refs.join(", "))
}

pub fn format_pdf_list(pdfs: &[PdfHandle], active: Option<&str>) -> String {
    if pdfs.is_empty() {
        return "No documents uploaded yet.".to_string();
    }
    let mut result = String::new();
    for pdf in pdfs {
        let marker = if active == Some(pdf.id.as_str()) { "*" } else { " " };
        match pdf.chunks {
            Some(chunks) => {
                result.push_str(&format!("{} {}  {} ({} chunks)\n", marker, pdf.id, pdf.name, chunks));
            }
            None => {
                result.push_str(&format!("{} {}  {}\n", marker, pdf.id, pdf.name));
            }
        }
    }
    result
}

const HELP: &str =
    "Commands: /pdfs, /select <id>, /upload <path>..., /sources, /chunk <pdf_id> <chunk_id>, /clear, /quit";

/// Interactive chat over stdin/stdout until EOF or `/quit`.
pub async fn run_chat(
    session: &mut ChatSession,
    pdf: Option<String>
) -> Result<(), TransportError> {
    if let Err(e) = session.refresh_pdfs().await {
        error!("Could not load document list: {}", e);
    }
    if let Some(pdf_id) = pdf {
        session.select_pdf(&pdf_id);
    }

    println!("{}", HELP);
    print!("{}", format_pdf_list(session.pdfs(), session.active_pdf_id()));

    let mut renderer = TerminalRenderer::new(std::io::stdout());
    let mut lines = LinesStream::new(BufReader::new(stdin()).lines());

    while let Some(line) = lines.next().await {
        let line = line?;
        let input = line.trim();
        let mut parts = input.split_whitespace();

        match parts.next() {
            None => {
                continue;
            }
            Some("/quit") | Some("/exit") => {
                break;
            }
            Some("/help") => println!("{}", HELP),
            Some("/pdfs") => {
                match session.refresh_pdfs().await {
                    Ok(_) => print!("{}", format_pdf_list(session.pdfs(), session.active_pdf_id())),
                    Err(e) => println!("Failed to list PDFs: {}", e),
                }
            }
            Some("/select") => {
                match parts.next() {
                    Some(id) => {
                        match session.select_pdf(id) {
                            Some(active) => println!("Asking about {}", active),
                            None => println!("No document selected; asking in general"),
                        }
                    }
                    None => println!("Usage: /select <pdf_id>"),
                }
            }
            Some("/upload") => {
                let paths: Vec<&str> = parts.collect();
                if paths.is_empty() {
                    println!("Usage: /upload <path>...");
                    continue;
                }
                let report = session.upload_files(&paths).await;
                for pdf in &report.uploaded {
                    println!("Uploaded {} as {}", pdf.name, pdf.id);
                }
                for (path, e) in &report.failed {
                    println!("Failed to upload {}: {}", path.display(), e);
                }
            }
            Some("/sources") => {
                let sources = session
                    .conversation()
                    .messages()
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::Assistant)
                    .and_then(|m| m.sources.as_deref());
                match sources {
                    Some(sources) if !sources.is_empty() => println!("{}", format_sources(sources)),
                    _ => println!("The last answer has no sources"),
                }
            }
            Some("/chunk") => {
                let pdf_id = parts.next();
                let chunk_id = parts.next().and_then(|c| c.parse::<i64>().ok());
                match (pdf_id, chunk_id) {
                    (Some(pdf_id), Some(chunk_id)) => {
                        match session.transport().get_chunk(pdf_id, chunk_id).await {
                            Ok(chunk) => println!("{}", chunk.text),
                            Err(e) => println!("Failed to get chunk: {}", e),
                        }
                    }
                    _ => println!("Usage: /chunk <pdf_id> <chunk_id>"),
                }
            }
            Some("/clear") => {
                session.clear();
                println!("Conversation cleared");
            }
            Some(cmd) if cmd.starts_with('/') => println!("Unknown command {}. {}", cmd, HELP),
            Some(_) => {
                let result = session.send_message(input, &mut renderer).await;
                match result {
                    Ok(answer) => {
                        if answer.is_none() {
                            info!("The backend returned an empty answer");
                        }
                        renderer.finish_answer(answer.as_ref());
                    }
                    Err(e) => {
                        error!("Question failed: {}", e);
                        renderer.finish_answer(None);
                    }
                }
            }
        }
    }

    Ok(())
}

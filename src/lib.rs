pub mod cli;
pub mod client;
pub mod error;
pub mod models;
pub mod repl;
pub mod session;
pub mod stream;

use cli::{ Args, Command };
use client::new_client;
use log::info;
use session::ChatSession;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Client Configuration ---");
    info!("API URL: {}", args.api_url);
    info!("Connect Timeout: {}s", args.timeout_secs);
    info!("----------------------------");

    let transport = new_client(&args.client_config())?;
    let mut session = ChatSession::new(transport.clone());

    match args.command() {
        Command::List => {
            session.refresh_pdfs().await?;
            print!("{}", repl::format_pdf_list(session.pdfs(), None));
        }
        Command::Upload { files } => {
            let report = session.upload_files(&files).await;
            for pdf in &report.uploaded {
                println!("{}\t{}", pdf.id, pdf.name);
            }
            if !report.failed.is_empty() {
                return Err(format!("{} upload(s) failed", report.failed.len()).into());
            }
        }
        Command::Ask { question, pdf } => {
            if let Some(pdf_id) = pdf {
                session.select_pdf(&pdf_id);
            }
            let mut renderer = repl::TerminalRenderer::new(std::io::stdout());
            let answer = session.send_message(&question, &mut renderer).await;
            renderer.finish_answer(answer.as_ref().ok().and_then(|a| a.as_ref()));
            answer?;
        }
        Command::Chunk { pdf_id, chunk_id } => {
            let chunk = transport.get_chunk(&pdf_id, chunk_id).await?;
            println!("{}", chunk.text);
        }
        Command::Health => {
            let health = transport.health().await?;
            println!("{}", health.status);
            if !health.is_healthy() {
                return Err(format!("backend reports status '{}'", health.status).into());
            }
        }
        Command::Chat { pdf } => {
            repl::run_chat(&mut session, pdf).await?;
        }
    }
    Ok(())
}

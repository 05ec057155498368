use clap::{ Parser, Subcommand };
use std::path::PathBuf;
use std::time::Duration;

use crate::client::{ ClientConfig, DEFAULT_API_URL };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base URL of the PDF question-answering backend.
    #[arg(long, env = "PDF_QA_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Connect timeout in seconds for backend requests. 0 disables it.
    #[arg(long, env = "PDF_QA_TIMEOUT_SECS", default_value = "10")]
    pub timeout_secs: u64,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the documents known to the backend.
    List,
    /// Upload one or more PDF files.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ask a single question and stream the answer.
    Ask {
        question: String,
        /// Restrict the answer to this document.
        #[arg(long)]
        pdf: Option<String>,
    },
    /// Show the text of a cited chunk.
    Chunk {
        pdf_id: String,
        chunk_id: i64,
    },
    /// Check that the backend is up.
    Health,
    /// Interactive chat (the default).
    Chat {
        #[arg(long)]
        pdf: Option<String>,
    },
}

impl Args {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            connect_timeout: if self.timeout_secs == 0 {
                None
            } else {
                Some(Duration::from_secs(self.timeout_secs))
            },
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat { pdf: None })
    }
}

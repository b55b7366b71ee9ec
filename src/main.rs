//! # Doc QA CLI (`dqa`)
//!
//! The `dqa` binary drives the document Q&A service: indexing local
//! files, asking questions, listing documents, resetting the knowledge
//! base, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! dqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dqa ingest <file>` | Extract, chunk, embed, and index a document |
//! | `dqa ask "<question>"` | Answer a question from the indexed documents |
//! | `dqa documents` | List uploaded document names |
//! | `dqa reset` | Clear the vector store and uploaded files |
//! | `dqa serve` | Start the HTTP API server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::RwLock;

use doc_qa::embedding::EmbeddingClient;
use doc_qa::generation::GenerationClient;
use doc_qa::storage::UploadStore;
use doc_qa::store::VectorStore;
use doc_qa::{config, extract, rag, server};

/// Doc QA — a minimal document question-answering service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "dqa",
    about = "Doc QA — upload documents, ask questions, get grounded answers",
    version,
    long_about = "Doc QA ingests text, PDF, and DOCX documents, chunks and embeds them into \
    a local vector store, and answers natural-language questions by retrieving the most \
    similar chunks and forwarding them to a chat-completion model."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Index a local document file.
    ///
    /// Extracts text from the file (txt, pdf, or docx), chunks and embeds
    /// it, appends the chunks to the vector store, and keeps a copy of the
    /// original in the upload directory.
    Ingest {
        /// Path to the document to index.
        file: PathBuf,
    },

    /// Ask a question against the indexed documents.
    ///
    /// Prints the generated answer and the source documents it was
    /// grounded in. Requires the provider API key in the environment.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// List uploaded document names.
    Documents,

    /// Clear the knowledge base.
    ///
    /// Deletes every stored vector record and every uploaded original.
    Reset,

    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// upload/ask/documents/reset/health endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { file } => {
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("invalid file path: {}", file.display()))?
                .to_string();

            let extension = extract::supported_extension(&filename).ok_or_else(|| {
                anyhow::anyhow!(
                    "unsupported file format: {} (supported: {})",
                    filename,
                    extract::SUPPORTED_EXTENSIONS.join(", ")
                )
            })?;

            let bytes = std::fs::read(&file)?;
            let text = extract::extract_text(&bytes, &extension)?;

            let uploads = UploadStore::open(&cfg.uploads.dir)?;
            uploads.save(&filename, &bytes)?;

            let store = RwLock::new(VectorStore::open(&cfg.store.path)?);
            let embedder = EmbeddingClient::new(&cfg.provider)?;

            println!("ingest {}", filename);
            println!("  extracted: {} chars", text.chars().count());
            let chunks = rag::ingest_document(&store, &embedder, &cfg, &text, &filename).await?;
            println!("  chunks indexed: {}", chunks);
            println!("ok");
        }
        Commands::Ask { question } => {
            let store = RwLock::new(VectorStore::open(&cfg.store.path)?);
            let embedder = EmbeddingClient::new(&cfg.provider)?;
            let generator = GenerationClient::new(&cfg.provider)?;

            let answer =
                rag::query_documents(&store, &embedder, &generator, &cfg, &question).await?;

            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!();
                println!("sources: {}", answer.sources.join(", "));
            }
        }
        Commands::Documents => {
            let uploads = UploadStore::open(&cfg.uploads.dir)?;
            let documents = uploads.list()?;
            if documents.is_empty() {
                println!("No documents indexed.");
            } else {
                for name in documents {
                    println!("{}", name);
                }
            }
        }
        Commands::Reset => {
            let store = RwLock::new(VectorStore::open(&cfg.store.path)?);
            let uploads = UploadStore::open(&cfg.uploads.dir)?;
            rag::reset_knowledge_base(&store, &uploads)?;
            println!("Knowledge base cleared.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

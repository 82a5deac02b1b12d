//! # PaperChat CLI (`paperchat`)
//!
//! The `paperchat` binary drives the document-chat service. It provides
//! commands for initializing local storage, ingesting the upload folder,
//! asking one-off questions, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! paperchat --config ./config/paperchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `paperchat init` | Create the upload folder and audit database |
//! | `paperchat ingest` | Chunk, embed, and index every PDF in the upload folder |
//! | `paperchat ask "<question>"` | Answer a question against the indexed documents |
//! | `paperchat documents` | List uploaded PDFs |
//! | `paperchat serve` | Start the HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use paperchat::audit::{AuditStore, SqliteAuditStore};
use paperchat::completion;
use paperchat::config::{self, Config};
use paperchat::embedding;
use paperchat::index;
use paperchat::ingest::IngestionPipeline;
use paperchat::query::QueryService;
use paperchat::server;
use paperchat::uploads;

/// PaperChat — chat with your PDF documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/paperchat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "paperchat",
    about = "PaperChat — retrieval-augmented chat over uploaded PDF documents",
    version,
    long_about = "PaperChat ingests PDF documents into an embedding index and answers \
    questions by retrieving the most relevant chunks and prompting a hosted chat model \
    with them as context. Answers cite the source file and page of every supporting chunk."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/paperchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the upload folder and the audit database.
    ///
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Chunk, embed, and index every PDF in the upload folder.
    ///
    /// Reprocessing a file replaces its previous chunks in the index.
    Ingest,

    /// Answer a question against the indexed documents.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// List the PDFs currently in the upload folder.
    Documents,

    /// Start the HTTP API.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

/// Adapters constructed once from config and shared by every command.
struct Services {
    config: Arc<Config>,
    pipeline: Arc<IngestionPipeline>,
    query: Arc<QueryService>,
}

async fn build_services(config: Config) -> anyhow::Result<Services> {
    let config = Arc::new(config);

    let embeddings: Arc<dyn paperchat::embedding::EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    let index: Arc<dyn paperchat::index::VectorIndex> =
        Arc::from(index::create_index(&config.index)?);
    let completion: Arc<dyn paperchat::completion::CompletionProvider> =
        Arc::from(completion::create_provider(&config.completion)?);
    let audit: Arc<dyn AuditStore> =
        Arc::new(SqliteAuditStore::connect(&config.audit.db_path).await?);

    let pipeline = Arc::new(IngestionPipeline::new(
        config.clone(),
        embeddings.clone(),
        index.clone(),
    ));
    let query = Arc::new(QueryService::new(
        config.clone(),
        embeddings,
        index,
        completion,
        audit,
    ));

    Ok(Services {
        config,
        pipeline,
        query,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            std::fs::create_dir_all(&cfg.uploads.dir)?;
            SqliteAuditStore::connect(&cfg.audit.db_path).await?;
            println!("Initialized upload folder and audit database.");
        }
        Commands::Ingest => {
            let services = build_services(cfg).await?;
            let report = services.pipeline.run().await?;
            println!(
                "Indexed {} chunks from {} documents (dimension {}).",
                report.chunks, report.documents, report.dimension
            );
        }
        Commands::Ask { question } => {
            let services = build_services(cfg).await?;
            let answer = services.query.ask(&question).await?;
            println!("{}", answer.text);
            for source in &answer.sources {
                println!("  Source: {}, Page: {}", source.source, source.page);
            }
        }
        Commands::Documents => {
            let files = uploads::list_documents(&cfg.uploads.dir)?;
            if files.is_empty() {
                println!("No documents uploaded yet.");
            }
            for file in files {
                println!("{}  {}", file.filename, file.size);
            }
        }
        Commands::Serve => {
            let services = build_services(cfg).await?;
            server::run_server(services.config, services.pipeline, services.query).await?;
        }
    }

    Ok(())
}

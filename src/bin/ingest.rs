//! Ingestion entry point: populate the chunk store from text files and/or
//! web pages.

use std::path::PathBuf;
use std::sync::Arc;

use apm_rag::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_DB_PATH};
use apm_rag::ingestion::{IngestOptions, IngestOutcome, SplitMethod, ingest};
use apm_rag::providers::{EmbeddingProvider, MockEmbeddingProvider, openai_embedding};
use apm_rag::types::RagError;
use apm_rag::RagConfig;
use clap::{ArgGroup, Parser};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "apm-ingest",
    about = "Ingest Agile Practice Map sources into the chunk store",
    group(ArgGroup::new("sources").required(true).multiple(true).args(["input_dir", "url_file"]))
)]
struct Args {
    /// Directory of .txt source files (searched recursively).
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// File listing web page URLs, one per line.
    #[arg(long)]
    url_file: Option<PathBuf>,

    /// Destination store file.
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db_path: PathBuf,

    /// Chunking strategy.
    #[arg(long, value_enum, default_value_t = SplitMethod::Recursive)]
    split_method: SplitMethod,

    /// Maximum chunk size in characters (recursive strategy only).
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters shared between consecutive chunks (recursive strategy only).
    #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Use deterministic offline embeddings instead of the OpenAI API.
    #[arg(long)]
    mock_embeddings: bool,
}

#[tokio::main]
async fn main() -> Result<(), RagError> {
    init_tracing();
    let args = Args::parse();

    let embedder: Arc<dyn EmbeddingProvider> = if args.mock_embeddings {
        Arc::new(MockEmbeddingProvider::new())
    } else {
        let config = RagConfig::from_env();
        openai_embedding(&config)?
    };

    let options = IngestOptions {
        input_dir: args.input_dir,
        url_file: args.url_file,
        db_path: args.db_path,
        split_method: args.split_method,
        chunk_size: args.chunk_size,
        chunk_overlap: args.chunk_overlap,
    };

    let report = ingest(embedder.as_ref(), &options).await?;

    println!("raw documents:     {}", report.raw_documents);
    println!("cleaned documents: {}", report.cleaned_documents);
    println!("chunks written:    {}", report.chunks);
    match report.outcome {
        IngestOutcome::Completed => {
            if let Some(size) = report.store_size {
                println!("store size:        {size}");
            }
            println!("done: {}", options.db_path.display());
        }
        IngestOutcome::NoDocuments => println!("nothing ingested: no documents loaded"),
        IngestOutcome::NoCleanDocuments => {
            println!("nothing ingested: every document was rejected during cleaning")
        }
        IngestOutcome::NoChunks => println!("nothing ingested: splitting produced no chunks"),
    }
    Ok(())
}

fn init_tracing() {
    let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

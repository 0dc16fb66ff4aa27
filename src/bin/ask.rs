//! Query entry point: ask a question against an ingested store.

use std::path::PathBuf;

use apm_rag::RagConfig;
use apm_rag::query::RagSession;
use apm_rag::types::RagError;
use clap::Parser;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "apm-ask",
    about = "Ask a question about the Agile Practice Map"
)]
struct Args {
    /// The question to answer. Omit with --list-topics to only list topics.
    question: Option<String>,

    /// Store file produced by apm-ingest.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Print the retrieved chunks, context, and rendered prompt.
    #[arg(long)]
    debug: bool,

    /// List the known topic names and exit.
    #[arg(long)]
    list_topics: bool,
}

#[tokio::main]
async fn main() -> Result<(), RagError> {
    init_tracing();
    let args = Args::parse();

    let mut config = RagConfig::from_env();
    if let Some(db_path) = args.db_path {
        config = config.with_db_path(db_path);
    }
    let session = RagSession::from_env(config)?;

    if args.list_topics {
        for topic in session.list_topics().await {
            println!("{topic}");
        }
        return Ok(());
    }

    let question = args
        .question
        .ok_or_else(|| RagError::Config("no question given (or use --list-topics)".into()))?;

    if args.debug {
        match session.query(&question, true).await {
            Ok(response) => {
                if let Some(trace) = &response.debug {
                    for hit in &trace.retrieved {
                        println!(
                            "[{:.4}] {} ({})",
                            hit.similarity,
                            hit.chunk.id,
                            hit.chunk.source.as_deref().unwrap_or("unknown")
                        );
                    }
                    println!("--- prompt ---\n{}\n--------------", trace.prompt);
                }
                println!("{}", response.answer);
            }
            Err(err) => println!("query failed: {err}"),
        }
    } else {
        println!("{}", session.answer_question(&question).await);
    }
    Ok(())
}

fn init_tracing() {
    let subscriber = FmtSubscriber::builder().with_env_filter("warn").finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

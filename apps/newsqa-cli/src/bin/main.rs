use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;

use newsqa_core::config::{Config, Settings};
use newsqa_core::error::Error;
use newsqa_core::logging;
use newsqa_core::types::{BuildMode, BuildReport, QueryResult, Source};
use newsqa_rag::{index_status, IndexStatus, Pipeline};
use newsqa_vector::{FsIndexStore, IndexStore};

#[derive(Parser)]
#[command(name = "newsqa")]
#[command(about = "Ask questions about news articles and research papers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace holding the index (overrides index.workspace)
    #[arg(long, short = 'w', global = true, value_name = "NAME")]
    workspace: Option<String>,

    /// Extra TOML config file, merged after config.toml
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load sources and build (or extend) the index
    Build {
        /// Web page or online PDF to fetch
        #[arg(long = "url", value_name = "URL")]
        urls: Vec<String>,

        /// Local PDF file
        #[arg(long = "pdf", value_name = "PATH")]
        pdfs: Vec<PathBuf>,

        /// Local text file or directory of text files
        #[arg(long = "text", value_name = "PATH")]
        texts: Vec<PathBuf>,

        /// Add to the existing index instead of replacing it
        #[arg(long)]
        append: bool,
    },
    /// Answer a question from the indexed content
    Ask {
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Number of chunks to retrieve (overrides retrieval.top_k)
        #[arg(long, short = 'k', value_name = "COUNT")]
        top_k: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what the workspace index contains
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Delete the workspace index
    Reset,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<Error>() {
                Some(Error::NoIndex) => {
                    eprintln!("Please build the index first (newsqa build --url ...).")
                }
                Some(err) => eprintln!("Error [{}]: {}", err.kind(), err),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings: Settings = Config::load_with(cli.config.as_deref())?.settings()?;
    if let Some(ws) = cli.workspace {
        settings.index.workspace = ws;
    }
    debug!(
        workspace = %settings.index.workspace,
        data_dir = %settings.index.data_dir,
        "settings loaded"
    );

    match cli.command {
        Commands::Build { urls, pdfs, texts, append } => {
            let sources: Vec<Source> = urls
                .into_iter()
                .map(Source::Url)
                .chain(pdfs.into_iter().map(Source::Pdf))
                .chain(texts.into_iter().map(Source::Text))
                .collect();
            if sources.is_empty() {
                anyhow::bail!("nothing to build: pass at least one --url, --pdf or --text");
            }
            settings.index.show_progress = true;
            let pipeline = Pipeline::from_settings(&settings)?;
            print_report(&pipeline.build_index(&sources, append)?);
        }
        Commands::Ask { question, top_k, json } => {
            if let Some(k) = top_k {
                settings.retrieval.top_k = k;
            }
            let pipeline = Pipeline::from_settings(&settings)?;
            let result = pipeline.ask(&question)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_answer(&result);
            }
        }
        Commands::Status { json } => {
            let store = FsIndexStore::open(&settings.index.data_dir(), &settings.index.workspace)?;
            match index_status(&store)? {
                Some(status) if json => println!("{}", serde_json::to_string_pretty(&status)?),
                Some(status) => print_status(&status),
                None => println!(
                    "No index in workspace '{}' ({}).",
                    settings.index.workspace,
                    store.location()
                ),
            }
        }
        Commands::Reset => {
            let store = FsIndexStore::open(&settings.index.data_dir(), &settings.index.workspace)?;
            if store.remove()? {
                println!("Removed {}", store.location());
            } else {
                println!("Nothing to remove in workspace '{}'.", settings.index.workspace);
            }
        }
    }
    Ok(())
}

fn print_report(report: &BuildReport) {
    for failure in &report.failed_sources {
        eprintln!("Skipped {}: {}", failure.source, failure.reason);
    }
    let o = &report.outcome;
    let verb = match o.mode {
        BuildMode::Created => "Created",
        BuildMode::Appended => "Appended to",
    };
    println!(
        "✅ {} index: {} chunks from {} documents ({} entries, dim {})",
        verb, o.chunks_added, o.documents, o.total_entries, o.dim
    );
}

fn print_answer(result: &QueryResult) {
    println!("Answer:\n{}\n", result.answer.trim());
    if result.sources.is_empty() {
        return;
    }
    println!("Sources:");
    for (i, s) in result.sources.iter().enumerate() {
        println!("Source {}: {}", i + 1, s.source);
        println!("{}...\n", s.excerpt);
    }
}

fn print_status(status: &IndexStatus) {
    println!("Index:     {}", status.location);
    println!("Entries:   {}", status.entries);
    println!("Dimension: {} ({})", status.dim, status.metric);
    println!("Embedder:  {}", status.embedder_id);
    println!("Created:   {}", status.created_at.to_rfc3339());
    println!("Updated:   {}", status.updated_at.to_rfc3339());
    println!("Sources ({}):", status.sources.len());
    for source in &status.sources {
        println!("  - {}", source);
    }
}

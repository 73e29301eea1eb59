//! Folio command-line tool
//!
//! Manages a JSON-backed document collection and runs phrase searches
//! against it.
//!
//! Run: cargo run --bin folio -- --store lectures.json search "вводная лекция" --tag course=3

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio::config::FolioConfig;
use folio::database::ReportDatabase;
use folio::ingest::prepare_document;
use folio::{Document, DocumentStore, MatchMode, MemoryDocumentStore, ReportStore, SearchEngine, TagFilters, TagPredicate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "folio", about = "Spatial phrase search over scanned documents", version)]
struct Cli {
    /// JSON file holding the document collection
    #[arg(short, long, default_value = "folio-store.json")]
    store: PathBuf,

    /// Configuration file (defaults are used when it does not exist)
    #[arg(short, long, default_value = "folio.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prepare and insert documents from a JSON array file
    Import { file: PathBuf },
    /// Write the whole collection to a JSON file
    Export { file: PathBuf },
    /// One line per document
    List,
    /// Print a document as JSON
    Show { id: String },
    /// Remove a document
    Delete { id: String },
    /// Unique values of a field path, e.g. tags.course
    Distinct { field: String },
    /// Find pages containing a phrase
    Search {
        phrase: String,
        /// Tag constraint, repeatable
        #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
        /// Require whole-word token matches
        #[arg(long)]
        exact: bool,
    },
    /// Delete cached reports older than the given number of days
    Expire {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

fn load_store(path: &Path) -> Result<MemoryDocumentStore> {
    let store = MemoryDocumentStore::new();
    if path.exists() {
        store
            .import_json(path)
            .with_context(|| format!("reading collection {}", path.display()))?;
    }
    Ok(store)
}

fn save_store(store: &MemoryDocumentStore, path: &Path) -> Result<()> {
    store
        .export_json(path)
        .with_context(|| format!("writing collection {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = FolioConfig::load(&cli.config)?;

    match cli.command {
        Command::Import { file } => {
            let data = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let documents: Vec<Document> = serde_json::from_str(&data).context("parsing documents")?;
            let store = load_store(&cli.store)?;
            let mut inserted = 0;
            for doc in documents {
                let id = store.insert(prepare_document(doc))?;
                println!("inserted {}", id);
                inserted += 1;
            }
            save_store(&store, &cli.store)?;
            println!("{} documents imported, {} in collection", inserted, store.len());
        }
        Command::Export { file } => {
            let count = load_store(&cli.store)?.export_json(&file)?;
            println!("{} documents exported to {}", count, file.display());
        }
        Command::List => {
            let store = load_store(&cli.store)?;
            for line in store.list_compact() {
                println!("{}", line);
            }
        }
        Command::Show { id } => {
            let store = load_store(&cli.store)?;
            match store.get(&id)? {
                Some(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
                None => bail!("no document with id {}", id),
            }
        }
        Command::Delete { id } => {
            let store = load_store(&cli.store)?;
            if !store.delete(&id)? {
                bail!("no document with id {}", id);
            }
            save_store(&store, &cli.store)?;
            println!("deleted {}", id);
        }
        Command::Distinct { field } => {
            for value in load_store(&cli.store)?.distinct(&field)? {
                println!("{}", value);
            }
        }
        Command::Search { phrase, tags, exact } => {
            let mode = if exact { MatchMode::Exact } else { config.match_mode };
            let engine = SearchEngine::with_match_mode(load_store(&cli.store)?, mode);
            let filters = tags
                .into_iter()
                .fold(TagFilters::new(), |f, (k, v)| f.with(k, TagPredicate::Equals(v)));

            let hits = engine.search(&phrase, &filters)?;
            if hits.is_empty() {
                println!("no results");
            }
            for hit in &hits {
                println!("{} page {} ({} words) {}", hit.doc_id, hit.page, hit.coords.len(), hit.path);
            }
        }
        Command::Expire { days } => {
            let db = Arc::new(ReportDatabase::open(&config.report_db_path)?);
            let reports = ReportStore::new(db, &config.artifact_dir)?;
            let removed = reports.expire_reports(chrono::Duration::days(days))?;
            println!("{} reports removed", removed);
        }
    }

    Ok(())
}

use std::fs;
use std::path::PathBuf;
use std::thread::available_parallelism;

use clap::{Parser, Subcommand};
use shardsearch_persistence::{discover_indices, read_snapshot, IndexPaths};
use shardsearch_query::{Query, SearchContext};
use shardsearch_scheduler::{Coordinator, Error, Operation, OperationResult};
use tracing_subscriber::EnvFilter;

/// Drives a shardsearch coordinator against a directory of index snapshots.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding one sub-directory of snapshot files per index.
    #[arg(long, default_value = "./shardsearch-data")]
    data_dir: PathBuf,

    /// Number of worker threads in the coordinator's pool.
    #[arg(long, default_value_t = default_worker_count())]
    workers: usize,

    #[command(subcommand)]
    command: Command,
}

fn default_worker_count() -> usize {
    available_parallelism().map(|n| n.get()).unwrap_or(4)
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Adds every document in a newline-delimited JSON file to an index.
    Ingest {
        index: String,
        /// Path to a file with one JSON document per line.
        file: PathBuf,
    },
    /// Runs a query against an index and prints the result as JSON.
    Search {
        index: String,
        /// Either a bare string (matched against all text-like fields) or
        /// a JSON query tree, e.g. `{"term":{"field":"sku","value":"A1"}}`.
        query: String,
        #[arg(long)]
        size: Option<usize>,
    },
    /// Prints an index's auto-discovered (or configured) facets.
    Facets { index: String },
    /// Prints an index's document count, average length, and shard count.
    Stats { index: String },
    /// Lists every index currently loaded in the coordinator.
    ListIndices,
    /// Writes an index's current state to disk immediately.
    Flush { index: String },
    /// Removes an index from memory. Does not delete its on-disk snapshot.
    DeleteIndex { index: String },
}

fn parse_query(raw: &str) -> Query {
    if raw.trim_start().starts_with('{') {
        serde_json::from_str(raw).unwrap_or_else(|err| {
            tracing::warn!(%err, "query did not parse as JSON, falling back to free text");
            Query::from_text(raw)
        })
    } else {
        Query::from_text(raw)
    }
}

/// Rehydrates every index discoverable under `data_dir` into a fresh
/// coordinator, since the CLI is one-shot per invocation rather than a
/// long-lived server holding state between commands.
fn restore_indices(coordinator: &Coordinator, data_dir: &PathBuf) {
    let Ok(names) = discover_indices(data_dir) else { return };
    for name in names {
        let paths = IndexPaths::new(data_dir, &name);
        match read_snapshot(&paths) {
            Ok(snapshot) => {
                let facet_fields = snapshot.facet_fields.clone();
                if let Err(err) = coordinator.execute(Operation::InitFromSnap {
                    index_name: name.clone(),
                    snapshot,
                    facet_fields,
                }) {
                    tracing::warn!(index = %name, %err, "failed to restore index, skipping");
                }
            }
            Err(err) => tracing::warn!(index = %name, %err, "failed to read snapshot, skipping"),
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    fs::create_dir_all(&args.data_dir).map_err(|err| {
        shardsearch_persistence::Error::Io { path: args.data_dir.clone(), source: err }
    })?;
    let coordinator = Coordinator::new(args.workers, Some(args.data_dir.clone()));
    restore_indices(&coordinator, &args.data_dir);

    let result = match args.command {
        Command::Ingest { index, file } => {
            let contents = fs::read_to_string(&file).map_err(|err| {
                shardsearch_persistence::Error::Io { path: file.clone(), source: err }
            })?;
            let documents = contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| serde_json::from_str::<shardsearch_types::Document>(line).map_err(shardsearch_persistence::Error::from))
                .collect::<Result<Vec<shardsearch_types::Document>, shardsearch_persistence::Error>>()?;
            coordinator.execute(Operation::AddDocuments { index_name: index, documents })?
        }
        Command::Search { index, query, size } => {
            let context = SearchContext { from: None, size, aggregations: Default::default() };
            coordinator.execute(Operation::Search { index_name: index, query: parse_query(&query), context })?
        }
        Command::Facets { index } => coordinator.execute(Operation::GetFacets { index_name: index })?,
        Command::Stats { index } => coordinator.execute(Operation::GetStats { index_name: index })?,
        Command::ListIndices => coordinator.execute(Operation::ListIndices)?,
        Command::Flush { index } => coordinator.execute(Operation::Flush { index_name: index })?,
        Command::DeleteIndex { index } => coordinator.execute(Operation::DeleteIndex { index_name: index })?,
    };

    print_result(&result);
    coordinator.shutdown();
    Ok(())
}

fn print_result(result: &OperationResult) {
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(%err, "failed to serialize result"),
    }
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        tracing::error!(%err, "command failed");
        std::process::exit(1);
    }
}

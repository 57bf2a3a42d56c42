//! Provlens CLI: load a Turtle document and print its derived views
//!
//! `watch` keeps the document open in an editor session and re-prints the
//! views every time an edit to the file commits. File changes come from a
//! debounced `notify` watcher on the file's directory, so editors that save
//! by writing a temporary file and renaming it are picked up too.

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use notify_debouncer_full::{
    new_debouncer,
    notify::{EventKind, RecursiveMode, Watcher},
    DebounceEventResult, DebouncedEvent,
};
use provlens::{Config, EditorSession, Event, GraphView, PrefixMap, TripleStore};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often pending editor submissions are checked while watching
const POLL_TICK: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "provlens", version, about = "Inspect provenance graphs in Turtle documents")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the node/link graph
    Graph {
        /// Turtle document
        file: PathBuf,
    },
    /// Print timeline events, oldest first
    Events {
        /// Turtle document
        file: PathBuf,
    },
    /// Print the captured prefix bindings
    Prefixes {
        /// Turtle document
        file: PathBuf,
    },
    /// Re-serialize the document
    Turtle {
        /// Turtle document
        file: PathBuf,
    },
    /// Re-print the views whenever the file changes
    Watch {
        /// Turtle document
        file: PathBuf,

        /// Quiet period the file watcher waits for before reporting a change
        #[arg(long, default_value_t = 200)]
        interval_ms: u64,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Graph { file } => {
            let store = open_store(&file, &config)?;
            print_graph(&store.get_nodes_and_links(), &store.prefix_map(), cli.format)
        }
        Commands::Events { file } => {
            let store = open_store(&file, &config)?;
            print_events(&store.get_events(), cli.format)
        }
        Commands::Prefixes { file } => {
            let store = open_store(&file, &config)?;
            print_prefixes(&store.prefix_map(), cli.format)
        }
        Commands::Turtle { file } => {
            let store = open_store(&file, &config)?;
            print!("{}", store.to_turtle()?);
            Ok(())
        }
        Commands::Watch { file, interval_ms } => {
            run_watch(&file, &config, Duration::from_millis(interval_ms), cli.format)
        }
    }
}

fn open_store(path: &Path, config: &Config) -> anyhow::Result<TripleStore> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    TripleStore::from_turtle(&text, config.store.clone())
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn run_watch(
    path: &Path,
    config: &Config,
    interval: Duration,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = Arc::new(open_store(path, config)?);
    print_views(&store, format)?;

    {
        let weak = Arc::downgrade(&store);
        store.on_update(move |update| {
            info!(revision = update.revision(), "Document changed");
            if let Some(store) = weak.upgrade() {
                print_views(&store, format)?;
            }
            Ok(())
        });
    }

    let editor = EditorSession::attach(store.clone(), &config.editor);

    let (tx, rx) = mpsc::channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(interval, None, tx)?;
    let dir = watched_dir(path);
    debouncer
        .watcher()
        .watch(dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", dir.display()))?;
    info!(file = %path.display(), "Watching for changes");

    loop {
        match rx.recv_timeout(POLL_TICK) {
            Ok(Ok(events)) => {
                if events.iter().any(|event| touches(event, path)) {
                    reload(&editor, path);
                }
            }
            Ok(Err(errors)) => warn!(?errors, "File watcher reported errors"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => anyhow::bail!("file watcher stopped"),
        }

        if let Some(Err(e)) = editor.poll(Instant::now()) {
            eprintln!("Error: {}", e);
        }
    }
}

/// Directory holding `path`; watching it survives the file being replaced
fn watched_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn touches(event: &DebouncedEvent, path: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|p| p.file_name() == path.file_name())
}

/// Hand the file's current text to the editor. A file that is missing
/// mid-save is skipped; the rename that follows reports it again.
fn reload(editor: &EditorSession, path: &Path) {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            editor.handle_change(&text, Instant::now());
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(file = %path.display(), "Watched file is gone, waiting for it to reappear");
        }
        Err(e) => warn!(error = %e, "Could not read watched file"),
    }
}

fn print_views(store: &TripleStore, format: OutputFormat) -> anyhow::Result<()> {
    print_graph(&store.get_nodes_and_links(), &store.prefix_map(), format)?;
    print_events(&store.get_events(), format)
}

fn print_graph(view: &GraphView, prefixes: &PrefixMap, format: OutputFormat) -> anyhow::Result<()> {
    let short = |iri: &str| prefixes.compact(iri).unwrap_or_else(|| iri.to_string());

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(view)?);
        }
        OutputFormat::Table => {
            let mut nodes = new_table(&["Id", "Type", "Prefix", "Title"]);
            for node in &view.nodes {
                nodes.add_row(vec![
                    short(&node.id),
                    node.kind.to_string(),
                    node.prefix.clone().unwrap_or_default(),
                    node.title.clone(),
                ]);
            }
            println!("{}", nodes);

            let mut links = new_table(&["Source", "Predicate", "Target"]);
            for link in &view.links {
                links.add_row(vec![short(&link.source), short(&link.predicate), short(&link.target)]);
            }
            println!("{}", links);
            println!("{} node(s), {} link(s)", view.nodes.len(), view.links.len());
        }
    }
    Ok(())
}

fn print_events(events: &[Event], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(events)?);
        }
        OutputFormat::Table => {
            if events.is_empty() {
                println!("(no events)");
                return Ok(());
            }

            let mut table = new_table(&["Time", "Event", "Subject"]);
            for event in events {
                table.add_row(vec![
                    event.time.to_rfc3339(),
                    event.label.clone(),
                    event.subject.clone(),
                ]);
            }
            println!("{}", table);
            if let Some((first, last)) = provlens::view::time_extent(events) {
                println!("{} event(s) from {} to {}", events.len(), first, last);
            }
        }
    }
    Ok(())
}

fn print_prefixes(prefixes: &PrefixMap, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(prefixes)?);
        }
        OutputFormat::Table => {
            let mut table = new_table(&["Prefix", "Namespace"]);
            for (prefix, iri) in prefixes.iter() {
                table.add_row(vec![prefix, iri]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.to_vec());
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watched_dir() {
        assert_eq!(watched_dir(Path::new("data/demo.ttl")), Path::new("data"));
        assert_eq!(watched_dir(Path::new("demo.ttl")), Path::new("."));
    }
}

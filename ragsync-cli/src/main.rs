//! RagSync CLI - keep a derived index in sync with a source corpus

use clap::{Parser, Subcommand};
use ragsync_core::{
    loader_for_profile, BuildMode, Builder, LineSplitter, Manifest, Profile, SqliteStore,
    SymbolSidecar,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragsync")]
#[command(about = "Incremental corpus-to-index synchronization", long_about = None)]
struct Cli {
    /// Profile file (default: ragsync.toml in the current directory)
    #[arg(long, global = true, env = "RAGSYNC_PROFILE")]
    profile: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter ragsync.toml
    Init,

    /// Synchronize the index with the current corpus
    Build,

    /// Show what the last build produced
    Status,

    /// Locate a symbol definition in the indexed corpus
    Where {
        /// Definition name to resolve
        symbol: String,
    },

    /// Delete all persisted artifacts (tracker, sidecar, manifest, store)
    Clean,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => cmd_init(cli.profile),
        Commands::Build => cmd_build(cli.profile, cli.json),
        Commands::Status => cmd_status(cli.profile, cli.json),
        Commands::Where { symbol } => cmd_where(cli.profile, &symbol, cli.json),
        Commands::Clean => cmd_clean(cli.profile, cli.json),
    };

    if let Err(e) = result {
        if cli.json {
            let error_json = serde_json::json!({ "error": e.to_string() });
            eprintln!("{error_json}");
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

const PROFILE_FILE: &str = "ragsync.toml";

fn profile_path(override_path: Option<PathBuf>) -> PathBuf {
    override_path.unwrap_or_else(|| PathBuf::from(PROFILE_FILE))
}

fn load_profile(override_path: Option<PathBuf>) -> ragsync_core::Result<Profile> {
    Profile::load(&profile_path(override_path))
}

fn cmd_init(profile: Option<PathBuf>) -> ragsync_core::Result<()> {
    use colored::Colorize;

    let path = profile_path(profile);
    if path.exists() {
        return Err(ragsync_core::SyncError::ConfigExists(path));
    }
    std::fs::write(&path, ragsync_core::config::DEFAULT_PROFILE)?;
    println!("{} {}", "Created".green(), path.display());
    Ok(())
}

fn cmd_build(profile: Option<PathBuf>, json: bool) -> ragsync_core::Result<()> {
    use colored::Colorize;

    let profile = load_profile(profile)?;
    let loader = loader_for_profile(&profile)?;
    let splitter = LineSplitter::new(profile.chunk_lines, profile.chunk_overlap);
    let mut store = SqliteStore::new(&profile.persist_dir());

    let report = Builder::new(&profile, loader.as_ref(), &splitter, &mut store).run()?;

    if json {
        let value = serde_json::json!({
            "mode": report.mode.as_str(),
            "bootstrapped": report.bootstrapped,
            "added": report.diff.added.len(),
            "removed": report.diff.removed.len(),
            "modified": report.diff.modified.len(),
            "unchanged": report.diff.unchanged.len(),
            "documents": report.manifest.counts.documents,
            "nodes": report.manifest.counts.nodes,
            "symbols": report.manifest.counts.symbols,
            "failures": report.failures.iter().map(|f| {
                serde_json::json!({
                    "path": f.path,
                    "stage": format!("{:?}", f.stage).to_lowercase(),
                    "message": f.message,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        return Ok(());
    }

    let mode = match report.mode {
        BuildMode::Noop => "no-op".yellow(),
        BuildMode::FullRebuild => "full rebuild".green(),
        BuildMode::Incremental => "incremental".green(),
    };
    println!("{}: {}", "Mode".blue(), mode);
    if report.bootstrapped {
        println!("{}: tracker recovered from the index store", "Bootstrap".yellow());
    }
    println!(
        "{}: +{} -{} ~{} ={}",
        "Changes".blue(),
        report.diff.added.len(),
        report.diff.removed.len(),
        report.diff.modified.len(),
        report.diff.unchanged.len()
    );
    println!(
        "{}: {} documents, {} nodes, {} symbols",
        "Index".blue(),
        report.manifest.counts.documents,
        report.manifest.counts.nodes,
        report.manifest.counts.symbols
    );
    for failure in &report.failures {
        eprintln!(
            "{}: {} ({:?}): {}",
            "Failed".yellow(),
            failure.path,
            failure.stage,
            failure.message
        );
    }
    Ok(())
}

fn cmd_status(profile: Option<PathBuf>, json: bool) -> ragsync_core::Result<()> {
    use colored::Colorize;

    let profile = load_profile(profile)?;
    let manifest = Manifest::load(&profile.persist_dir())?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&manifest).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{}: {} @ {}", "Source".blue(), manifest.source, manifest.gitref);
    println!(
        "{}: {} documents, {} nodes, {} symbols",
        "Index".blue(),
        manifest.counts.documents,
        manifest.counts.nodes,
        manifest.counts.symbols
    );
    println!("{}: {}", "Persist".blue(), manifest.persist_dir);
    println!("{}: {}", "Built".blue(), manifest.created);
    Ok(())
}

fn cmd_where(profile: Option<PathBuf>, symbol: &str, json: bool) -> ragsync_core::Result<()> {
    use colored::Colorize;

    let profile = load_profile(profile)?;
    let rows = SymbolSidecar::new(&profile.persist_dir()).load();
    let matches: Vec<_> = rows.iter().filter(|r| r.symbol == symbol).collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&matches).unwrap_or_default()
        );
        return Ok(());
    }

    if matches.is_empty() {
        println!("{}: no definition of '{}' in the index", "Not found".yellow(), symbol);
        return Ok(());
    }
    for row in matches {
        println!(
            "{}: {}:{}-{} ({}, {})",
            row.symbol.cyan(),
            row.path,
            row.start_line,
            row.end_line,
            row.kind,
            row.language
        );
    }
    Ok(())
}

fn cmd_clean(profile: Option<PathBuf>, json: bool) -> ragsync_core::Result<()> {
    use colored::Colorize;

    let profile = load_profile(profile)?;
    let persist_dir = profile.persist_dir();
    let existed = persist_dir.exists();
    if existed {
        std::fs::remove_dir_all(&persist_dir)?;
    }

    if json {
        println!("{}", serde_json::json!({ "removed": existed }));
    } else if existed {
        println!("{} {}", "Removed".green(), persist_dir.display());
    } else {
        println!("{} nothing to remove", "Clean".yellow());
    }
    Ok(())
}

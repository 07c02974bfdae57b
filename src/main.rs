mod cli;
mod error;
mod logging;

use crate::cli::{By, Cli, Command, LibraryCommand, LookupArgs};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use std::collections::HashSet;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tankobon_asyncutils::RateLimiter;
use tankobon_catalog::{Database, Repository};
use tankobon_config::Config;
use tankobon_library::{ScanSnapshot, ScanTracker, Scanner, SeriesState};
use tankobon_metadata::{MetadataSource, Offline, Resolver, Selector};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}: {:?}", ErrorKind::Config, err);
            return ErrorKind::Config.exit_code();
        },
    };
    logging::init(&config.log);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            eprintln!("error: {}", *err);
            err.exit_code()
        },
    }
}

async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Lookup(args) => lookup(config, args).await,
        Command::Library(action) => {
            let db = open(config).await?;
            let outcome = library(&Repository::from(&db), action).await;
            db.close().await;
            outcome
        },
        Command::Scan(args) => {
            let db = open(config).await?;
            let outcome = match scanner(config, Repository::from(&db)) {
                Ok(scanner) => scan(&scanner, args.id).await,
                Err(err) => Err(err),
            };
            db.close().await;
            outcome
        },
    }
}

async fn open(config: &Config) -> Result<Database> {
    Database::connect(&config.database).await.or_raise(|| ErrorKind::Catalog)
}

async fn library(repo: &Repository, action: LibraryCommand) -> Result<()> {
    match action {
        LibraryCommand::Add { name, path } => add(repo, &name, &path).await,
        LibraryCommand::List => list(repo).await,
        LibraryCommand::Remove { id } => remove(repo, id).await,
    }
}

fn library_error(err: tankobon_library::error::Error) -> error::Error {
    let message = (*err).to_string();
    err.raise(ErrorKind::Library(message))
}

fn resolver(config: &Config) -> Result<Resolver> {
    let metadata = &config.metadata;
    let limiter = RateLimiter::new(metadata.rate_limit.policy());
    Resolver::new(&metadata.base_url, metadata.timeout(), limiter).or_raise(|| ErrorKind::Metadata)
}

fn scanner(config: &Config, repo: Repository) -> Result<Scanner> {
    let source: Arc<dyn MetadataSource> = if config.metadata.enabled {
        Arc::new(resolver(config)?)
    } else {
        Arc::new(Offline)
    };
    let tracker = Arc::new(ScanTracker::new());
    Ok(Scanner::new(repo, tracker, source, config.inspector()).with_cooldown(config.metadata.cooldown()))
}

async fn add(repo: &Repository, name: &str, path: &Path) -> Result<()> {
    let library = tankobon_library::add_library(repo, name, path).await.map_err(library_error)?;
    println!("Added library {} ({}) at {}", library.id, library.name, library.root_path.display());
    Ok(())
}

async fn list(repo: &Repository) -> Result<()> {
    let libraries = repo.list_libraries().await.or_raise(|| ErrorKind::Catalog)?;
    if libraries.is_empty() {
        println!("No libraries yet. Add one with `tankobon library add <name> <path>`.");
    }
    for library in libraries {
        println!("{}\t{}\t{}", library.id, library.name, library.root_path.display());
    }
    Ok(())
}

async fn remove(repo: &Repository, id: i64) -> Result<()> {
    // Nothing else in this process can be scanning.
    let tracker = ScanTracker::new();
    let library = tankobon_library::remove_library(repo, &tracker, id).await.map_err(library_error)?;
    println!("Removed library {} ({})", library.id, library.name);
    Ok(())
}

async fn scan(scanner: &Scanner, id: i64) -> Result<()> {
    let started = scanner.start_scan(id).await.map_err(library_error)?;
    println!("Scanning {} series", started.remaining.len());

    let mut handle = started.handle;
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut reported = HashSet::new();
    loop {
        tokio::select! {
            joined = &mut handle => {
                joined.or_raise(|| ErrorKind::Library("scan task failed".to_string()))?;
                break;
            },
            _ = ticker.tick() => {
                if let Some(snapshot) = scanner.status(id).await {
                    report(&snapshot, &mut reported);
                }
            },
            _ = &mut interrupt => exn::bail!(ErrorKind::Interrupted),
        }
    }

    let Some(snapshot) = scanner.status(id).await else {
        return Ok(());
    };
    report(&snapshot, &mut reported);
    let failed = snapshot.series.iter().filter(|s| s.state == SeriesState::Error).count();
    println!(
        "Scanned {} of {} series in {}s",
        snapshot.completed_series,
        snapshot.total_series,
        (time::UtcDateTime::now() - snapshot.start_time).whole_seconds(),
    );
    if failed > 0 {
        exn::bail!(ErrorKind::Library(format!("{failed} series failed to scan")));
    }
    Ok(())
}

/// Print series that reached a final state since the last call.
fn report(snapshot: &ScanSnapshot, reported: &mut HashSet<String>) {
    for series in &snapshot.series {
        if series.state == SeriesState::Scanning || reported.contains(&series.name) {
            continue;
        }
        match (&series.state, &series.error, series.progress) {
            (SeriesState::Error, Some(error), _) => println!("  failed  {}: {error}", series.name),
            (_, _, Some(progress)) => println!("  done    {} ({} files)", series.name, progress.total),
            _ => println!("  done    {}", series.name),
        }
        reported.insert(series.name.clone());
    }
}

async fn lookup(config: &Config, args: LookupArgs) -> Result<()> {
    let resolver = resolver(config)?;
    let selector = match args.by {
        By::Id => Selector::Id,
        By::Title => Selector::Title,
    };
    let found = resolver.resolve(selector, &args.query).await.or_raise(|| ErrorKind::Metadata)?;
    let Some(metadata) = found else {
        exn::bail!(ErrorKind::NoMatch(args.query));
    };
    let json = serde_json::to_string_pretty(&metadata).or_raise(|| ErrorKind::Output)?;
    println!("{json}");
    Ok(())
}

//! Command-line arguments. Declarative only; nothing in here does I/O.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Catalog comic and manga archives into a searchable library.
#[derive(Parser, Debug)]
#[command(name = "tankobon", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON), layered over the defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage libraries.
    #[command(subcommand)]
    Library(LibraryCommand),
    /// Scan a library and report progress until it finishes.
    Scan(ScanArgs),
    /// Look up series metadata and print it as JSON.
    Lookup(LookupArgs),
}

#[derive(Subcommand, Debug)]
pub enum LibraryCommand {
    /// Register a folder of series folders as a library.
    Add {
        name: String,
        path: PathBuf,
    },
    /// List every library.
    List,
    /// Forget a library. Archives on disk are left alone.
    Remove {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Library ID, as shown by `library list`.
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// A title, or a provider ID with `--by id`.
    pub query: String,

    #[arg(long, value_enum, default_value_t = By::Title)]
    pub by: By,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum By {
    Id,
    Title,
}

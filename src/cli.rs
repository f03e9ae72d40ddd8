use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kota",
    version,
    about = "Import dependency indexer for JavaScript and TypeScript projects",
    after_help = r#"Examples:
  kota index --root .
  kota deps --file src/api/routes.ts --depth 2
  kota deps --file src/db/index.ts --format text
  kota unresolved --limit 50
  RUST_LOG=kota=debug kota index
"#
)]
pub struct Args {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs)]
pub struct GlobalArgs {
    /// Project root to index.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,
    /// Database path (defaults to <root>/.kota/kota.sqlite).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Log level when RUST_LOG is unset.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}

#[derive(Subcommand)]
pub enum Command {
    /// Re-index the whole project and replace the stored graph.
    Index {
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
    /// Show dependents, dependencies and related tests of a file.
    Deps {
        #[arg(long)]
        file: String,
        /// Traversal depth, clamped to 1..=5.
        #[arg(long, default_value_t = 1)]
        depth: usize,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// List edges without a target file.
    Unresolved {
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Print graph counts and last run metadata.
    Overview,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

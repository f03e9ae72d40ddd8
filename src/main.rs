use anyhow::Result;
use clap::Parser;
use kota::cli::{self, Command, LogLevel, OutputFormat};
use kota::{db, graph, indexer};
use std::io;
use std::path::{Path, PathBuf};

fn default_db_path(root: &Path) -> PathBuf {
    root.join(".kota").join("kota.sqlite")
}

fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_tracing(args.global.log_level);

    let root = args.global.root;
    let db_path = args.global.db.unwrap_or_else(|| default_db_path(&root));

    match args.command {
        Command::Index { no_ignore } => {
            let mut indexer = indexer::Indexer::new_with_options(
                root,
                db_path,
                indexer::scan::ScanOptions::new(no_ignore),
            )?;
            let stats = indexer.reindex()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::Deps {
            file,
            depth,
            format,
        } => {
            let root = std::fs::canonicalize(&root)?;
            let db = db::Db::new(&db_path)?;
            let file = graph::normalize_query_path(&root, &file)?;
            let result = graph::file_deps(&db, &file, depth)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => {
                    println!("{} (depth {})", result.file, result.depth);
                    for (label, paths) in [
                        ("dependents", &result.dependents),
                        ("dependencies", &result.dependencies),
                        ("tests", &result.test_files),
                    ] {
                        println!("{label}: {}", paths.len());
                        for path in paths {
                            println!("  {path}");
                        }
                    }
                }
            }
            Ok(())
        }
        Command::Unresolved { limit } => {
            let db = db::Db::new(&db_path)?;
            let edges = db.unresolved_edges(limit)?;
            println!("{}", serde_json::to_string_pretty(&edges)?);
            Ok(())
        }
        Command::Overview => {
            let root = std::fs::canonicalize(&root)?;
            let db = db::Db::new(&db_path)?;
            let overview = db.overview(&root)?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
            Ok(())
        }
    }
}

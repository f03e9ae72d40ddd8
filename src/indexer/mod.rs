use crate::config::Config;
use crate::db::{Db, NewRun};
use crate::error::IndexError;
use crate::indexer::extract::ImportExtractor;
use crate::indexer::scan::ScannedFile;
use crate::model::{EdgeKind, FileRecord, ImportEdge, ImportKind, IndexStats};
use crate::path::RelPath;
use crate::project::ProjectConfig;
use crate::resolve::{ResolveConfig, Resolver};
use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

pub mod extract;
pub mod javascript;
pub mod scan;
pub mod test_detection;

/// Shared flag to abort a running [`Indexer::reindex`] between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Import metadata carried alongside a recorded edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportMeta {
    pub import_kind: ImportKind,
    pub type_only: bool,
    pub line: i64,
}

/// Collects the edges of one run. Nothing reaches the database until
/// [`Recorder::commit`], which replaces the previous graph in one go.
#[derive(Debug, Default)]
pub struct Recorder {
    files: Vec<FileRecord>,
    edges: Vec<ImportEdge>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        source_file: RelPath,
        raw_specifier: String,
        target_file: Option<RelPath>,
        kind: EdgeKind,
        meta: ImportMeta,
    ) {
        self.edges.push(ImportEdge {
            source_file,
            raw_specifier,
            target_file,
            kind,
            import_kind: meta.import_kind,
            type_only: meta.type_only,
            line: meta.line,
            error: None,
        });
    }

    /// Placeholder edge for a source that could not be read or parsed.
    pub fn record_failure(&mut self, source_file: RelPath, message: String) {
        self.edges.push(ImportEdge {
            source_file,
            raw_specifier: String::new(),
            target_file: None,
            kind: EdgeKind::Unresolved,
            import_kind: ImportKind::Static,
            type_only: false,
            line: 0,
            error: Some(message),
        });
    }

    pub fn add_file(&mut self, file: FileRecord) {
        self.files.push(file);
    }

    pub fn edges(&self) -> &[ImportEdge] {
        &self.edges
    }

    pub fn commit(mut self, db: &Db, run: &NewRun) -> Result<i64> {
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
        self.edges.sort_by(|a, b| {
            (&a.source_file, a.line, &a.raw_specifier, a.import_kind)
                .cmp(&(&b.source_file, b.line, &b.raw_specifier, b.import_kind))
        });
        db.replace_import_edges(run, &self.files, &self.edges)
    }
}

struct Extractors {
    by_language: HashMap<&'static str, Box<dyn ImportExtractor>>,
}

impl Extractors {
    fn new() -> Result<Self> {
        let mut by_language: HashMap<&'static str, Box<dyn ImportExtractor>> = HashMap::new();
        by_language.insert("javascript", Box::new(javascript::JavascriptExtractor::new()?));
        by_language.insert("typescript", Box::new(javascript::TypescriptExtractor::new()?));
        by_language.insert("tsx", Box::new(javascript::TsxExtractor::new()?));
        Ok(Self { by_language })
    }
}

struct ResolvedImport {
    raw: String,
    target: Option<RelPath>,
    kind: EdgeKind,
    meta: ImportMeta,
}

enum FileOutcome {
    Indexed {
        path: RelPath,
        record: FileRecord,
        imports: Vec<ResolvedImport>,
    },
    Failed {
        path: RelPath,
        message: String,
    },
}

pub struct Indexer {
    repo_root: PathBuf,
    db: Db,
    scan_options: scan::ScanOptions,
    cancel: CancelToken,
}

impl Indexer {
    pub fn new(repo_root: PathBuf, db_path: PathBuf) -> Result<Self> {
        Self::new_with_options(repo_root, db_path, scan::ScanOptions::default())
    }

    pub fn new_with_options(
        repo_root: PathBuf,
        db_path: PathBuf,
        scan_options: scan::ScanOptions,
    ) -> Result<Self> {
        let repo_root = std::fs::canonicalize(&repo_root)
            .with_context(|| format!("resolve project root {}", repo_root.display()))?;
        let db = Db::new(&db_path)?;
        Ok(Self {
            repo_root,
            db,
            scan_options,
            cancel: CancelToken::default(),
        })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Full re-index: walk, extract, resolve, then atomically replace the
    /// stored graph.
    ///
    /// Configuration errors fail before any file is read. Per-file failures
    /// are recorded as unresolved placeholder edges. A cancelled run leaves
    /// the database untouched.
    pub fn reindex(&mut self) -> Result<IndexStats> {
        let started = Instant::now();
        let project = ProjectConfig::load(&self.repo_root).context("load project config")?;
        let resolve_config = ResolveConfig::from_project(&self.repo_root, &project)
            .context("invalid alias configuration")?;

        let scan = scan::scan_repo_with_options(&self.repo_root, self.scan_options)?;
        let files = scan.file_set();
        let sources: Vec<&ScannedFile> = scan.sources().collect();
        info!(
            files = files.len(),
            sources = sources.len(),
            aliases = resolve_config.aliases.mappings().len(),
            "scan complete"
        );

        let config = Config::get();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .context("build resolver thread pool")?;
        let resolver = Resolver::new(&files, &resolve_config);
        let max_bytes = config.max_file_size_bytes();
        let cancel = &self.cancel;

        let outcomes: Vec<Option<FileOutcome>> = pool.install(|| {
            sources
                .par_iter()
                .map_init(Extractors::new, |extractors, file| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(index_source(extractors, &resolver, file, max_bytes))
                })
                .collect()
        });

        if self.cancel.is_cancelled() {
            self.cancel.reset();
            warn!("indexing cancelled, previous graph kept");
            return Err(IndexError::Cancelled.into());
        }

        let mut stats = IndexStats {
            scanned: files.len(),
            ..Default::default()
        };
        let mut recorder = Recorder::new();
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                FileOutcome::Indexed {
                    path,
                    record,
                    imports,
                } => {
                    stats.indexed += 1;
                    recorder.add_file(record);
                    for import in imports {
                        match import.kind {
                            EdgeKind::Package => stats.packages += 1,
                            EdgeKind::Unresolved => stats.unresolved += 1,
                            EdgeKind::Relative | EdgeKind::Alias => stats.resolved += 1,
                        }
                        recorder.record(path.clone(), import.raw, import.target, import.kind, import.meta);
                    }
                }
                FileOutcome::Failed { path, message } => {
                    stats.errors += 1;
                    recorder.record_failure(path, message);
                }
            }
        }
        stats.edges = recorder.edges().len();
        stats.duration_ms = started.elapsed().as_millis() as u64;

        let run = NewRun {
            commit_sha: crate::util::git_head_sha(&self.repo_root),
            duration_ms: stats.duration_ms as i64,
        };
        recorder.commit(&self.db, &run)?;
        info!(
            indexed = stats.indexed,
            edges = stats.edges,
            resolved = stats.resolved,
            unresolved = stats.unresolved,
            errors = stats.errors,
            "reindex complete"
        );
        Ok(stats)
    }
}

fn index_source(
    extractors: &mut Result<Extractors>,
    resolver: &Resolver<'_>,
    file: &ScannedFile,
    max_bytes: u64,
) -> FileOutcome {
    let path = file.rel_path.clone();
    match extract_and_resolve(extractors, resolver, file, max_bytes) {
        Ok((record, imports)) => {
            debug!(path = %path, imports = imports.len(), "indexed");
            FileOutcome::Indexed {
                path,
                record,
                imports,
            }
        }
        Err(err) => {
            warn!(path = %path, "index error: {err:#}");
            FileOutcome::Failed {
                path,
                message: format!("{err:#}"),
            }
        }
    }
}

fn extract_and_resolve(
    extractors: &mut Result<Extractors>,
    resolver: &Resolver<'_>,
    file: &ScannedFile,
    max_bytes: u64,
) -> Result<(FileRecord, Vec<ResolvedImport>)> {
    let language = file
        .language
        .ok_or_else(|| anyhow!("no extractor for {}", file.rel_path))?;
    if file.size > max_bytes {
        return Err(anyhow!(
            "skipped: {} bytes exceeds limit of {max_bytes}",
            file.size
        ));
    }
    let bytes = crate::util::read_bytes(&file.abs_path)?;
    let hash = crate::util::hash_bytes(&bytes);
    let source = String::from_utf8(bytes).context("source is not valid utf-8")?;

    let extractors = extractors
        .as_mut()
        .map_err(|err| anyhow!("initialize parsers: {err:#}"))?;
    let extractor = extractors
        .by_language
        .get_mut(language)
        .ok_or_else(|| anyhow!("no extractor for language {language}"))?;
    let extracted = extractor
        .extract(&source)
        .with_context(|| format!("extract {language}"))?;

    let imports = extracted
        .imports
        .into_iter()
        .map(|import| {
            let resolution = resolver.resolve(&file.rel_path, &import.raw);
            ResolvedImport {
                raw: import.raw,
                target: resolution.target,
                kind: resolution.kind,
                meta: ImportMeta {
                    import_kind: import.kind,
                    type_only: import.type_only,
                    line: import.line,
                },
            }
        })
        .collect();
    let record = FileRecord {
        path: file.rel_path.to_string(),
        hash,
        language: language.to_string(),
        size: file.size as i64,
    };
    Ok((record, imports))
}

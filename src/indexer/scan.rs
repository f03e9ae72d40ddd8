use crate::path::RelPath;
use crate::resolve::fileset::FileSet;
use anyhow::Result;
use ignore::WalkBuilder;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub rel_path: RelPath,
    pub abs_path: PathBuf,
    pub size: u64,
    /// Set for files whose imports get extracted.
    pub language: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct LanguageSpec {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub no_ignore: bool,
}

impl ScanOptions {
    pub fn new(no_ignore: bool) -> Self {
        Self { no_ignore }
    }
}

static LANGUAGE_SPECS: &[LanguageSpec] = &[
    LanguageSpec {
        name: "javascript",
        extensions: &["js", "jsx", "mjs", "cjs"],
    },
    LanguageSpec {
        name: "typescript",
        extensions: &["ts", "mts", "cts"],
    },
    LanguageSpec {
        name: "tsx",
        extensions: &["tsx"],
    },
];

/// Result of one directory walk: every file, sorted by path.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: Vec<ScannedFile>,
}

impl ScanResult {
    pub fn file_set(&self) -> FileSet {
        FileSet::from_paths(self.files.iter().map(|file| file.rel_path.clone()))
    }

    pub fn sources(&self) -> impl Iterator<Item = &ScannedFile> {
        self.files.iter().filter(|file| file.language.is_some())
    }
}

pub fn scan_repo(repo_root: &Path) -> Result<ScanResult> {
    scan_repo_with_options(repo_root, ScanOptions::default())
}

pub fn scan_repo_with_options(repo_root: &Path, options: ScanOptions) -> Result<ScanResult> {
    let mut files = Vec::new();
    let mut builder = WalkBuilder::new(repo_root);
    if options.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .parents(true)
            .require_git(false);
    }
    let walker = builder
        .hidden(false)
        .filter_entry(|entry| !is_ignored_entry(entry))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                warn!("walk error: {err}");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let rel_path = match RelPath::from_abs(repo_root, path) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = %path.display(), "skip: {err}");
                continue;
            }
        };
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        files.push(ScannedFile {
            rel_path,
            abs_path: path.to_path_buf(),
            size,
            language: detect_language(path),
        });
    }
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(ScanResult { files })
}

fn is_ignored_entry(entry: &ignore::DirEntry) -> bool {
    match entry.file_name() {
        name if name == OsStr::new(".kota") => true,
        name if name == OsStr::new(".git") => true,
        name if name == OsStr::new("node_modules") => true,
        _ => false,
    }
}

fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|ext| ext.to_str())?;
    for spec in LANGUAGE_SPECS {
        if spec.extensions.iter().any(|candidate| *candidate == ext) {
            return Some(spec.name);
        }
    }
    None
}

pub fn language_for_path(path: &Path) -> Option<&'static str> {
    detect_language(path)
}

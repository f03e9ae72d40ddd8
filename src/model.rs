use crate::path::RelPath;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How an import edge was (or was not) resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Relative,
    Alias,
    Package,
    Unresolved,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Relative => "relative",
            EdgeKind::Alias => "alias",
            EdgeKind::Package => "package",
            EdgeKind::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "relative" => Ok(EdgeKind::Relative),
            "alias" => Ok(EdgeKind::Alias),
            "package" => Ok(EdgeKind::Package),
            "unresolved" => Ok(EdgeKind::Unresolved),
            other => Err(format!("unknown edge kind: {other}")),
        }
    }
}

/// Syntactic form of the import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Static,
    Reexport,
    Require,
    Dynamic,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Static => "static",
            ImportKind::Reexport => "reexport",
            ImportKind::Require => "require",
            ImportKind::Dynamic => "dynamic",
        }
    }
}

/// One recorded import. Immutable once built; a re-index replaces the whole
/// edge set rather than patching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEdge {
    pub source_file: RelPath,
    pub raw_specifier: String,
    pub target_file: Option<RelPath>,
    pub kind: EdgeKind,
    pub import_kind: ImportKind,
    pub type_only: bool,
    pub line: i64,
    /// Set on the placeholder edge written for a file that failed to read
    /// or parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An import edge as read back from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRecord {
    pub source_file: String,
    pub raw_specifier: String,
    pub target_file: Option<String>,
    pub kind: EdgeKind,
    pub import_kind: String,
    pub type_only: bool,
    pub line: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: String,
    pub hash: String,
    pub language: String,
    pub size: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexRun {
    pub id: i64,
    pub created: i64,
    pub commit_sha: Option<String>,
    pub files: i64,
    pub edges: i64,
    pub duration_ms: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct IndexStats {
    /// Every file seen by the walk (the file set).
    pub scanned: usize,
    /// JS/TS sources whose imports were extracted.
    pub indexed: usize,
    pub errors: usize,
    pub edges: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub packages: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct Overview {
    pub root: String,
    pub files: usize,
    pub edges: usize,
    pub edges_by_kind: BTreeMap<String, usize>,
    pub last_run: Option<IndexRun>,
}

/// Answer to "what touches this file", shaped for editor hooks.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepsResult {
    pub file: String,
    pub depth: usize,
    pub dependents: Vec<String>,
    pub dependencies: Vec<String>,
    pub test_files: Vec<String>,
}

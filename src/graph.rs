//! Transitive dependency queries over the committed import graph.

use crate::db::Db;
use crate::indexer::test_detection::is_test_file;
use crate::model::DepsResult;
use crate::path::RelPath;
use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::Path;

pub const MIN_DEPTH: usize = 1;
pub const MAX_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy)]
enum Direction {
    Dependents,
    Dependencies,
}

/// Turn a user supplied path (absolute under `root`, or relative to it)
/// into the coordinate space the graph is stored in.
pub fn normalize_query_path(root: &Path, raw: &str) -> Result<RelPath> {
    let path = Path::new(raw);
    if path.is_absolute() {
        let abs = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        RelPath::from_abs(root, &abs).with_context(|| format!("invalid query path {raw}"))
    } else {
        RelPath::new(raw).with_context(|| format!("invalid query path {raw}"))
    }
}

/// Files reachable from `file` within `depth` hops, in both directions.
///
/// Depth is clamped to `1..=5`. Only resolved edges are followed, so
/// packages and unresolved specifiers never show up here.
pub fn file_deps(db: &Db, file: &RelPath, depth: usize) -> Result<DepsResult> {
    let depth = depth.clamp(MIN_DEPTH, MAX_DEPTH);
    let dependents = walk(db, file, depth, Direction::Dependents)?;
    let dependencies = walk(db, file, depth, Direction::Dependencies)?;
    let test_files = dependents
        .iter()
        .filter(|path| is_test_file(path))
        .cloned()
        .collect();
    Ok(DepsResult {
        file: file.to_string(),
        depth,
        dependents: dependents.into_iter().collect(),
        dependencies: dependencies.into_iter().collect(),
        test_files,
    })
}

fn walk(db: &Db, start: &RelPath, depth: usize, direction: Direction) -> Result<BTreeSet<String>> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(start.to_string());
    let mut found = BTreeSet::new();
    let mut queue = VecDeque::new();
    queue.push_back((start.to_string(), 0usize));

    while let Some((path, level)) = queue.pop_front() {
        if level >= depth {
            continue;
        }
        let neighbors: Vec<String> = match direction {
            Direction::Dependents => db
                .dependents(&path)?
                .into_iter()
                .map(|edge| edge.source_file)
                .collect(),
            Direction::Dependencies => db
                .dependencies(&path)?
                .into_iter()
                .filter_map(|edge| edge.target_file)
                .collect(),
        };
        for next in neighbors {
            if seen.insert(next.clone()) {
                found.insert(next.clone());
                queue.push_back((next, level + 1));
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewRun;
    use crate::model::{EdgeKind, FileRecord, ImportEdge, ImportKind};
    use tempfile::TempDir;

    fn rel(raw: &str) -> RelPath {
        RelPath::new(raw).unwrap()
    }

    fn edge(source: &str, target: &str) -> ImportEdge {
        ImportEdge {
            source_file: rel(source),
            raw_specifier: format!("./{target}"),
            target_file: Some(rel(target)),
            kind: EdgeKind::Relative,
            import_kind: ImportKind::Static,
            type_only: false,
            line: 1,
            error: None,
        }
    }

    fn chain_db() -> (Db, TempDir) {
        let temp = TempDir::new().unwrap();
        let db = Db::new(&temp.path().join("graph.db")).unwrap();
        let files: Vec<FileRecord> = ["a.ts", "b.ts", "c.ts", "d.ts", "b.test.ts"]
            .iter()
            .map(|path| FileRecord {
                path: path.to_string(),
                hash: String::new(),
                language: "typescript".into(),
                size: 0,
            })
            .collect();
        // a -> b -> c -> d, b.test -> b, d -> a closes a cycle
        let edges = vec![
            edge("a.ts", "b.ts"),
            edge("b.ts", "c.ts"),
            edge("c.ts", "d.ts"),
            edge("d.ts", "a.ts"),
            edge("b.test.ts", "b.ts"),
        ];
        db.replace_import_edges(&NewRun::default(), &files, &edges)
            .unwrap();
        (db, temp)
    }

    #[test]
    fn depth_limits_traversal() {
        let (db, _temp) = chain_db();
        let one = file_deps(&db, &rel("c.ts"), 1).unwrap();
        assert_eq!(one.dependents, vec!["b.ts"]);
        assert_eq!(one.dependencies, vec!["d.ts"]);

        let two = file_deps(&db, &rel("c.ts"), 2).unwrap();
        assert_eq!(two.dependents, vec!["a.ts", "b.test.ts", "b.ts"]);
        assert_eq!(two.test_files, vec!["b.test.ts"]);
    }

    #[test]
    fn cycles_terminate_and_exclude_start() {
        let (db, _temp) = chain_db();
        let result = file_deps(&db, &rel("a.ts"), 5).unwrap();
        assert!(!result.dependencies.contains(&"a.ts".to_string()));
        assert_eq!(result.dependencies, vec!["b.ts", "c.ts", "d.ts"]);
    }

    #[test]
    fn depth_is_clamped() {
        let (db, _temp) = chain_db();
        assert_eq!(file_deps(&db, &rel("a.ts"), 0).unwrap().depth, 1);
        assert_eq!(file_deps(&db, &rel("a.ts"), 99).unwrap().depth, 5);
    }

    #[test]
    fn normalizes_absolute_and_relative_queries() {
        let root = Path::new("/proj");
        assert_eq!(
            normalize_query_path(root, "./src/api/routes.ts").unwrap().as_str(),
            "src/api/routes.ts"
        );
        assert_eq!(
            normalize_query_path(root, "/proj/src/db/index.ts").unwrap().as_str(),
            "src/db/index.ts"
        );
        assert!(normalize_query_path(root, "/other/x.ts").is_err());
    }
}

use crate::config::Config;
use crate::model::{EdgeRecord, FileRecord, ImportEdge, IndexRun, Overview};
use anyhow::{Context, Result};
use blake3::Hasher;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

mod migrations;

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(Duration::from_secs(30))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        Ok(())
    }

    fn on_release(&self, _conn: Connection) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDigest {
    pub rows: usize,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbDigest {
    pub files: TableDigest,
    pub edges: TableDigest,
}

/// Metadata for a run about to be committed.
#[derive(Debug, Clone, Default)]
pub struct NewRun {
    pub commit_sha: Option<String>,
    pub duration_ms: i64,
}

pub struct Db {
    write_conn: Arc<Mutex<Connection>>,
    read_pool: Pool<SqliteConnectionManager>,
}

/// Index runs kept for `overview`; older rows are pruned on commit.
const RUN_HISTORY: i64 = 10;

const EDGE_COLUMNS: &str =
    "source_path, raw_specifier, target_path, kind, import_kind, type_only, line, error";

impl Db {
    pub fn new(db_path: &Path) -> Result<Self> {
        crate::util::ensure_parent_dir(db_path)?;

        let config = Config::get();
        debug!(
            pool_size = config.pool_size,
            min_idle = config.pool_min_idle,
            "initializing connection pool"
        );

        // Open write connection first and run migrations
        let write_conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db at {}", db_path.display()))?;
        write_conn.busy_timeout(Duration::from_secs(30))?;
        write_conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;
        migrations::migrate(&write_conn)?;

        let write_conn = Arc::new(Mutex::new(write_conn));

        let manager = SqliteConnectionManager::file(db_path);
        let read_pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(config.pool_min_idle))
            .connection_timeout(Duration::from_secs(30))
            .connection_customizer(Box::new(ConnectionCustomizer))
            .build(manager)
            .with_context(|| "create connection pool")?;

        Ok(Self {
            write_conn,
            read_pool,
        })
    }

    pub fn read_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.read_pool
            .get()
            .with_context(|| "get read connection from pool")
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.write_conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the whole graph with the edges of one run.
    ///
    /// Everything happens in a single transaction: readers see either the
    /// previous run or this one, never a mix. On error the transaction is
    /// rolled back and the previous graph stays authoritative.
    pub fn replace_import_edges(
        &self,
        run: &NewRun,
        files: &[FileRecord],
        edges: &[ImportEdge],
    ) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let created = unix_now();
        tx.execute(
            "INSERT INTO index_runs (created, commit_sha, files, edges, duration_ms)
             VALUES (?, ?, ?, ?, ?)",
            params![
                created,
                run.commit_sha.as_deref(),
                files.len() as i64,
                edges.len() as i64,
                run.duration_ms
            ],
        )?;
        let run_id = tx.last_insert_rowid();
        tx.execute("DELETE FROM import_edges", [])?;
        tx.execute("DELETE FROM files", [])?;
        tx.execute(
            "DELETE FROM index_runs
             WHERE id NOT IN (SELECT id FROM index_runs ORDER BY id DESC LIMIT ?)",
            params![RUN_HISTORY],
        )?;
        {
            let mut insert_file = tx.prepare(
                "INSERT INTO files (path, hash, language, size) VALUES (?, ?, ?, ?)",
            )?;
            for file in files {
                insert_file
                    .execute(params![&file.path, &file.hash, &file.language, file.size])
                    .with_context(|| format!("insert file {}", file.path))?;
            }
            let mut insert_edge = tx.prepare(
                "INSERT INTO import_edges
                 (run_id, source_path, raw_specifier, target_path, kind, import_kind, type_only, line, error)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for edge in edges {
                insert_edge.execute(params![
                    run_id,
                    edge.source_file.as_str(),
                    &edge.raw_specifier,
                    edge.target_file.as_ref().map(|t| t.as_str()),
                    edge.kind.as_str(),
                    edge.import_kind.as_str(),
                    edge.type_only,
                    edge.line,
                    edge.error.as_deref(),
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('last_run', ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![run_id.to_string()],
        )?;
        tx.commit().with_context(|| "commit import graph")?;
        info!(run_id, files = files.len(), edges = edges.len(), "import graph committed");
        Ok(run_id)
    }

    /// Edges whose target is `path`. Unresolved edges never appear here.
    pub fn dependents(&self, path: &str) -> Result<Vec<EdgeRecord>> {
        self.query_edges(
            &format!(
                "SELECT {EDGE_COLUMNS} FROM import_edges
                 WHERE target_path = ?
                 ORDER BY source_path, line, raw_specifier"
            ),
            params![path],
        )
    }

    /// Resolved edges leaving `path`.
    pub fn dependencies(&self, path: &str) -> Result<Vec<EdgeRecord>> {
        self.query_edges(
            &format!(
                "SELECT {EDGE_COLUMNS} FROM import_edges
                 WHERE source_path = ? AND target_path IS NOT NULL
                 ORDER BY line, raw_specifier"
            ),
            params![path],
        )
    }

    /// Every edge recorded for `path`, resolved or not.
    pub fn edges_from(&self, path: &str) -> Result<Vec<EdgeRecord>> {
        self.query_edges(
            &format!(
                "SELECT {EDGE_COLUMNS} FROM import_edges
                 WHERE source_path = ?
                 ORDER BY line, raw_specifier"
            ),
            params![path],
        )
    }

    /// Edges with no target file (packages, failed lookups, read errors).
    pub fn unresolved_edges(&self, limit: usize) -> Result<Vec<EdgeRecord>> {
        self.query_edges(
            &format!(
                "SELECT {EDGE_COLUMNS} FROM import_edges
                 WHERE target_path IS NULL
                 ORDER BY source_path, line, raw_specifier
                 LIMIT ?"
            ),
            params![limit as i64],
        )
    }

    fn query_edges(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<EdgeRecord>> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(args, edge_from_row)?;
        let mut edges = Vec::new();
        for row in rows {
            edges.push(row?);
        }
        Ok(edges)
    }

    pub fn list_files(&self) -> Result<Vec<FileRecord>> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT path, hash, language, size
             FROM files
             ORDER BY path",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FileRecord {
                path: row.get(0)?,
                hash: row.get(1)?,
                language: row.get(2)?,
                size: row.get(3)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn last_run(&self) -> Result<Option<IndexRun>> {
        let Some(run_id) = self.get_meta_i64("last_run")? else {
            return Ok(None);
        };
        self.read_conn()?
            .query_row(
                "SELECT id, created, commit_sha, files, edges, duration_ms
                 FROM index_runs WHERE id = ?",
                params![run_id],
                |row| {
                    Ok(IndexRun {
                        id: row.get(0)?,
                        created: row.get(1)?,
                        commit_sha: row.get(2)?,
                        files: row.get(3)?,
                        edges: row.get(4)?,
                        duration_ms: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn overview(&self, root: &Path) -> Result<Overview> {
        let conn = self.read_conn()?;
        let files: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        let mut stmt =
            conn.prepare("SELECT kind, COUNT(*) FROM import_edges GROUP BY kind ORDER BY kind")?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((kind, count as usize))
        })?;
        let mut edges_by_kind = BTreeMap::new();
        for row in rows {
            let (kind, count) = row?;
            edges_by_kind.insert(kind, count);
        }
        Ok(Overview {
            root: root.to_string_lossy().to_string(),
            files: files as usize,
            edges: edges_by_kind.values().sum(),
            edges_by_kind,
            last_run: self.last_run()?,
        })
    }

    /// Content digest of the committed graph, independent of run ids and
    /// timestamps. Two runs over the same tree produce equal digests.
    pub fn digest(&self) -> Result<DbDigest> {
        Ok(DbDigest {
            files: self.digest_files()?,
            edges: self.digest_edges()?,
        })
    }

    pub fn get_meta_i64(&self, key: &str) -> Result<Option<i64>> {
        let value: Option<String> = self
            .read_conn()?
            .query_row(
                "SELECT value FROM meta WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(|v| v.parse::<i64>().ok()))
    }

    fn digest_files(&self) -> Result<TableDigest> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT path, hash, language, size
             FROM files
             ORDER BY path",
        )?;
        let rows = stmt.query_map([], |row| {
            let path: String = row.get(0)?;
            let hash: String = row.get(1)?;
            let language: String = row.get(2)?;
            let size: i64 = row.get(3)?;
            Ok(json!([path, hash, language, size]).to_string())
        })?;
        digest_rows(rows)
    }

    fn digest_edges(&self) -> Result<TableDigest> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS}
             FROM import_edges
             ORDER BY source_path, line, raw_specifier, import_kind"
        ))?;
        let rows = stmt.query_map([], |row| {
            let edge = edge_from_row(row)?;
            Ok(json!([
                edge.source_file,
                edge.raw_specifier,
                edge.target_file,
                edge.kind,
                edge.import_kind,
                edge.type_only,
                edge.line,
                edge.error
            ])
            .to_string())
        })?;
        digest_rows(rows)
    }
}

fn digest_rows<I>(rows: I) -> Result<TableDigest>
where
    I: Iterator<Item = rusqlite::Result<String>>,
{
    let mut hasher = Hasher::new();
    let mut count = 0;
    for row in rows {
        let row = row?;
        hasher.update(row.as_bytes());
        hasher.update(b"\n");
        count += 1;
    }
    Ok(TableDigest {
        rows: count,
        hash: hasher.finalize().to_hex().to_string(),
    })
}

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<EdgeRecord> {
    Ok(EdgeRecord {
        source_file: row.get(0)?,
        raw_specifier: row.get(1)?,
        target_file: row.get(2)?,
        kind: row.get::<_, String>(3)?.parse().map_err(|err: String| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, err.into())
        })?,
        import_kind: row.get(4)?,
        type_only: row.get(5)?,
        line: row.get(6)?,
        error: row.get(7)?,
    })
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

pub const SCHEMA_VERSION: i64 = 1;

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        BEGIN;
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS index_runs (
            id INTEGER PRIMARY KEY,
            created INTEGER NOT NULL,
            commit_sha TEXT,
            files INTEGER NOT NULL,
            edges INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY,
            path TEXT NOT NULL UNIQUE,
            hash TEXT NOT NULL,
            language TEXT NOT NULL,
            size INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS import_edges (
            id INTEGER PRIMARY KEY,
            run_id INTEGER NOT NULL,
            source_path TEXT NOT NULL,
            raw_specifier TEXT NOT NULL,
            target_path TEXT,
            kind TEXT NOT NULL,
            import_kind TEXT NOT NULL,
            type_only INTEGER NOT NULL DEFAULT 0,
            line INTEGER NOT NULL,
            error TEXT,
            FOREIGN KEY(run_id) REFERENCES index_runs(id)
        );

        CREATE INDEX IF NOT EXISTS idx_import_edges_source ON import_edges(source_path);
        CREATE INDEX IF NOT EXISTS idx_import_edges_target ON import_edges(target_path);
        CREATE INDEX IF NOT EXISTS idx_import_edges_kind ON import_edges(kind);
        COMMIT;
        ",
    )?;

    let existing: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    let existing = existing.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0);

    if existing < SCHEMA_VERSION {
        conn.execute(
            "INSERT INTO meta (key, value) VALUES ('schema_version', ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [SCHEMA_VERSION.to_string()],
        )?;
    }

    Ok(())
}

pub mod migrations;
pub mod queries;
pub mod seed;

use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;

/// How long a writer waits on SQLite's lock before reporting `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

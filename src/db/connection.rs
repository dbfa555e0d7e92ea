use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Thread-safe database wrapper, generalized from the teacher's `Database`: one
/// `parking_lot::Mutex<Connection>` shared by the orchestrator and every stage
/// that persists (C10, §4.10). The pipeline itself never touches this directly
/// it runs through the repository traits in `reference_store` and `plan_repository`.
pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database, used by tests and the CLI's `--ephemeral` mode.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("aps_engine.db")
    }
}

/// Initialize the database: create tables, seed reference data if empty (§4.10).
pub fn initialize_database(db_path: impl AsRef<Path>) -> Result<Database> {
    let db_path = db_path.as_ref();
    info!(path = %db_path.display(), "initializing database");

    let db = Database::open(db_path)?;
    bootstrap(&db)?;
    Ok(db)
}

pub fn initialize_in_memory() -> Result<Database> {
    let db = Database::open_in_memory()?;
    bootstrap(&db)?;
    Ok(db)
}

fn bootstrap(db: &Database) -> Result<()> {
    let conn = db.conn.lock();
    super::schema::create_tables(&conn)?;

    let machine_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM machines", [], |row| row.get(0))
        .unwrap_or(0);

    if machine_count == 0 {
        info!("reference tables are empty, seeding development data");
        super::seed::seed_reference_data(&conn).map_err(|e| {
            PipelineError::PersistenceFailed(format!("failed to seed reference data: {e}"))
        })?;
    }

    Ok(())
}

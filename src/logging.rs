//! Observability Layer (C11, §4.11): one call site that both emits a live `tracing`
//! event and persists the same entry to the `stage_log` table.

use chrono::Local;
use rusqlite::{params, Connection};
use serde_json::Value;

use crate::error::Result;
use crate::model::LogLevel;

/// Persists a `StageLogEntry` row and mirrors it as a `tracing::event!` at the
/// matching level. Call sites pass `stage`/`step` exactly as they appear in
/// `STAGE_PROGRESS_SHARES` so a task's history reads as one coherent timeline.
pub fn record(
    conn: &Connection,
    task_id: &str,
    stage: &str,
    step: &str,
    level: LogLevel,
    message: &str,
    data: Option<Value>,
    duration_ms: Option<i64>,
) -> Result<()> {
    let logged_at = Local::now().naive_local();

    match level {
        LogLevel::Debug => tracing::debug!(task_id, stage, step, message, "stage log"),
        LogLevel::Info => tracing::info!(task_id, stage, step, message, "stage log"),
        LogLevel::Warn => tracing::warn!(task_id, stage, step, message, "stage log"),
        LogLevel::Error => tracing::error!(task_id, stage, step, message, "stage log"),
    }

    conn.execute(
        "INSERT INTO stage_log (task_id, stage, step, level, message, data, duration_ms, logged_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            task_id,
            stage,
            step,
            level.as_str(),
            message,
            data.map(|v| v.to_string()),
            duration_ms,
            logged_at,
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_a_stage_log_row() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::create_tables(&conn).unwrap();
        conn.execute(
            "INSERT INTO scheduling_tasks (task_id, batch_id, status, current_stage, progress, flags)
             VALUES ('t1', 'B1', 'RUNNING', 'load', 0, '{}')",
            [],
        )
        .unwrap();

        record(&conn, "t1", "load", "load_batch", LogLevel::Info, "loaded 3 rows", None, Some(12)).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM stage_log WHERE task_id = 't1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}

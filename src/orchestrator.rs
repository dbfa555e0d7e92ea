//! Task Orchestrator (C9, §4.9): owns the `SchedulingTask` lifecycle, runs the
//! six-stage pipeline, and enforces idempotency and cooperative cancellation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::db::Database;
use crate::error::{PipelineError, Result};
use crate::model::{
    LogLevel, ResultSummary, SchedulingFlags, SchedulingTask, TaskStatus, STAGE_PROGRESS_SHARES,
};
use crate::pipeline::{self, Writer};
use crate::plan_repository::{PlanRepository, SqlitePlanRepository};
use crate::reference_store::ReferenceSnapshot;

/// Optional filter for `list_tasks` (§6 `ListTasks(filter)`).
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub batch_id: Option<String>,
    pub status: Option<TaskStatus>,
}

struct TaskHandle {
    cancel: CancellationToken,
}

/// Shared orchestrator state. Cheap to clone — every field is an `Arc`, matching the
/// teacher's preference for `parking_lot` over `std::sync::Mutex` for the in-process
/// registries it keeps alongside the SQLite connection.
#[derive(Clone)]
pub struct Orchestrator {
    db: Arc<Database>,
    config: Arc<PipelineConfig>,
    tasks: Arc<Mutex<HashMap<String, TaskHandle>>>,
}

impl Orchestrator {
    pub fn new(db: Arc<Database>, config: PipelineConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `StartTask(batchId, flags, forceRerun?) → taskId` (§6, §4.9).
    pub async fn start_task(
        &self,
        batch_id: &str,
        flags: SchedulingFlags,
        force_rerun: bool,
    ) -> Result<String> {
        {
            let conn = self.db.conn.lock();

            if let Some(existing) = find_non_terminal_task(&conn, batch_id)? {
                return Err(PipelineError::TaskAlreadyRunning(format!(
                    "batch {batch_id} already has task {existing} in flight"
                )));
            }

            if !force_rerun {
                if let Some(existing) = find_completed_task(&conn, batch_id, &flags)? {
                    return Ok(existing);
                }
            }
        }

        let task_id = Uuid::new_v4().to_string();
        let task = SchedulingTask::new(task_id.clone(), batch_id.to_string(), flags);
        {
            let conn = self.db.conn.lock();
            insert_task(&conn, &task)?;
        }

        let cancel = CancellationToken::new();
        self.tasks.lock().insert(task_id.clone(), TaskHandle { cancel: cancel.clone() });

        let orchestrator = self.clone();
        let spawned_task_id = task_id.clone();
        let spawned_batch_id = batch_id.to_string();
        tokio::spawn(async move {
            orchestrator.run_task(spawned_task_id, spawned_batch_id, flags, cancel).await;
        });

        Ok(task_id)
    }

    /// `GetTask(taskId) → SchedulingTask` (§6).
    pub fn get_task(&self, task_id: &str) -> Result<SchedulingTask> {
        let conn = self.db.conn.lock();
        load_task(&conn, task_id)?.ok_or_else(|| PipelineError::TaskNotFound(task_id.to_string()))
    }

    /// `CancelTask(taskId) → void` (§6). Signals cooperative cancellation; the actual
    /// CANCELLED transition happens the next time the running stage observes the token.
    pub fn cancel_task(&self, task_id: &str) -> Result<()> {
        let tasks = self.tasks.lock();
        match tasks.get(task_id) {
            Some(handle) => {
                handle.cancel.cancel();
                Ok(())
            }
            None => Err(PipelineError::TaskNotFound(task_id.to_string())),
        }
    }

    /// `ListTasks(filter) → page of SchedulingTask` (§6). No real pagination yet — the
    /// CLI's only consumer never asks for more than a screenful.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<SchedulingTask>> {
        let conn = self.db.conn.lock();
        list_tasks(&conn, filter)
    }

    async fn run_task(
        &self,
        task_id: String,
        batch_id: String,
        flags: SchedulingFlags,
        cancel: CancellationToken,
    ) {
        let outcome = tokio::time::timeout(
            self.config.task_timeout(),
            self.run_stages(&task_id, &batch_id, flags, &cancel),
        )
        .await;

        let result = match outcome {
            Ok(inner) => inner,
            Err(_) => Err(PipelineError::Timeout),
        };

        self.finish_task(&task_id, result);
        self.tasks.lock().remove(&task_id);
    }

    async fn run_stages(
        &self,
        task_id: &str,
        batch_id: &str,
        flags: SchedulingFlags,
        cancel: &CancellationToken,
    ) -> Result<ResultSummary> {
        mark_running(&self.db.conn.lock(), task_id)?;

        let decade_rows = {
            let conn = self.db.conn.lock();
            check_cancelled(cancel)?;
            let rows = SqlitePlanRepository::new(&conn).load_batch(batch_id)?;
            for row in &rows {
                row.validate_invariants()?;
            }
            self.advance_stage(&conn, task_id, "load", &format!("loaded {} rows", rows.len()))?;
            rows
        };

        let snapshot = {
            let conn = self.db.conn.lock();
            ReferenceSnapshot::load(&conn)?
        };
        let calendar = crate::calendar::Calendar::new(&snapshot, self.config.calendar_horizon_days);

        check_cancelled(cancel)?;
        let merged = pipeline::merge(&decade_rows, flags.merge_enabled)?;
        self.advance_stage(&self.db.conn.lock(), task_id, "merge", &format!("{} logical orders", merged.len()))?;

        check_cancelled(cancel)?;
        let split = pipeline::split(merged, flags.split_enabled)?;
        self.advance_stage(&self.db.conn.lock(), task_id, "split", &format!("{} orders after split", split.len()))?;

        check_cancelled(cancel)?;
        let corrected = pipeline::correct_times(split, &snapshot, &calendar, flags.correction_enabled, self.config.min_gap())?;
        self.advance_stage(&self.db.conn.lock(), task_id, "correction", "times corrected")?;

        check_cancelled(cancel)?;
        let synced = pipeline::parallel_sync(corrected, &snapshot, &calendar, flags.parallel_enabled)?;
        self.advance_stage(&self.db.conn.lock(), task_id, "parallel_sync", "groups synchronized")?;

        check_cancelled(cancel)?;
        let mut writer = Writer::new(&self.db, &self.config);
        let write_result = writer.write(&synced, &snapshot, task_id, batch_id).await?;
        self.advance_stage(
            &self.db.conn.lock(),
            task_id,
            "write",
            &format!(
                "{} packer orders, {} feeder orders",
                write_result.packer_orders.len(),
                write_result.feeder_orders.len()
            ),
        )?;

        Ok(ResultSummary {
            total_work_orders: decade_rows.len() as i64,
            packing_orders: write_result.packer_orders.len() as i64,
            feeding_orders: write_result.feeder_orders.len() as i64,
        })
    }

    fn advance_stage(&self, conn: &Connection, task_id: &str, stage: &str, message: &str) -> Result<()> {
        let share: u8 = STAGE_PROGRESS_SHARES
            .iter()
            .take_while(|(name, _)| *name != stage)
            .map(|(_, pct)| *pct)
            .sum::<u8>()
            + STAGE_PROGRESS_SHARES.iter().find(|(name, _)| *name == stage).map(|(_, pct)| *pct).unwrap_or(0);

        conn.execute(
            "UPDATE scheduling_tasks SET current_stage = ?1, progress = ?2 WHERE task_id = ?3",
            params![stage, share, task_id],
        )?;
        crate::logging::record(conn, task_id, stage, stage, LogLevel::Info, message, None, None)?;
        Ok(())
    }

    fn finish_task(&self, task_id: &str, result: Result<ResultSummary>) {
        let conn = self.db.conn.lock();
        let now = Local::now().naive_local();

        match result {
            Ok(summary) => {
                let summary_json = serde_json::to_string(&summary).unwrap_or_default();
                let _ = conn.execute(
                    "UPDATE scheduling_tasks
                     SET status = 'COMPLETED', current_stage = 'done', progress = 100,
                         end_time = ?1, result_summary = ?2
                     WHERE task_id = ?3",
                    params![now, summary_json, task_id],
                );
                let _ = crate::logging::record(
                    &conn, task_id, "done", "complete", LogLevel::Info, "task completed", None, None,
                );
            }
            Err(e) => {
                let status = if matches!(e, PipelineError::Cancelled) {
                    "CANCELLED"
                } else {
                    "FAILED"
                };
                let _ = delete_partial_outputs(&conn, task_id);
                let _ = conn.execute(
                    "UPDATE scheduling_tasks
                     SET status = ?1, end_time = ?2, error_message = ?3
                     WHERE task_id = ?4",
                    params![status, now, e.to_string(), task_id],
                );
                let _ = crate::logging::record(
                    &conn, task_id, "failed", "abort", LogLevel::Error, &e.to_string(), None, None,
                );
            }
        }
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

fn mark_running(conn: &Connection, task_id: &str) -> Result<()> {
    let now = Local::now().naive_local();
    conn.execute(
        "UPDATE scheduling_tasks
         SET status = 'RUNNING', current_stage = 'load', start_time = ?1
         WHERE task_id = ?2",
        params![now, task_id],
    )?;
    Ok(())
}

fn insert_task(conn: &Connection, task: &SchedulingTask) -> Result<()> {
    let flags_json = serde_json::to_string(&task.flags).unwrap_or_default();
    conn.execute(
        "INSERT INTO scheduling_tasks
            (task_id, batch_id, status, current_stage, progress, start_time, end_time, flags,
             error_message, result_summary)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            task.task_id,
            task.batch_id,
            task.status.as_str(),
            task.current_stage,
            task.progress as i64,
            task.start_time,
            task.end_time,
            flags_json,
            task.error_message,
            task.result_summary.as_ref().map(|s| serde_json::to_string(s).unwrap_or_default()),
        ],
    )?;
    Ok(())
}

fn load_task(conn: &Connection, task_id: &str) -> Result<Option<SchedulingTask>> {
    conn.query_row(
        "SELECT task_id, batch_id, status, current_stage, progress, start_time, end_time, flags,
                error_message, result_summary
         FROM scheduling_tasks WHERE task_id = ?1",
        params![task_id],
        |row| SchedulingTask::from_row(row),
    )
    .optional()
    .map_err(PipelineError::from)
}

fn list_tasks(conn: &Connection, filter: &TaskFilter) -> Result<Vec<SchedulingTask>> {
    let mut sql = String::from(
        "SELECT task_id, batch_id, status, current_stage, progress, start_time, end_time, flags,
                error_message, result_summary
         FROM scheduling_tasks WHERE 1 = 1",
    );
    if filter.batch_id.is_some() {
        sql.push_str(" AND batch_id = ?1");
    }
    if filter.status.is_some() {
        sql.push_str(if filter.batch_id.is_some() { " AND status = ?2" } else { " AND status = ?1" });
    }
    sql.push_str(" ORDER BY start_time DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<SchedulingTask> = match (&filter.batch_id, &filter.status) {
        (Some(b), Some(s)) => stmt
            .query_map(params![b, s.as_str()], |row| SchedulingTask::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        (Some(b), None) => stmt
            .query_map(params![b], |row| SchedulingTask::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        (None, Some(s)) => stmt
            .query_map(params![s.as_str()], |row| SchedulingTask::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        (None, None) => stmt
            .query_map([], |row| SchedulingTask::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?,
    };
    Ok(rows)
}

fn find_non_terminal_task(conn: &Connection, batch_id: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT task_id FROM scheduling_tasks
         WHERE batch_id = ?1 AND status IN ('PENDING', 'RUNNING')
         LIMIT 1",
        params![batch_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(PipelineError::from)
}

fn find_completed_task(conn: &Connection, batch_id: &str, flags: &SchedulingFlags) -> Result<Option<String>> {
    let flags_json = serde_json::to_string(flags).unwrap_or_default();
    conn.query_row(
        "SELECT task_id FROM scheduling_tasks
         WHERE batch_id = ?1 AND status = 'COMPLETED' AND flags = ?2
         ORDER BY end_time DESC LIMIT 1",
        params![batch_id, flags_json],
        |row| row.get(0),
    )
    .optional()
    .map_err(PipelineError::from)
}

fn delete_partial_outputs(conn: &Connection, task_id: &str) -> Result<()> {
    conn.execute("DELETE FROM packer_orders WHERE task_id = ?1", params![task_id])?;
    conn.execute("DELETE FROM feeder_orders WHERE task_id = ?1", params![task_id])?;
    Ok(())
}

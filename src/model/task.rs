use chrono::NaiveDateTime;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> rusqlite::Result<Self> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "RUNNING" => Ok(TaskStatus::Running),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            "CANCELLED" => Ok(TaskStatus::Cancelled),
            other => Err(rusqlite::Error::InvalidColumnType(
                0,
                format!("unknown task status {other}"),
                rusqlite::types::Type::Text,
            )),
        }
    }

    /// Whether this status is terminal — no further stage will run for the task.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

/// Per-task toggles for the four optional pipeline stages (§3/§4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingFlags {
    pub merge_enabled: bool,
    pub split_enabled: bool,
    pub correction_enabled: bool,
    pub parallel_enabled: bool,
}

impl Default for SchedulingFlags {
    fn default() -> Self {
        Self {
            merge_enabled: true,
            split_enabled: true,
            correction_enabled: true,
            parallel_enabled: true,
        }
    }
}

/// `{totalWorkOrders, packingOrders, feedingOrders}` (§3), filled in on COMPLETED.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total_work_orders: i64,
    pub packing_orders: i64,
    pub feeding_orders: i64,
}

/// The unit of work run by the Task Orchestrator (C9), §3/§4.9.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingTask {
    pub task_id: String,
    pub batch_id: String,
    pub status: TaskStatus,
    pub current_stage: String,
    pub progress: u8,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub flags: SchedulingFlags,
    pub error_message: Option<String>,
    pub result_summary: Option<ResultSummary>,
}

impl SchedulingTask {
    pub fn new(task_id: String, batch_id: String, flags: SchedulingFlags) -> Self {
        Self {
            task_id,
            batch_id,
            status: TaskStatus::Pending,
            current_stage: "pending".to_string(),
            progress: 0,
            start_time: None,
            end_time: None,
            flags,
            error_message: None,
            result_summary: None,
        }
    }

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status: String = row.get("status")?;
        let result_summary: Option<String> = row.get("result_summary")?;
        let flags_json: String = row.get("flags")?;
        Ok(Self {
            task_id: row.get("task_id")?,
            batch_id: row.get("batch_id")?,
            status: TaskStatus::from_str(&status)?,
            current_stage: row.get("current_stage")?,
            progress: row.get::<_, i64>("progress")? as u8,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            flags: serde_json::from_str(&flags_json).map_err(|e| {
                rusqlite::Error::InvalidColumnType(0, e.to_string(), rusqlite::types::Type::Text)
            })?,
            error_message: row.get("error_message")?,
            result_summary: result_summary
                .map(|s| serde_json::from_str(&s))
                .transpose()
                .map_err(|e: serde_json::Error| {
                    rusqlite::Error::InvalidColumnType(0, e.to_string(), rusqlite::types::Type::Text)
                })?,
        })
    }
}

/// The fixed progress share each stage contributes, in percentage points (§4.9):
/// load/merge/split/correct/sync/write = 5/20/15/25/15/20.
pub const STAGE_PROGRESS_SHARES: [(&str, u8); 6] = [
    ("load", 5),
    ("merge", 20),
    ("split", 15),
    ("correction", 25),
    ("parallel_sync", 15),
    ("write", 20),
];

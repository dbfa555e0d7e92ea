use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// `{taskId, stage, step, level, message, data, durationMs}` (§3/§4.9/§4.11): one row
/// per structured log emission, persisted alongside the task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLogEntry {
    pub task_id: String,
    pub stage: String,
    pub step: String,
    pub level: LogLevel,
    pub message: String,
    pub data: Option<Value>,
    pub duration_ms: Option<i64>,
    pub logged_at: NaiveDateTime,
}

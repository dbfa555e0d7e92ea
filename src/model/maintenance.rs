use chrono::NaiveDateTime;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaintenanceStatus {
    Planned,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Planned => "PLANNED",
            MaintenanceStatus::Confirmed => "CONFIRMED",
            MaintenanceStatus::InProgress => "IN_PROGRESS",
            MaintenanceStatus::Completed => "COMPLETED",
            MaintenanceStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> rusqlite::Result<Self> {
        match s {
            "PLANNED" => Ok(MaintenanceStatus::Planned),
            "CONFIRMED" => Ok(MaintenanceStatus::Confirmed),
            "IN_PROGRESS" => Ok(MaintenanceStatus::InProgress),
            "COMPLETED" => Ok(MaintenanceStatus::Completed),
            "CANCELLED" => Ok(MaintenanceStatus::Cancelled),
            other => Err(rusqlite::Error::InvalidColumnType(
                0,
                format!("unknown maintenance status {other}"),
                rusqlite::types::Type::Text,
            )),
        }
    }

    /// Whether maintenance in this status actively blocks the machine (§3).
    pub fn blocks(&self) -> bool {
        matches!(
            self,
            MaintenanceStatus::Planned | MaintenanceStatus::Confirmed | MaintenanceStatus::InProgress
        )
    }
}

/// `{machineCode, start, end, status}` (§3). Any maintenance whose status blocks (see
/// [`MaintenanceStatus::blocks`]) excludes `[start, end)` from the machine's working
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub id: i64,
    pub machine_code: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: MaintenanceStatus,
}

impl MaintenanceWindow {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status: String = row.get("status")?;
        Ok(Self {
            id: row.get("id")?,
            machine_code: row.get("machine_code")?,
            start: row.get("start_time")?,
            end: row.get("end_time")?,
            status: MaintenanceStatus::from_str(&status)?,
        })
    }

    /// Strict half-open overlap test, used throughout the calendar (§4.2: "a work
    /// order may touch but not overlap a maintenance interval").
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.status.blocks() && start < self.end && self.start < end
    }
}

use chrono::NaiveDateTime;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Valid,
    Warning,
    Error,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Valid => "VALID",
            ValidationStatus::Warning => "WARNING",
            ValidationStatus::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> rusqlite::Result<Self> {
        match s {
            "VALID" => Ok(ValidationStatus::Valid),
            "WARNING" => Ok(ValidationStatus::Warning),
            "ERROR" => Ok(ValidationStatus::Error),
            other => Err(rusqlite::Error::InvalidColumnType(
                0,
                format!("unknown validation status {other}"),
                rusqlite::types::Type::Text,
            )),
        }
    }
}

/// One row of an imported decade plan (§3). `feeder_codes`/`maker_codes` are stored as
/// comma-joined machine codes in the `decade_rows` table and split back out on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecadeRow {
    pub id: i64,
    pub batch_id: String,
    pub work_order_nr: String,
    pub article_nr: String,
    pub package_type: String,
    pub spec: String,
    pub qty_total: f64,
    pub qty_final: f64,
    pub feeder_codes: Vec<String>,
    pub maker_codes: Vec<String>,
    pub planned_start: NaiveDateTime,
    pub planned_end: NaiveDateTime,
    pub row: i64,
    pub validation_status: ValidationStatus,
}

impl DecadeRow {
    /// Enforces the row invariants from §3: nonempty feeder/maker codes, a
    /// non-inverted planned interval, and a positive scheduling quantity.
    pub fn validate_invariants(&self) -> Result<()> {
        if self.feeder_codes.is_empty() {
            return Err(PipelineError::InvalidTopology(format!(
                "row {} has no feeder codes",
                self.row
            )));
        }
        if self.maker_codes.is_empty() {
            return Err(PipelineError::InvalidTopology(format!(
                "row {} has no maker codes",
                self.row
            )));
        }
        if self.planned_start > self.planned_end {
            return Err(PipelineError::InvalidTopology(format!(
                "row {} has plannedStart after plannedEnd",
                self.row
            )));
        }
        if self.qty_final <= 0.0 {
            return Err(PipelineError::InvalidTopology(format!(
                "row {} has non-positive qtyFinal",
                self.row
            )));
        }
        Ok(())
    }

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let feeder_codes: String = row.get("feeder_codes")?;
        let maker_codes: String = row.get("maker_codes")?;
        let validation_status: String = row.get("validation_status")?;
        Ok(Self {
            id: row.get("id")?,
            batch_id: row.get("batch_id")?,
            work_order_nr: row.get("work_order_nr")?,
            article_nr: row.get("article_nr")?,
            package_type: row.get("package_type")?,
            spec: row.get("spec")?,
            qty_total: row.get("qty_total")?,
            qty_final: row.get("qty_final")?,
            feeder_codes: split_codes(&feeder_codes),
            maker_codes: split_codes(&maker_codes),
            planned_start: row.get("planned_start")?,
            planned_end: row.get("planned_end")?,
            row: row.get("row_number")?,
            validation_status: ValidationStatus::from_str(&validation_status)?,
        })
    }
}

pub fn split_codes(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn join_codes(codes: &[String]) -> String {
    codes.join(",")
}

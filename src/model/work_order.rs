use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::model::decade_row::{join_codes, split_codes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Planned,
    Dispatched,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Planned => "PLANNED",
            OrderStatus::Dispatched => "DISPATCHED",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> rusqlite::Result<Self> {
        match s {
            "PLANNED" => Ok(OrderStatus::Planned),
            "DISPATCHED" => Ok(OrderStatus::Dispatched),
            "IN_PROGRESS" => Ok(OrderStatus::InProgress),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(rusqlite::Error::InvalidColumnType(
                0,
                format!("unknown order status {other}"),
                rusqlite::types::Type::Text,
            )),
        }
    }
}

/// Packer-machine work order (HJB), `planId` matching `^HJB[0-9]{9}$` (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackerOrder {
    pub plan_id: String,
    pub production_line: String,
    pub material_code: String,
    pub quantity: f64,
    pub plan_start: NaiveDateTime,
    pub plan_end: NaiveDateTime,
    pub sequence: i64,
    pub plan_date: NaiveDate,
    pub shift: String,
    pub input_plan_id: String,
    pub input_batch_code: String,
    pub task_id: String,
    pub status: OrderStatus,
}

impl PackerOrder {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status: String = row.get("status")?;
        Ok(Self {
            plan_id: row.get("plan_id")?,
            production_line: row.get("production_line")?,
            material_code: row.get("material_code")?,
            quantity: row.get("quantity")?,
            plan_start: row.get("plan_start")?,
            plan_end: row.get("plan_end")?,
            sequence: row.get("sequence")?,
            plan_date: row.get("plan_date")?,
            shift: row.get("shift")?,
            input_plan_id: row.get("input_plan_id")?,
            input_batch_code: row.get("input_batch_code")?,
            task_id: row.get("task_id")?,
            status: OrderStatus::from_str(&status)?,
        })
    }
}

/// Feeder-machine work order (HWS), `planId` matching `^HWS[0-9]{9}$` (§6).
/// `production_line` is the comma-joined set of packer codes this order serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeederOrder {
    pub plan_id: String,
    pub production_line: String,
    pub material_code: String,
    pub plan_start: NaiveDateTime,
    pub plan_end: NaiveDateTime,
    pub sequence: i64,
    pub plan_date: NaiveDate,
    pub shift: String,
    pub task_id: String,
    /// Reserved field (§9 open question): never computed or read by any stage.
    pub safety_stock: Option<f64>,
    pub is_last_one: Option<bool>,
}

impl FeederOrder {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            plan_id: row.get("plan_id")?,
            production_line: row.get("production_line")?,
            material_code: row.get("material_code")?,
            plan_start: row.get("plan_start")?,
            plan_end: row.get("plan_end")?,
            sequence: row.get("sequence")?,
            plan_date: row.get("plan_date")?,
            shift: row.get("shift")?,
            task_id: row.get("task_id")?,
            safety_stock: row.get("safety_stock")?,
            is_last_one: row.get::<_, Option<i64>>("is_last_one")?.map(|v| v != 0),
        })
    }

    pub fn packer_codes(&self) -> Vec<String> {
        split_codes(&self.production_line)
    }

    pub fn with_packer_codes(codes: &[String]) -> String {
        join_codes(codes)
    }
}

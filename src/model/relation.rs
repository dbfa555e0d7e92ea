use chrono::NaiveDate;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Defines the feeder↔packer topology; a feeder may relate to one or more packers
/// (§3). The ONE_TO_ONE / ONE_TO_MANY distinction is not stored per relation — it is
/// derived by counting how many packers a feeder relates to on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub feeder_code: String,
    pub maker_code: String,
    pub priority: i64,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl Relation {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            feeder_code: row.get("feeder_code")?,
            maker_code: row.get("maker_code")?,
            priority: row.get("priority")?,
            effective_from: row.get("effective_from")?,
            effective_to: row.get("effective_to")?,
        })
    }

    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        date >= self.effective_from && self.effective_to.map_or(true, |to| date <= to)
    }
}

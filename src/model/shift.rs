use chrono::{NaiveDate, NaiveTime};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::model::speed::WILDCARD;

/// `{shiftName, machineScope ("*" = all), startOfDay, endOfDay, mayOvertime,
/// maxOvertime, effective range}` (§3). Shifts define the working interval inside each
/// day. A machine-specific shift overrides `"*"` for that machine on that day (§4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftWindow {
    pub shift_name: String,
    pub machine_scope: String,
    pub start_of_day: NaiveTime,
    pub end_of_day: NaiveTime,
    pub may_overtime: bool,
    pub max_overtime_minutes: i64,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl ShiftWindow {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            shift_name: row.get("shift_name")?,
            machine_scope: row.get("machine_scope")?,
            start_of_day: row.get("start_of_day")?,
            end_of_day: row.get("end_of_day")?,
            may_overtime: row.get::<_, i64>("may_overtime")? != 0,
            max_overtime_minutes: row.get("max_overtime_minutes")?,
            effective_from: row.get("effective_from")?,
            effective_to: row.get("effective_to")?,
        })
    }

    pub fn applies_to(&self, machine: &str) -> bool {
        self.machine_scope == WILDCARD || self.machine_scope == machine
    }

    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        date >= self.effective_from && self.effective_to.map_or(true, |to| date <= to)
    }

    /// Selects, from candidate shifts for a machine on a date, the machine-specific
    /// ones if any exist, otherwise the `"*"`-scoped ones (§4.2).
    pub fn select_for<'a>(
        candidates: impl IntoIterator<Item = &'a ShiftWindow>,
        machine: &str,
        date: NaiveDate,
    ) -> Vec<&'a ShiftWindow> {
        let applicable: Vec<&ShiftWindow> = candidates
            .into_iter()
            .filter(|s| s.applies_to(machine) && s.is_effective_on(date))
            .collect();

        let specific: Vec<&ShiftWindow> = applicable
            .iter()
            .copied()
            .filter(|s| s.machine_scope != WILDCARD)
            .collect();

        if specific.is_empty() {
            applicable
        } else {
            specific
        }
    }
}

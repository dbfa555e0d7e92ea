//! Reference Store (C1, §4.1): a read-only, per-task snapshot of machines, feeder↔packer
//! relations, speeds, shifts, and maintenance windows, loaded once from the Storage Layer
//! at task start and answered from memory for the rest of the task — no further I/O.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;

use crate::error::{PipelineError, Result};
use crate::model::{Machine, MachineKind, MaintenanceWindow, Relation, ShiftWindow, Speed};

/// A frozen view of the reference data, built once per [`crate::orchestrator`] task run.
pub struct ReferenceSnapshot {
    machines: HashMap<String, Machine>,
    relations: Vec<Relation>,
    speeds: Vec<Speed>,
    shifts: Vec<ShiftWindow>,
    maintenance: Vec<MaintenanceWindow>,
}

impl ReferenceSnapshot {
    /// Loads the full reference data set from `conn` into memory (§4.1: "loads
    /// machines/relations/speeds/shifts/maintenance once per task ... into in-memory
    /// indexed maps").
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut machines = HashMap::new();
        let mut stmt = conn.prepare("SELECT code, kind, status FROM machines")?;
        let rows = stmt.query_map([], |row| Machine::from_row(row))?;
        for row in rows {
            let m = row?;
            machines.insert(m.code.clone(), m);
        }

        let mut stmt = conn
            .prepare("SELECT feeder_code, maker_code, priority, effective_from, effective_to FROM relations")?;
        let relations = stmt
            .query_map([], |row| Relation::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt =
            conn.prepare("SELECT machine_code, article_nr, boxes_per_hour, efficiency FROM speeds")?;
        let speeds = stmt
            .query_map([], |row| Speed::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT shift_name, machine_scope, start_of_day, end_of_day, may_overtime,
                    max_overtime_minutes, effective_from, effective_to
             FROM shift_windows",
        )?;
        let shifts = stmt
            .query_map([], |row| ShiftWindow::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn
            .prepare("SELECT id, machine_code, start_time, end_time, status FROM maintenance_windows")?;
        let maintenance = stmt
            .query_map([], |row| MaintenanceWindow::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Self {
            machines,
            relations,
            speeds,
            shifts,
            maintenance,
        })
    }

    pub fn machine(&self, code: &str) -> Option<&Machine> {
        self.machines.get(code)
    }

    pub fn machines_by_kind(&self, kind: MachineKind) -> Vec<&Machine> {
        self.machines.values().filter(|m| m.kind == kind).collect()
    }

    pub fn relations_for_feeder(&self, feeder_code: &str, on: NaiveDate) -> Vec<&Relation> {
        let mut rels: Vec<&Relation> = self
            .relations
            .iter()
            .filter(|r| r.feeder_code == feeder_code && r.is_effective_on(on))
            .collect();
        rels.sort_by_key(|r| (r.priority, r.maker_code.clone()));
        rels
    }

    pub fn feeders_for_packer(&self, packer_code: &str, on: NaiveDate) -> Vec<&Relation> {
        let mut rels: Vec<&Relation> = self
            .relations
            .iter()
            .filter(|r| r.maker_code == packer_code && r.is_effective_on(on))
            .collect();
        rels.sort_by_key(|r| (r.priority, r.feeder_code.clone()));
        rels
    }

    /// Resolves the effective production rate (boxes/hour) for `(machine, article)`
    /// using the resolution order in §3. Fails with `UNKNOWN_ARTICLE` if no candidate
    /// matches, even through wildcards.
    pub fn resolve_speed(&self, machine: &str, article: &str) -> Result<f64> {
        Speed::resolve(&self.speeds, machine, article)
            .map(Speed::effective_rate)
            .ok_or_else(|| {
                PipelineError::UnknownArticle(format!(
                    "no speed entry resolves for machine {machine} article {article}"
                ))
            })
    }

    /// Working-interval-of-day candidates for `machine` on `date` (§3/§4.2).
    pub fn shifts_for(&self, machine: &str, date: NaiveDate) -> Vec<(NaiveTime, NaiveTime, &ShiftWindow)> {
        ShiftWindow::select_for(&self.shifts, machine, date)
            .into_iter()
            .map(|s| (s.start_of_day, s.end_of_day, s))
            .collect()
    }

    pub fn maintenance_for(&self, machine: &str) -> Vec<&MaintenanceWindow> {
        self.maintenance.iter().filter(|m| m.machine_code == machine).collect()
    }

    pub fn require_machine(&self, code: &str) -> Result<&Machine> {
        self.machine(code)
            .ok_or_else(|| PipelineError::UnknownMachine(code.to_string()))
    }
}

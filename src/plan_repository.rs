//! Plan Repository (C3, §4.3): persists decade-plan rows by import batch and returns
//! validated rows ordered by `plannedStart`.

use rusqlite::Connection;

use crate::error::Result;
use crate::model::DecadeRow;

pub trait PlanRepository {
    fn load_batch(&self, batch_id: &str) -> Result<Vec<DecadeRow>>;
}

pub struct SqlitePlanRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqlitePlanRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> PlanRepository for SqlitePlanRepository<'a> {
    /// Returns only rows with validation status VALID or WARNING (ERROR rows are
    /// excluded), in `(plannedStart asc, row asc)` order — the canonical input order
    /// of the pipeline (§4.3).
    fn load_batch(&self, batch_id: &str) -> Result<Vec<DecadeRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, batch_id, work_order_nr, article_nr, package_type, spec, qty_total,
                    qty_final, feeder_codes, maker_codes, planned_start, planned_end, row_number,
                    validation_status
             FROM decade_rows
             WHERE batch_id = ?1 AND validation_status IN ('VALID', 'WARNING')
             ORDER BY planned_start ASC, row_number ASC",
        )?;
        let rows = stmt
            .query_map([batch_id], |row| DecadeRow::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

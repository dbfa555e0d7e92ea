//! Calendar Service (C2, §4.2): maps wall-clock intervals to working time, honoring
//! shift windows and maintenance. Naive (zone-less) `chrono::NaiveDateTime` throughout —
//! the factory does not observe DST.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{PipelineError, Result};
use crate::reference_store::ReferenceSnapshot;

pub struct Calendar<'a> {
    snapshot: &'a ReferenceSnapshot,
    horizon_days: i64,
}

impl<'a> Calendar<'a> {
    pub fn new(snapshot: &'a ReferenceSnapshot, horizon_days: i64) -> Self {
        Self { snapshot, horizon_days }
    }

    /// The subset of `[from, to)` that is inside a shift window and outside any active
    /// maintenance window for `machine`, as an ordered list of disjoint half-open
    /// intervals (§4.2).
    pub fn working_intervals(
        &self,
        machine: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        if from >= to {
            return Vec::new();
        }
        let master = self.master_intervals(machine, from.date(), to.date());
        master
            .into_iter()
            .filter_map(|(s, e)| {
                let s = s.max(from);
                let e = e.min(to);
                (s < e).then_some((s, e))
            })
            .collect()
    }

    /// Smallest `t ≥ anchor` such that the sum of working time on `machine` in
    /// `[anchor, t)` equals `duration_hours`. Fails with `NO_CAPACITY` if no such `t`
    /// exists within the configured horizon (§4.2).
    pub fn advance(&self, machine: &str, anchor: NaiveDateTime, duration_hours: f64) -> Result<NaiveDateTime> {
        if duration_hours <= 0.0 {
            return Ok(anchor);
        }

        let horizon_end = anchor + Duration::days(self.horizon_days);
        let master = self.master_intervals(machine, anchor.date(), horizon_end.date());

        let mut remaining_secs = duration_hours * 3600.0;
        for (start, end) in master {
            if end <= anchor {
                continue;
            }
            if start >= horizon_end {
                break;
            }
            let seg_start = start.max(anchor);
            let seg_end = end.min(horizon_end);
            if seg_end <= seg_start {
                continue;
            }
            let avail_secs = (seg_end - seg_start).num_seconds() as f64;
            if avail_secs >= remaining_secs {
                return Ok(seg_start + Duration::milliseconds((remaining_secs * 1000.0) as i64));
            }
            remaining_secs -= avail_secs;
        }

        Err(PipelineError::NoCapacity(format!(
            "machine {machine} has no capacity for {duration_hours}h within {} days of {anchor}",
            self.horizon_days
        )))
    }

    /// Inverse measurement: total working hours on `machine` within `[a, b)` (§4.2).
    pub fn working_hours_between(&self, machine: &str, a: NaiveDateTime, b: NaiveDateTime) -> f64 {
        self.working_intervals(machine, a, b)
            .iter()
            .map(|(s, e)| (*e - *s).num_seconds() as f64 / 3600.0)
            .sum()
    }

    /// The first working instant on `machine` at or after `anchor`.
    pub fn first_working_instant(&self, machine: &str, anchor: NaiveDateTime) -> Result<NaiveDateTime> {
        let horizon_end = anchor + Duration::days(self.horizon_days);
        self.master_intervals(machine, anchor.date(), horizon_end.date())
            .into_iter()
            .find(|(_, e)| *e > anchor)
            .map(|(s, e)| s.max(anchor).min(e))
            .ok_or_else(|| {
                PipelineError::NoCapacity(format!(
                    "machine {machine} has no working time within {} days of {anchor}",
                    self.horizon_days
                ))
            })
    }

    /// Builds the merged set of working intervals (shift windows minus maintenance)
    /// spanning `[from_date - 1, to_date]`, to catch overnight shifts that start the
    /// day before `from_date`.
    fn master_intervals(
        &self,
        machine: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        let mut raw = Vec::new();
        let mut d = from_date - Duration::days(1);
        while d <= to_date {
            raw.extend(self.day_intervals(machine, d));
            d += Duration::days(1);
        }
        raw.sort_by_key(|(s, _)| *s);
        merge_intervals(raw)
    }

    /// Working sub-intervals for one calendar date: shift windows (possibly spanning
    /// into the next day for overnight shifts) minus active maintenance.
    fn day_intervals(&self, machine: &str, date: NaiveDate) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        let mut intervals: Vec<(NaiveDateTime, NaiveDateTime)> = self
            .snapshot
            .shifts_for(machine, date)
            .into_iter()
            .map(|(start_of_day, end_of_day, _)| {
                let start = date.and_time(start_of_day);
                let end = if end_of_day <= start_of_day {
                    (date + Duration::days(1)).and_time(end_of_day)
                } else {
                    date.and_time(end_of_day)
                };
                (start, end)
            })
            .collect();

        intervals.sort_by_key(|(s, _)| *s);
        let intervals = merge_intervals(intervals);

        let blocks: Vec<(NaiveDateTime, NaiveDateTime)> = self
            .snapshot
            .maintenance_for(machine)
            .into_iter()
            .filter(|m| m.status.blocks())
            .map(|m| (m.start, m.end))
            .collect();

        intervals
            .into_iter()
            .flat_map(|iv| subtract_all(iv, &blocks))
            .collect()
    }
}

fn merge_intervals(
    sorted: Vec<(NaiveDateTime, NaiveDateTime)>,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut merged: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::new();
    for (start, end) in sorted {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

/// Subtracts every block in `blocks` from `interval`, returning the (possibly split,
/// possibly empty) remainder pieces.
fn subtract_all(
    interval: (NaiveDateTime, NaiveDateTime),
    blocks: &[(NaiveDateTime, NaiveDateTime)],
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let mut pieces = vec![interval];
    for block in blocks {
        pieces = pieces.into_iter().flat_map(|p| subtract_one(p, *block)).collect();
    }
    pieces.into_iter().filter(|(s, e)| s < e).collect()
}

fn subtract_one(
    interval: (NaiveDateTime, NaiveDateTime),
    block: (NaiveDateTime, NaiveDateTime),
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let (s, e) = interval;
    let (bs, be) = block;
    if be <= s || bs >= e {
        return vec![interval];
    }
    let mut out = Vec::new();
    if s < bs {
        out.push((s, bs));
    }
    if be < e {
        out.push((be, e));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup(conn: &Connection) {
        crate::db::schema::create_tables(conn).unwrap();
        conn.execute(
            "INSERT INTO machines (code, kind, status) VALUES ('P1', 'PACKER', 'active')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO shift_windows
                (shift_name, machine_scope, start_of_day, end_of_day, may_overtime, max_overtime_minutes, effective_from, effective_to)
             VALUES ('day', '*', '06:00:00', '22:00:00', 0, 0, '2025-01-01', NULL)",
            [],
        )
        .unwrap();
    }

    #[test]
    fn advance_consumes_working_hours_within_one_shift() {
        let conn = Connection::open_in_memory().unwrap();
        setup(&conn);
        let snapshot = ReferenceSnapshot::load(&conn).unwrap();
        let calendar = Calendar::new(&snapshot, 60);

        let anchor: NaiveDateTime = "2025-02-03T06:00:00".parse().unwrap();
        let result = calendar.advance("P1", anchor, 10.0).unwrap();
        assert_eq!(result, "2025-02-03T16:00:00".parse::<NaiveDateTime>().unwrap());
    }

    #[test]
    fn advance_rolls_to_next_day_shift() {
        let conn = Connection::open_in_memory().unwrap();
        setup(&conn);
        let snapshot = ReferenceSnapshot::load(&conn).unwrap();
        let calendar = Calendar::new(&snapshot, 60);

        let anchor: NaiveDateTime = "2025-02-03T20:00:00".parse().unwrap();
        let result = calendar.advance("P1", anchor, 4.0).unwrap();
        // 2h left in day 1 (20:00-22:00) + 2h on day 2 starting 06:00 -> 08:00
        assert_eq!(result, "2025-02-04T08:00:00".parse::<NaiveDateTime>().unwrap());
    }

    #[test]
    fn maintenance_window_is_excluded() {
        let conn = Connection::open_in_memory().unwrap();
        setup(&conn);
        conn.execute(
            "INSERT INTO maintenance_windows (machine_code, start_time, end_time, status)
             VALUES ('P1', '2025-02-03T08:00:00', '2025-02-03T10:00:00', 'CONFIRMED')",
            [],
        )
        .unwrap();
        let snapshot = ReferenceSnapshot::load(&conn).unwrap();
        let calendar = Calendar::new(&snapshot, 60);

        let hours = calendar.working_hours_between(
            "P1",
            "2025-02-03T06:00:00".parse().unwrap(),
            "2025-02-03T12:00:00".parse().unwrap(),
        );
        assert_eq!(hours, 4.0);
    }
}

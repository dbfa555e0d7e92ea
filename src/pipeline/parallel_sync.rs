//! Parallel Synchronizer (C7, §4.7): enforces same-start/same-end across packers that
//! share one feeder, and serializes non-sibling orders contending for the same feeder.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::calendar::Calendar;
use crate::error::Result;
use crate::model::LogicalOrder;
use crate::reference_store::ReferenceSnapshot;

/// Synchronizes sibling groups (sharing a `sync_group_id`, or a singleton group of
/// one) onto a common `[groupStart, groupEnd]`, then serializes non-sibling groups
/// that contend for the same feeder (§4.7). A no-op when `enabled` is false.
pub fn parallel_sync(
    mut orders: Vec<LogicalOrder>,
    snapshot: &ReferenceSnapshot,
    calendar: &Calendar,
    enabled: bool,
) -> Result<Vec<LogicalOrder>> {
    if !enabled {
        return Ok(orders);
    }

    let mut group_of: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, order) in orders.iter().enumerate() {
        let key = order.sync_group_id.clone().unwrap_or_else(|| order.id.clone());
        group_of.entry(key).or_default().push(i);
    }

    let mut groups: Vec<Vec<usize>> = group_of.into_values().collect();
    groups.sort_by_key(|idxs| idxs.iter().map(|&i| orders[i].target_start).min().unwrap());

    let mut feeder_busy: HashMap<String, NaiveDateTime> = HashMap::new();

    for idxs in groups {
        let feeder = orders[idxs[0]].feeder.clone();
        let mut group_start = idxs.iter().map(|&i| orders[i].target_start).min().unwrap();

        if let Some(&busy_until) = feeder_busy.get(&feeder) {
            group_start = group_start.max(busy_until);
        }

        let mut group_end = idxs.iter().map(|&i| orders[i].target_end).max().unwrap().max(group_start);

        loop {
            let mut extended = false;
            for &i in &idxs {
                let packer = orders[i].single_packer().to_string();
                let rate = snapshot.resolve_speed(&packer, &orders[i].article_nr)?;
                let needed_hours = orders[i].qty / rate;
                let available_hours = calendar.working_hours_between(&packer, group_start, group_end);
                if available_hours + 1e-9 < needed_hours {
                    let candidate_end = calendar.advance(&packer, group_start, needed_hours)?;
                    if candidate_end > group_end {
                        group_end = candidate_end;
                        extended = true;
                    }
                }
            }
            if !extended {
                break;
            }
        }

        for &i in &idxs {
            orders[i].target_start = group_start;
            orders[i].target_end = group_end;
        }

        feeder_busy.insert(feeder, group_end);
    }

    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup(conn: &Connection) {
        crate::db::schema::create_tables(conn).unwrap();
        conn.execute(
            "INSERT INTO machines (code, kind, status) VALUES
                ('P1', 'PACKER', 'active'), ('P2', 'PACKER', 'active'), ('F1', 'FEEDER', 'active')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO shift_windows
                (shift_name, machine_scope, start_of_day, end_of_day, may_overtime, max_overtime_minutes, effective_from, effective_to)
             VALUES ('day', '*', '00:00:00', '23:59:59', 0, 0, '2025-01-01', NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO speeds (machine_code, article_nr, boxes_per_hour, efficiency) VALUES
                ('P1', 'A', 10.0, 1.0), ('P2', 'A', 5.0, 1.0)",
            [],
        )
        .unwrap();
    }

    fn order(id_suffix: &str, packer: &str, qty: f64, start: &str, end: &str, sync_group: Option<&str>) -> LogicalOrder {
        LogicalOrder {
            id: format!("lo-{id_suffix}"),
            article_nr: "A".into(),
            qty,
            packers: vec![packer.to_string()],
            feeder: "F1".into(),
            target_start: start.parse().unwrap(),
            target_end: end.parse().unwrap(),
            provenance: vec![1],
            sync_group_id: sync_group.map(|s| s.to_string()),
        }
    }

    #[test]
    fn sibling_group_converges_to_slower_packer() {
        let conn = Connection::open_in_memory().unwrap();
        setup(&conn);
        let snapshot = ReferenceSnapshot::load(&conn).unwrap();
        let calendar = Calendar::new(&snapshot, 60);

        let orders = vec![
            order("p1", "P1", 50.0, "2025-02-01T00:00:00", "2025-02-01T05:00:00", Some("parent")),
            order("p2", "P2", 50.0, "2025-02-01T00:00:00", "2025-02-01T10:00:00", Some("parent")),
        ];
        let synced = parallel_sync(orders, &snapshot, &calendar, true).unwrap();
        assert_eq!(synced[0].target_start, synced[1].target_start);
        assert_eq!(synced[0].target_end, synced[1].target_end);
        assert_eq!(synced[0].target_end, "2025-02-01T10:00:00".parse::<chrono::NaiveDateTime>().unwrap());
    }

    #[test]
    fn disabled_sync_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        setup(&conn);
        let snapshot = ReferenceSnapshot::load(&conn).unwrap();
        let calendar = Calendar::new(&snapshot, 60);

        let orders = vec![order(
            "p1",
            "P1",
            50.0,
            "2025-02-01T00:00:00",
            "2025-02-01T05:00:00",
            None,
        )];
        let synced = parallel_sync(orders.clone(), &snapshot, &calendar, false).unwrap();
        assert_eq!(synced[0].target_end, orders[0].target_end);
    }
}

//! Time Corrector (C6, §4.6): recomputes start/end times from quantity÷speed,
//! honoring calendar and maintenance.

use std::collections::HashMap;

use chrono::Duration;

use crate::calendar::Calendar;
use crate::error::Result;
use crate::model::LogicalOrder;
use crate::reference_store::ReferenceSnapshot;

/// Recomputes `target_start`/`target_end` for every order in `orders`, in input order,
/// serializing overlapping orders on the same packer with the configured minimum gap
/// (§4.6). A no-op copy when `correction_enabled` is false.
pub fn correct_times(
    orders: Vec<LogicalOrder>,
    snapshot: &ReferenceSnapshot,
    calendar: &Calendar,
    correction_enabled: bool,
    min_gap: Duration,
) -> Result<Vec<LogicalOrder>> {
    if !correction_enabled {
        return Ok(orders);
    }

    let mut busy_until: HashMap<String, chrono::NaiveDateTime> = HashMap::new();
    let mut out = Vec::with_capacity(orders.len());

    for mut order in orders {
        let packer = order.single_packer().to_string();
        let rate = snapshot.resolve_speed(&packer, &order.article_nr)?;
        let hours = order.qty / rate;

        let earliest = calendar.first_working_instant(&packer, order.target_start)?;
        let mut new_start = order.target_start.max(earliest);

        if let Some(&available_at) = busy_until.get(&packer) {
            let min_start = available_at + min_gap;
            if new_start < min_start {
                new_start = min_start;
            }
        }

        let mut new_end = calendar.advance(&packer, new_start, hours)?;

        // Step 4: shift past any overlapping feeder maintenance, bounded to avoid
        // looping forever on pathological reference data.
        for _ in 0..8 {
            let blocked = snapshot
                .maintenance_for(&order.feeder)
                .into_iter()
                .find(|m| m.overlaps(new_start, new_end));
            match blocked {
                Some(window) => {
                    new_start = calendar.first_working_instant(&order.feeder, window.end)?;
                    new_end = calendar.advance(&packer, new_start, hours)?;
                }
                None => break,
            }
        }

        busy_until.insert(packer, new_end);
        order.target_start = new_start;
        order.target_end = new_end;
        out.push(order);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup(conn: &Connection) {
        crate::db::schema::create_tables(conn).unwrap();
        conn.execute(
            "INSERT INTO machines (code, kind, status) VALUES ('P1', 'PACKER', 'active'), ('F1', 'FEEDER', 'active')",
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
            "INSERT INTO speeds (machine_code, article_nr, boxes_per_hour, efficiency) VALUES ('P1', 'A', 10.0, 1.0)",
            [],
        )
        .unwrap();
    }

    fn order(packer: &str, feeder: &str, qty: f64, start: &str) -> LogicalOrder {
        LogicalOrder {
            id: LogicalOrder::new_id(),
            article_nr: "A".into(),
            qty,
            packers: vec![packer.to_string()],
            feeder: feeder.to_string(),
            target_start: start.parse().unwrap(),
            target_end: start.parse().unwrap(),
            provenance: vec![1],
            sync_group_id: None,
        }
    }

    #[test]
    fn computes_duration_from_qty_over_speed() {
        let conn = Connection::open_in_memory().unwrap();
        setup(&conn);
        let snapshot = ReferenceSnapshot::load(&conn).unwrap();
        let calendar = Calendar::new(&snapshot, 60);

        let orders = vec![order("P1", "F1", 100.0, "2025-02-01T00:00:00")];
        let corrected = correct_times(orders, &snapshot, &calendar, true, Duration::minutes(15)).unwrap();
        assert_eq!(corrected[0].target_end - corrected[0].target_start, Duration::hours(10));
    }

    #[test]
    fn serializes_overlapping_orders_on_same_packer() {
        let conn = Connection::open_in_memory().unwrap();
        setup(&conn);
        let snapshot = ReferenceSnapshot::load(&conn).unwrap();
        let calendar = Calendar::new(&snapshot, 60);

        let orders = vec![
            order("P1", "F1", 100.0, "2025-02-01T00:00:00"),
            order("P1", "F1", 50.0, "2025-02-01T00:00:00"),
        ];
        let corrected = correct_times(orders, &snapshot, &calendar, true, Duration::minutes(15)).unwrap();
        assert!(corrected[1].target_start >= corrected[0].target_end + Duration::minutes(15));
    }

    #[test]
    fn pushes_past_feeder_maintenance() {
        let conn = Connection::open_in_memory().unwrap();
        setup(&conn);
        conn.execute(
            "INSERT INTO maintenance_windows (machine_code, start_time, end_time, status)
             VALUES ('F1', '2025-02-01T02:00:00', '2025-02-01T04:00:00', 'CONFIRMED')",
            [],
        )
        .unwrap();
        let snapshot = ReferenceSnapshot::load(&conn).unwrap();
        let calendar = Calendar::new(&snapshot, 60);

        // P1 runs 100 boxes at 10/h, so the uncorrected window is 00:00-10:00,
        // straight through F1's 02:00-04:00 maintenance.
        let orders = vec![order("P1", "F1", 100.0, "2025-02-01T00:00:00")];
        let corrected = correct_times(orders, &snapshot, &calendar, true, Duration::minutes(15)).unwrap();

        let window_end: chrono::NaiveDateTime = "2025-02-01T04:00:00".parse().unwrap();
        assert!(corrected[0].target_start >= window_end);
        assert_eq!(corrected[0].target_end - corrected[0].target_start, Duration::hours(10));
    }

    #[test]
    fn disabled_correction_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        setup(&conn);
        let snapshot = ReferenceSnapshot::load(&conn).unwrap();
        let calendar = Calendar::new(&snapshot, 60);

        let mut o = order("P1", "F1", 100.0, "2025-02-01T00:00:00");
        o.target_end = "2025-02-01T05:00:00".parse().unwrap();
        let orders = vec![o.clone()];
        let corrected = correct_times(orders, &snapshot, &calendar, false, Duration::minutes(15)).unwrap();
        assert_eq!(corrected[0].target_end, o.target_end);
    }
}

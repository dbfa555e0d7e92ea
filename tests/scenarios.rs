//! End-to-end scenario tests driving the full pipeline through the orchestrator
//! against an in-memory database, one test per named scenario.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use aps_engine::db::initialize_in_memory;
use aps_engine::model::{SchedulingFlags, TaskStatus};
use aps_engine::{Orchestrator, PipelineConfig};
use chrono::Duration;
use rusqlite::{params, Connection};

async fn run_to_completion(orchestrator: &Orchestrator, task_id: &str) -> TaskStatus {
    for _ in 0..200 {
        let task = orchestrator.get_task(task_id).unwrap();
        if task.status.is_terminal() {
            return task.status;
        }
        tokio::time::sleep(StdDuration::from_millis(5)).await;
    }
    panic!("task {task_id} did not reach a terminal status in time");
}

fn insert_machine(conn: &Connection, code: &str, kind: &str) {
    conn.execute(
        "INSERT INTO machines (code, kind, status) VALUES (?1, ?2, 'active')",
        params![code, kind],
    )
    .unwrap();
}

fn insert_shift(conn: &Connection, start_of_day: &str, end_of_day: &str) {
    conn.execute(
        "INSERT INTO shift_windows
            (shift_name, machine_scope, start_of_day, end_of_day, may_overtime,
             max_overtime_minutes, effective_from, effective_to)
         VALUES ('shift', '*', ?1, ?2, 0, 0, '2025-01-01', NULL)",
        params![start_of_day, end_of_day],
    )
    .unwrap();
}

fn insert_speed(conn: &Connection, machine: &str, article: &str, boxes_per_hour: f64) {
    conn.execute(
        "INSERT INTO speeds (machine_code, article_nr, boxes_per_hour, efficiency)
         VALUES (?1, ?2, ?3, 1.0)",
        params![machine, article, boxes_per_hour],
    )
    .unwrap();
}

fn insert_maintenance(conn: &Connection, machine: &str, start: &str, end: &str) {
    conn.execute(
        "INSERT INTO maintenance_windows (machine_code, start_time, end_time, status)
         VALUES (?1, ?2, ?3, 'CONFIRMED')",
        params![machine, start, end],
    )
    .unwrap();
}

#[allow(clippy::too_many_arguments)]
fn insert_row(
    conn: &Connection,
    batch_id: &str,
    row_number: i64,
    article: &str,
    feeders: &str,
    makers: &str,
    qty: f64,
    start: &str,
    end: &str,
) {
    conn.execute(
        "INSERT INTO decade_rows
            (batch_id, work_order_nr, article_nr, package_type, spec, qty_total, qty_final,
             feeder_codes, maker_codes, planned_start, planned_end, row_number, validation_status)
         VALUES (?1, ?2, ?3, 'pack', '', ?4, ?4, ?5, ?6, ?7, ?8, ?9, 'VALID')",
        params![
            batch_id,
            format!("WO{row_number}"),
            article,
            qty,
            feeders,
            makers,
            start,
            end,
            row_number
        ],
    )
    .unwrap();
}

fn packer_orders_for(conn: &Connection, task_id: &str) -> Vec<aps_engine::model::PackerOrder> {
    let mut stmt = conn
        .prepare(
            "SELECT plan_id, production_line, material_code, quantity, plan_start, plan_end,
                    sequence, plan_date, shift, input_plan_id, input_batch_code, task_id, status
             FROM packer_orders WHERE task_id = ?1 ORDER BY production_line",
        )
        .unwrap();
    stmt.query_map(params![task_id], |row| aps_engine::model::PackerOrder::from_row(row))
        .unwrap()
        .collect::<rusqlite::Result<Vec<_>>>()
        .unwrap()
}

fn feeder_orders_for(conn: &Connection, task_id: &str) -> Vec<aps_engine::model::FeederOrder> {
    let mut stmt = conn
        .prepare(
            "SELECT plan_id, production_line, material_code, plan_start, plan_end, sequence,
                    plan_date, shift, task_id, safety_stock, is_last_one
             FROM feeder_orders WHERE task_id = ?1",
        )
        .unwrap();
    stmt.query_map(params![task_id], |row| aps_engine::model::FeederOrder::from_row(row))
        .unwrap()
        .collect::<rusqlite::Result<Vec<_>>>()
        .unwrap()
}

/// S1: one-to-one row, two shifts totaling 16h/day, 10 boxes/h -> one HJB of qty 100
/// spanning exactly 10 working hours, one referencing HWS.
#[tokio::test]
async fn s1_one_to_one_order_spans_ten_working_hours() {
    let db = Arc::new(initialize_in_memory().unwrap());
    {
        let conn = db.conn.lock();
        insert_machine(&conn, "P1", "PACKER");
        insert_machine(&conn, "F1", "FEEDER");
        insert_shift(&conn, "06:00:00", "14:00:00");
        insert_shift(&conn, "14:00:00", "22:00:00");
        insert_speed(&conn, "P1", "A", 10.0);
        insert_row(&conn, "B1", 1, "A", "F1", "P1", 100.0, "2025-02-01T00:00:00", "2025-02-02T00:00:00");
    }

    let orchestrator = Orchestrator::new(db.clone(), PipelineConfig::default());
    let task_id = orchestrator.start_task("B1", SchedulingFlags::default(), false).await.unwrap();
    assert_eq!(run_to_completion(&orchestrator, &task_id).await, TaskStatus::Completed);

    let conn = db.conn.lock();
    let packers = packer_orders_for(&conn, &task_id);
    assert_eq!(packers.len(), 1);
    assert_eq!(packers[0].quantity, 100.0);
    assert_eq!(packers[0].plan_end - packers[0].plan_start, Duration::hours(10));

    let feeders = feeder_orders_for(&conn, &task_id);
    assert_eq!(feeders.len(), 1);
    assert!(feeders[0].packer_codes().contains(&"P1".to_string()));
}

/// S2: two rows with identical (month, article, packer-set, feeder-set) merge into
/// one HJB with the combined quantity.
#[tokio::test]
async fn s2_matching_rows_merge_into_one_order() {
    let db = Arc::new(initialize_in_memory().unwrap());
    {
        let conn = db.conn.lock();
        insert_machine(&conn, "P1", "PACKER");
        insert_machine(&conn, "F1", "FEEDER");
        insert_shift(&conn, "00:00:00", "23:59:59");
        insert_speed(&conn, "P1", "A", 10.0);
        insert_row(&conn, "B1", 1, "A", "F1", "P1", 40.0, "2025-02-01T00:00:00", "2025-02-01T04:00:00");
        insert_row(&conn, "B1", 2, "A", "F1", "P1", 60.0, "2025-02-05T00:00:00", "2025-02-05T06:00:00");
    }

    let orchestrator = Orchestrator::new(db.clone(), PipelineConfig::default());
    let task_id = orchestrator.start_task("B1", SchedulingFlags::default(), false).await.unwrap();
    assert_eq!(run_to_completion(&orchestrator, &task_id).await, TaskStatus::Completed);

    let conn = db.conn.lock();
    let packers = packer_orders_for(&conn, &task_id);
    assert_eq!(packers.len(), 1);
    assert_eq!(packers[0].quantity, 100.0);
}

/// S3: a two-packer row splits into an HJB per packer, evenly when the quantity
/// divides cleanly, both referencing the same HWS.
#[tokio::test]
async fn s3_even_split_across_two_packers() {
    let db = Arc::new(initialize_in_memory().unwrap());
    {
        let conn = db.conn.lock();
        insert_machine(&conn, "P1", "PACKER");
        insert_machine(&conn, "P2", "PACKER");
        insert_machine(&conn, "F1", "FEEDER");
        insert_shift(&conn, "00:00:00", "23:59:59");
        insert_speed(&conn, "P1", "A", 10.0);
        insert_speed(&conn, "P2", "A", 10.0);
        insert_row(&conn, "B1", 1, "A", "F1", "P1,P2", 100.0, "2025-02-01T00:00:00", "2025-02-02T00:00:00");
    }

    let orchestrator = Orchestrator::new(db.clone(), PipelineConfig::default());
    let task_id = orchestrator.start_task("B1", SchedulingFlags::default(), false).await.unwrap();
    assert_eq!(run_to_completion(&orchestrator, &task_id).await, TaskStatus::Completed);

    let conn = db.conn.lock();
    let packers = packer_orders_for(&conn, &task_id);
    assert_eq!(packers.len(), 2);
    assert_eq!(packers[0].production_line, "P1");
    assert_eq!(packers[0].quantity, 50.0);
    assert_eq!(packers[1].production_line, "P2");
    assert_eq!(packers[1].quantity, 50.0);

    let feeders = feeder_orders_for(&conn, &task_id);
    assert_eq!(feeders.len(), 1);
}

/// S4: a split with an odd quantity sends the remainder unit to the
/// lexicographically-first packer.
#[tokio::test]
async fn s4_split_remainder_goes_to_first_packer() {
    let db = Arc::new(initialize_in_memory().unwrap());
    {
        let conn = db.conn.lock();
        insert_machine(&conn, "P1", "PACKER");
        insert_machine(&conn, "P2", "PACKER");
        insert_machine(&conn, "F1", "FEEDER");
        insert_shift(&conn, "00:00:00", "23:59:59");
        insert_speed(&conn, "P1", "A", 10.0);
        insert_speed(&conn, "P2", "A", 10.0);
        insert_row(&conn, "B1", 1, "A", "F1", "P1,P2", 101.0, "2025-02-01T00:00:00", "2025-02-02T00:00:00");
    }

    let orchestrator = Orchestrator::new(db.clone(), PipelineConfig::default());
    let task_id = orchestrator.start_task("B1", SchedulingFlags::default(), false).await.unwrap();
    assert_eq!(run_to_completion(&orchestrator, &task_id).await, TaskStatus::Completed);

    let conn = db.conn.lock();
    let packers = packer_orders_for(&conn, &task_id);
    assert_eq!(packers.len(), 2);
    assert_eq!(packers[0].production_line, "P1");
    assert_eq!(packers[0].quantity, 51.0);
    assert_eq!(packers[1].production_line, "P2");
    assert_eq!(packers[1].quantity, 50.0);
}

/// S5: after splitting, packers of unequal speed sharing one feeder converge onto
/// the same `[planStart, planEnd]`, driven by the slower packer.
#[tokio::test]
async fn s5_split_siblings_synchronize_on_slower_packer() {
    let db = Arc::new(initialize_in_memory().unwrap());
    {
        let conn = db.conn.lock();
        insert_machine(&conn, "P1", "PACKER");
        insert_machine(&conn, "P2", "PACKER");
        insert_machine(&conn, "F1", "FEEDER");
        insert_shift(&conn, "00:00:00", "23:59:59");
        insert_speed(&conn, "P1", "A", 10.0);
        insert_speed(&conn, "P2", "A", 5.0);
        insert_row(&conn, "B1", 1, "A", "F1", "P1,P2", 100.0, "2025-02-01T00:00:00", "2025-02-02T00:00:00");
    }

    let orchestrator = Orchestrator::new(db.clone(), PipelineConfig::default());
    let task_id = orchestrator.start_task("B1", SchedulingFlags::default(), false).await.unwrap();
    assert_eq!(run_to_completion(&orchestrator, &task_id).await, TaskStatus::Completed);

    let conn = db.conn.lock();
    let packers = packer_orders_for(&conn, &task_id);
    assert_eq!(packers.len(), 2);
    assert_eq!(packers[0].plan_start, packers[1].plan_start);
    assert_eq!(packers[0].plan_end, packers[1].plan_end);
    // P2 needs 50/5 = 10h, the bottleneck; P1 only needs 50/10 = 5h.
    assert_eq!(packers[0].plan_end - packers[0].plan_start, Duration::hours(10));

    let feeders = feeder_orders_for(&conn, &task_id);
    assert_eq!(feeders.len(), 1);
    assert_eq!(feeders[0].plan_start, packers[0].plan_start);
    assert_eq!(feeders[0].plan_end, packers[0].plan_end);
}

/// S6: a maintenance window overlapping a row's natural placement pushes the HJB's
/// start past the window and its end forward by the same working-time shortfall.
#[tokio::test]
async fn s6_maintenance_window_pushes_order_past_it() {
    let db = Arc::new(initialize_in_memory().unwrap());
    {
        let conn = db.conn.lock();
        insert_machine(&conn, "P1", "PACKER");
        insert_machine(&conn, "F1", "FEEDER");
        insert_shift(&conn, "00:00:00", "23:59:59");
        insert_speed(&conn, "P1", "A", 10.0);
        insert_maintenance(&conn, "P1", "2025-02-01T08:00:00", "2025-02-01T10:00:00");
        // 50 boxes at 10/h = 5 working hours; naturally 08:00-13:00 without maintenance.
        insert_row(&conn, "B1", 1, "A", "F1", "P1", 50.0, "2025-02-01T08:00:00", "2025-02-01T13:00:00");
    }

    let orchestrator = Orchestrator::new(db.clone(), PipelineConfig::default());
    let task_id = orchestrator.start_task("B1", SchedulingFlags::default(), false).await.unwrap();
    assert_eq!(run_to_completion(&orchestrator, &task_id).await, TaskStatus::Completed);

    let conn = db.conn.lock();
    let packers = packer_orders_for(&conn, &task_id);
    assert_eq!(packers.len(), 1);
    assert_eq!(packers[0].plan_start, "2025-02-01T10:00:00".parse::<chrono::NaiveDateTime>().unwrap());
    assert_eq!(packers[0].plan_end, "2025-02-01T15:00:00".parse::<chrono::NaiveDateTime>().unwrap());
}

/// S7: cancelling a task before the Writer runs leaves no partial packer/feeder
/// orders under that task's id.
#[tokio::test]
async fn s7_cancelled_task_leaves_no_partial_outputs() {
    let db = Arc::new(initialize_in_memory().unwrap());
    {
        let conn = db.conn.lock();
        insert_machine(&conn, "P1", "PACKER");
        insert_machine(&conn, "F1", "FEEDER");
        insert_shift(&conn, "00:00:00", "23:59:59");
        insert_speed(&conn, "P1", "A", 10.0);
        insert_row(&conn, "B1", 1, "A", "F1", "P1", 100.0, "2025-02-01T00:00:00", "2025-02-02T00:00:00");
    }

    let orchestrator = Orchestrator::new(db.clone(), PipelineConfig::default());
    let task_id = orchestrator.start_task("B1", SchedulingFlags::default(), false).await.unwrap();
    // No `.await` has happened yet since `start_task` returned, so the spawned
    // pipeline task has not been polled even once: this cancellation is guaranteed
    // to land before the first stage runs.
    orchestrator.cancel_task(&task_id).unwrap();

    assert_eq!(run_to_completion(&orchestrator, &task_id).await, TaskStatus::Cancelled);

    let conn = db.conn.lock();
    assert!(packer_orders_for(&conn, &task_id).is_empty());
    assert!(feeder_orders_for(&conn, &task_id).is_empty());
}

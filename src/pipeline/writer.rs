//! Work-Order Writer (C8, §4.8): assigns per-day monotonic sequence numbers and emits
//! HJB packer orders and HWS feeder orders, retrying transient persistence failures
//! with jittered backoff.

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::config::PipelineConfig;
use crate::db::Database;
use crate::error::{PipelineError, Result};
use crate::model::{join_codes, FeederOrder, LogicalOrder, OrderKind, OrderStatus, PackerOrder};
use crate::reference_store::ReferenceSnapshot;

pub struct WriteResult {
    pub packer_orders: Vec<PackerOrder>,
    pub feeder_orders: Vec<FeederOrder>,
}

pub struct Writer<'a> {
    db: &'a Database,
    config: &'a PipelineConfig,
}

impl<'a> Writer<'a> {
    pub fn new(db: &'a Database, config: &'a PipelineConfig) -> Self {
        Self { db, config }
    }

    /// Writes every final `LogicalOrder` as one HJB packer order, grouping siblings
    /// (same `sync_group_id`, or a singleton group of one) into a shared HWS feeder
    /// order (§4.8).
    pub async fn write(
        &mut self,
        orders: &[LogicalOrder],
        snapshot: &ReferenceSnapshot,
        task_id: &str,
        batch_id: &str,
    ) -> Result<WriteResult> {
        let mut groups: HashMap<String, Vec<&LogicalOrder>> = HashMap::new();
        for order in orders {
            let key = order.sync_group_id.clone().unwrap_or_else(|| order.id.clone());
            groups.entry(key).or_default().push(order);
        }

        let mut group_list: Vec<Vec<&LogicalOrder>> = groups.into_values().collect();
        group_list.sort_by_key(|members| members.iter().map(|o| o.target_start).min().unwrap());

        let mut packer_orders = Vec::new();
        // (FeederOrder, feeder machine code) — the feeder code drives per-machine
        // sequencing but isn't a persisted column on `feeder_orders` (§3).
        let mut feeder_orders: Vec<(FeederOrder, String)> = Vec::new();

        for members in group_list {
            let feeder = members[0].feeder.clone();
            let article = members[0].article_nr.clone();
            let group_start = members.iter().map(|o| o.target_start).min().unwrap();
            let group_end = members.iter().map(|o| o.target_end).max().unwrap();

            let mut packer_codes: Vec<String> = members.iter().map(|o| o.single_packer().to_string()).collect();
            packer_codes.sort();
            packer_codes.dedup();

            let feeder_seq = self
                .persist_with_retry(|tx| allocate_sequence(tx, OrderKind::Hws, group_start.date(), 1))
                .await?;
            let feeder_plan_id = OrderKind::Hws.format_plan_id(feeder_seq);
            let feeder_shift = resolve_shift_name(snapshot, &feeder, group_start)?;

            for order in &members {
                let packer = order.single_packer().to_string();
                let packer_seq = self
                    .persist_with_retry(|tx| allocate_sequence(tx, OrderKind::Hjb, order.target_start.date(), 1))
                    .await?;
                let packer_plan_id = OrderKind::Hjb.format_plan_id(packer_seq);
                let shift = resolve_shift_name(snapshot, &packer, order.target_start)?;

                packer_orders.push(PackerOrder {
                    plan_id: packer_plan_id,
                    production_line: packer,
                    material_code: order.article_nr.clone(),
                    quantity: order.qty,
                    plan_start: order.target_start,
                    plan_end: order.target_end,
                    sequence: 0,
                    plan_date: order.target_start.date(),
                    shift,
                    input_plan_id: feeder_plan_id.clone(),
                    input_batch_code: batch_id.to_string(),
                    task_id: task_id.to_string(),
                    status: OrderStatus::Planned,
                });
            }

            feeder_orders.push((
                FeederOrder {
                    plan_id: feeder_plan_id,
                    production_line: join_codes(&packer_codes),
                    material_code: article,
                    plan_start: group_start,
                    plan_end: group_end,
                    sequence: 0,
                    plan_date: group_start.date(),
                    shift: feeder_shift,
                    task_id: task_id.to_string(),
                    safety_stock: None,
                    is_last_one: None,
                },
                feeder,
            ));
        }

        assign_sequences(&mut packer_orders, |o| o.production_line.clone(), |o| o.plan_date, |o| o.plan_start, |o| o.plan_id.clone(), |o, s| o.sequence = s);

        let mut feeder_only: Vec<FeederOrder> = feeder_orders.iter().map(|(f, _)| f.clone()).collect();
        let feeder_machine: Vec<String> = feeder_orders.iter().map(|(_, m)| m.clone()).collect();
        assign_sequences_with_key(
            &mut feeder_only,
            &feeder_machine,
            |o| o.plan_date,
            |o| o.plan_start,
            |o| o.plan_id.clone(),
            |o, s| o.sequence = s,
        );

        for order in &packer_orders {
            self.persist_with_retry(|tx| insert_packer_order(tx, order)).await?;
        }
        for order in &feeder_only {
            self.persist_with_retry(|tx| insert_feeder_order(tx, order)).await?;
        }

        Ok(WriteResult {
            packer_orders,
            feeder_orders: feeder_only,
        })
    }

    /// Retries a transactional write up to `max_persistence_retries` times with
    /// jittered exponential backoff (§7): base delay, doubling per attempt, capped at
    /// the configured retry count. Each attempt locks the connection only for the
    /// transaction itself — the backoff sleep runs on the async runtime's timer, not
    /// a blocked worker thread, so other tasks' pipelines keep running concurrently.
    async fn persist_with_retry<T>(
        &self,
        f: impl Fn(&rusqlite::Transaction) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            let outcome = {
                let mut conn = self.db.conn.lock();
                (|| -> rusqlite::Result<T> {
                    let tx = conn.transaction()?;
                    let value = f(&tx)?;
                    tx.commit()?;
                    Ok(value)
                })()
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < self.config.max_persistence_retries => {
                    attempt += 1;
                    let backoff_ms = self.config.retry_base_delay_ms * 2u64.pow(attempt - 1);
                    let jitter_ms = rand::thread_rng().gen_range(0..=backoff_ms / 2 + 1);
                    tokio::time::sleep(StdDuration::from_millis(backoff_ms + jitter_ms)).await;
                    tracing::warn!(attempt, error = %e, "retrying persistence operation");
                }
                Err(e) => {
                    return Err(PipelineError::PersistenceFailed(format!(
                        "failed after {} attempts: {e}",
                        attempt + 1
                    )))
                }
            }
        }
    }
}

fn allocate_sequence(tx: &rusqlite::Transaction, kind: OrderKind, date: NaiveDate, n: i64) -> rusqlite::Result<i64> {
    let current: i64 = tx
        .query_row(
            "SELECT next_value FROM daily_sequence WHERE order_kind = ?1 AND plan_date = ?2",
            params![kind.as_str(), date],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(1);

    tx.execute(
        "INSERT INTO daily_sequence (order_kind, plan_date, next_value) VALUES (?1, ?2, ?3)
         ON CONFLICT(order_kind, plan_date) DO UPDATE SET next_value = excluded.next_value",
        params![kind.as_str(), date, current + n],
    )?;

    Ok(current)
}

fn insert_packer_order(tx: &rusqlite::Transaction, order: &PackerOrder) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO packer_orders
            (plan_id, production_line, material_code, quantity, plan_start, plan_end, sequence,
             plan_date, shift, input_plan_id, input_batch_code, task_id, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            order.plan_id,
            order.production_line,
            order.material_code,
            order.quantity,
            order.plan_start,
            order.plan_end,
            order.sequence,
            order.plan_date,
            order.shift,
            order.input_plan_id,
            order.input_batch_code,
            order.task_id,
            order.status.as_str(),
        ],
    )?;
    Ok(())
}

fn insert_feeder_order(tx: &rusqlite::Transaction, order: &FeederOrder) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO feeder_orders
            (plan_id, production_line, material_code, plan_start, plan_end, sequence, plan_date,
             shift, task_id, safety_stock, is_last_one)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            order.plan_id,
            order.production_line,
            order.material_code,
            order.plan_start,
            order.plan_end,
            order.sequence,
            order.plan_date,
            order.shift,
            order.task_id,
            order.safety_stock,
            order.is_last_one.map(|b| b as i64),
        ],
    )?;
    Ok(())
}

fn resolve_shift_name(snapshot: &ReferenceSnapshot, machine: &str, at: NaiveDateTime) -> Result<String> {
    let shifts = snapshot.shifts_for(machine, at.date());
    let time = at.time();
    shifts
        .iter()
        .find(|(start, end, _)| {
            if end <= start {
                time >= *start || time < *end
            } else {
                time >= *start && time < *end
            }
        })
        .or_else(|| shifts.first())
        .map(|(_, _, shift)| shift.shift_name.clone())
        .ok_or_else(|| PipelineError::NoCapacity(format!("no shift defined for {machine} on {}", at.date())))
}

/// Assigns a 1-based `sequence` to each item, grouped by `(machine_key, date_key)`, in
/// increasing `start_key` order with `plan_id_key` as tiebreak (§4.8).
fn assign_sequences<T>(
    items: &mut [T],
    machine_key: impl Fn(&T) -> String,
    date_key: impl Fn(&T) -> NaiveDate,
    start_key: impl Fn(&T) -> NaiveDateTime,
    plan_id_key: impl Fn(&T) -> String,
    mut set_seq: impl FnMut(&mut T, i64),
) {
    let machines: Vec<String> = items.iter().map(&machine_key).collect();
    assign_sequences_with_key(items, &machines, date_key, start_key, plan_id_key, &mut set_seq);
}

fn assign_sequences_with_key<T>(
    items: &mut [T],
    machine_keys: &[String],
    date_key: impl Fn(&T) -> NaiveDate,
    start_key: impl Fn(&T) -> NaiveDateTime,
    plan_id_key: impl Fn(&T) -> String,
    mut set_seq: impl FnMut(&mut T, i64),
) {
    let mut groups: HashMap<(String, NaiveDate), Vec<usize>> = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        groups
            .entry((machine_keys[i].clone(), date_key(item)))
            .or_default()
            .push(i);
    }

    for (_, mut idxs) in groups {
        idxs.sort_by_key(|&i| (start_key(&items[i]), plan_id_key(&items[i])));
        for (seq, i) in idxs.into_iter().enumerate() {
            set_seq(&mut items[i], seq as i64 + 1);
        }
    }
}

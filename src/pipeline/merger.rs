//! Merger (C4, §4.4): collapses rows sharing (year-month, article, packer-set,
//! feeder-set) into a single logical order.

use chrono::Datelike;

use crate::error::{PipelineError, Result};
use crate::model::{canonical, DecadeRow, LogicalOrder};

struct GroupAccum {
    article_nr: String,
    packers: Vec<String>,
    feeder: String,
    qty: f64,
    target_start: chrono::NaiveDateTime,
    target_end: chrono::NaiveDateTime,
    provenance: Vec<i64>,
}

/// Merges `rows` (already in canonical input order) into [`LogicalOrder`]s. When
/// `merge_enabled` is false, merging is the identity transform with singleton groups
/// (§4.4).
pub fn merge(rows: &[DecadeRow], merge_enabled: bool) -> Result<Vec<LogicalOrder>> {
    for row in rows {
        if row.maker_codes.len() > 1 && row.feeder_codes.len() > 1 {
            return Err(PipelineError::InvalidTopology(format!(
                "row {} has both a multi-packer and multi-feeder set",
                row.row
            )));
        }
    }

    if !merge_enabled {
        return Ok(rows
            .iter()
            .map(|row| LogicalOrder {
                id: LogicalOrder::new_id(),
                article_nr: row.article_nr.clone(),
                qty: row.qty_final,
                packers: row.maker_codes.clone(),
                feeder: row.feeder_codes[0].clone(),
                target_start: row.planned_start,
                target_end: row.planned_end,
                provenance: vec![row.id],
                sync_group_id: None,
            })
            .collect());
    }

    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, GroupAccum> = std::collections::HashMap::new();

    for row in rows {
        let packers = canonical(&row.maker_codes);
        let feeders = canonical(&row.feeder_codes);
        let key = format!(
            "{:04}-{:02}|{}|{}|{}",
            row.planned_start.year(),
            row.planned_start.month(),
            row.article_nr,
            packers.join(","),
            feeders.join(",")
        );

        groups
            .entry(key.clone())
            .and_modify(|g| {
                g.qty += row.qty_final;
                g.target_start = g.target_start.min(row.planned_start);
                g.target_end = g.target_end.max(row.planned_end);
                g.provenance.push(row.id);
            })
            .or_insert_with(|| {
                order.push(key.clone());
                GroupAccum {
                    article_nr: row.article_nr.clone(),
                    packers,
                    // Representative feeder for the rare multi-feeder/single-packer
                    // case; lexicographically first of the canonical set.
                    feeder: feeders[0].clone(),
                    qty: row.qty_final,
                    target_start: row.planned_start,
                    target_end: row.planned_end,
                    provenance: vec![row.id],
                }
            });
    }

    Ok(order
        .into_iter()
        .map(|key| {
            let g = groups.remove(&key).expect("key was just inserted");
            LogicalOrder {
                id: LogicalOrder::new_id(),
                article_nr: g.article_nr,
                qty: g.qty,
                packers: g.packers,
                feeder: g.feeder,
                target_start: g.target_start,
                target_end: g.target_end,
                provenance: g.provenance,
                sync_group_id: None,
            }
        })
        .collect())
}

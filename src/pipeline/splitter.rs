//! Splitter (C5, §4.5): for one-feeder-to-many-packers orders, emits one logical
//! packer order per packer with allocated quantity.

use crate::error::{PipelineError, Result};
use crate::model::LogicalOrder;

/// Splits every multi-packer order in `orders` into one single-packer order per
/// packer, distributing the remainder to the lexicographically-first packer code
/// (§4.5, §9 open question 1). Fails with `SPLIT_REQUIRED` if `split_enabled` is
/// false and any input order still has more than one packer.
pub fn split(orders: Vec<LogicalOrder>, split_enabled: bool) -> Result<Vec<LogicalOrder>> {
    let mut out = Vec::with_capacity(orders.len());

    for order in orders {
        if order.packers.len() <= 1 {
            out.push(order);
            continue;
        }

        if !split_enabled {
            return Err(PipelineError::SplitRequired(format!(
                "logical order {} has {} packers but splitting is disabled",
                order.id,
                order.packers.len()
            )));
        }

        let k = order.packers.len();
        let mut packers_sorted = order.packers.clone();
        packers_sorted.sort();

        let base = (order.qty / k as f64).floor();
        let remainder_units = ((order.qty - base * k as f64).round() as i64).max(0) as usize;
        let parent_id = order.id.clone();

        for (i, packer) in packers_sorted.iter().enumerate() {
            let qty = if i < remainder_units { base + 1.0 } else { base };
            out.push(LogicalOrder {
                id: LogicalOrder::new_id(),
                article_nr: order.article_nr.clone(),
                qty,
                packers: vec![packer.clone()],
                feeder: order.feeder.clone(),
                target_start: order.target_start,
                target_end: order.target_end,
                provenance: order.provenance.clone(),
                sync_group_id: Some(parent_id.clone()),
            });
        }
    }

    Ok(out)
}

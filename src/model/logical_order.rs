use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transient, pipeline-owned entity produced by the Merger and refined by the
/// Splitter and Parallel Synchronizer (§3). `packers` holds the lexicographically
/// canonical set; after the Splitter it always has exactly one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalOrder {
    pub id: String,
    pub article_nr: String,
    pub qty: f64,
    pub packers: Vec<String>,
    pub feeder: String,
    pub target_start: NaiveDateTime,
    pub target_end: NaiveDateTime,
    pub provenance: Vec<i64>,
    /// Set by the Splitter to the parent order's id; used by the Parallel
    /// Synchronizer to find sibling groups (§4.5/§4.7).
    pub sync_group_id: Option<String>,
}

impl LogicalOrder {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// The single packer this order targets. Panics if called before the Splitter has
    /// run — callers past that point hold the §3 post-split invariant `|packers| = 1`.
    pub fn single_packer(&self) -> &str {
        debug_assert_eq!(self.packers.len(), 1, "LogicalOrder not yet split: {:?}", self.packers);
        &self.packers[0]
    }
}

/// `canonical(set)`: sorted lexicographically and de-duplicated (§4.4).
pub fn canonical(codes: &[String]) -> Vec<String> {
    let mut sorted: Vec<String> = codes.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
}

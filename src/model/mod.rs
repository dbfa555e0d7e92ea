//! Core entities of the scheduling domain (§3 of SPEC_FULL.md).
//!
//! Mirrors the teacher's `models/` layout: one file per entity, each exposing a
//! `Serialize`/`Deserialize` struct plus (where the entity is persisted) a
//! `from_row(&rusqlite::Row) -> rusqlite::Result<Self>` constructor.

pub mod daily_sequence;
pub mod decade_row;
pub mod logical_order;
pub mod machine;
pub mod maintenance;
pub mod relation;
pub mod shift;
pub mod speed;
pub mod stage_log;
pub mod task;
pub mod work_order;

pub use daily_sequence::*;
pub use decade_row::*;
pub use logical_order::*;
pub use machine::*;
pub use maintenance::*;
pub use relation::*;
pub use shift::*;
pub use speed::*;
pub use stage_log::*;
pub use task::*;
pub use work_order::*;

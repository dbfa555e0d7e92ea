//! The four deterministic pipeline stages (C4-C7) plus the Work-Order Writer (C8):
//! Merge → Split → Time-Correction → Parallel-Sync → Write (§4.4-§4.8).

pub mod merger;
pub mod parallel_sync;
pub mod splitter;
pub mod time_corrector;
pub mod writer;

pub use merger::merge;
pub use parallel_sync::parallel_sync;
pub use splitter::split;
pub use time_corrector::correct_times;
pub use writer::{WriteResult, Writer};

//! Advanced Planning & Scheduling engine library: decade-plan ingestion through to
//! HJB/HWS work-order persistence (see `SPEC_FULL.md` for the full component map).

pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod plan_repository;
pub mod reference_store;

pub use config::PipelineConfig;
pub use db::{initialize_database, initialize_in_memory, Database};
pub use error::{PipelineError, Result};
pub use orchestrator::{Orchestrator, TaskFilter};

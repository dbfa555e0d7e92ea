//! Storage layer (C10 of SPEC_FULL.md): a single SQLite connection behind a
//! `parking_lot::Mutex`, generalized from the teacher's `db::connection`/`db::schema`
//! split.

pub mod connection;
pub mod schema;
pub mod seed;

pub use connection::{initialize_database, initialize_in_memory, Database};

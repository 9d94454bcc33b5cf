//! Storage backends for links and watermarks.
//!
//! The Postgres implementations back production nodes; the in-memory ones
//! back tests and keep the trait invariants honest without a database.

pub mod memory;
pub mod pg;

// src/lib.rs
// ────────────────────────────────────────────────────────────────────────────
// Public library entry point.  Re-export everything for both `main.rs` and
// integration tests.

mod macros;

pub mod comms;
pub mod config;
pub mod db;
pub mod lock;
pub mod supervisor;

// src/db/mod.rs
//! Public façade for the SQLite store.

pub mod connection;
pub mod rows;
pub mod store;

pub use rows::InsertRow;
pub use store::{DbError, SensorStore};

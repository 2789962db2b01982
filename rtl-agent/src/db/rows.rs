// src/db/rows.rs

use rusqlite::{params, Result as SqlResult, Statement};
use crate::comms::Reading;

/// Defines how one record of type T lands in its table.
///
/// The store supplies the row id and capture time; the record supplies the rest.
pub trait InsertRow {
    fn insert_sql() -> &'static str;
    fn bind_and_execute(stmt: &mut Statement<'_>, id: i64, captured_at: &str, record: &Self) -> SqlResult<()>;
}

/// SENSOR READINGS
impl InsertRow for Reading {
    fn insert_sql() -> &'static str {
        "INSERT INTO sensor_data \
           (id, date, sensorID, temperature_C, io) \
         VALUES (?1,?2,?3,?4,?5)"
    }

    fn bind_and_execute(stmt: &mut Statement<'_>, id: i64, captured_at: &str, rec: &Reading) -> SqlResult<()> {
        stmt.execute(params![
            id,
            captured_at,
            rec.sensor_id(),
            rec.temperature_c(),
            rec.io(),
        ])?;
        Ok(())
    }
}

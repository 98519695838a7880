//! Database query modules.
//!
//! This module organizes all database operations into logical groups:
//! - users: User accounts, profile fields, photos, passwords
//! - emails: E-mail addresses and confirmation keys
//! - characters, people, publishers: Comicvine catalog records
//! - search: Full-text search index

pub mod characters;
pub mod emails;
pub mod people;
pub mod publishers;
pub mod search;
pub mod users;

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use readcomics_common::Error;
use rusqlite::types::Type;
use rusqlite::Connection;

/// Convert a rusqlite error into the common error type.
pub(crate) fn db_err(e: rusqlite::Error) -> Error {
    Error::database(e.to_string())
}

/// True when the error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub(crate) fn parse_id<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_datetime(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_datetime(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_datetime(idx, v)).transpose()
}

pub(crate) fn parse_opt_date(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<NaiveDate>> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(&v, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
        })
        .transpose()
}

pub(crate) fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Collect every slug currently used in `table`, except the one owned by
/// `comicvine_id` (so a record can keep its own slug on update).
pub(crate) fn taken_slugs(
    conn: &Connection,
    table: &str,
    comicvine_id: i64,
) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT slug FROM {} WHERE comicvine_id != ?",
        table
    ))?;
    let slugs = stmt
        .query_map([comicvine_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(slugs)
}

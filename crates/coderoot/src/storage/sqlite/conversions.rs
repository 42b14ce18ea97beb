//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.
//! These are testable in isolation without database access.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;

use coderoot_core::storage::RepositoryError;
use coderoot_core::user::{User, UserStats};

/// Convert a SQLite row to a User.
///
/// Expected columns: id, user_id, username, first_name, last_name, language,
/// is_active, is_premium, referred_by, referral_code, created_at, updated_at,
/// last_activity
pub fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;
    let last_activity: String = row.get(12)?;

    Ok(User {
        record_id: Some(row.get(0)?),
        user_id: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        language: row.get(5)?,
        is_active: row.get(6)?,
        is_premium: row.get(7)?,
        referred_by: row.get(8)?,
        referral_code: row.get(9)?,
        created_at: parse_datetime(10, &created_at)?,
        updated_at: parse_datetime(11, &updated_at)?,
        last_activity: parse_datetime(12, &last_activity)?,
    })
}

/// Convert raw aggregate counts to UserStats.
///
/// SQLite hands counts back as signed integers; a negative one means the
/// database is corrupt.
pub fn counts_to_stats(total: i64, active: i64, premium: i64) -> Result<UserStats, RepositoryError> {
    Ok(UserStats {
        total: count_to_u64(total)?,
        active: count_to_u64(active)?,
        premium: count_to_u64(premium)?,
    })
}

/// Convert a SQLite count to u64.
pub fn count_to_u64(count: i64) -> Result<u64, RepositoryError> {
    u64::try_from(count)
        .map_err(|_| RepositoryError::InvalidData(format!("negative row count: {count}")))
}

/// Parse a datetime from RFC 3339 string.
fn parse_datetime(column: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Format a DateTime for SQLite storage.
///
/// Always nanosecond precision with a `Z` suffix, so every value has the
/// same width and text order matches time order.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

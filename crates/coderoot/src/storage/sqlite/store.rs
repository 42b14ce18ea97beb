//! SQLite user store implementation.
//!
//! Implements `UserStore` from `coderoot_core::storage` using SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;

use coderoot_core::storage::{Pagination, RepositoryError, Result, UserStore};
use coderoot_core::user::{RecordId, User, UserId, UserStats, UserUpdate};

use super::conversions::{count_to_u64, counts_to_stats, format_datetime, row_to_user};
use super::error::map_tokio_rusqlite_error;
use super::schema;

const ENTITY: &str = "User";

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// SQLite-backed user store.
///
/// A single connection is shared by every request; `tokio-rusqlite` runs the
/// calls on its own background thread.
pub struct SqliteUserStore {
    conn: Connection,
}

impl SqliteUserStore {
    /// Opens (or creates) a file-based database.
    ///
    /// Schema tables and indexes are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a store with an in-memory database.
    ///
    /// Data is lost when the connection is dropped.
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn insert_user(&self, user: &User) -> Result<RecordId> {
        let user = user.clone();
        let user_id = user.user_id;

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_USER,
                    rusqlite::params![
                        user.user_id,
                        user.username,
                        user.first_name,
                        user.last_name,
                        user.language,
                        user.is_active,
                        user.is_premium,
                        user.referred_by,
                        user.referral_code,
                        format_datetime(&user.created_at),
                        format_datetime(&user.updated_at),
                        format_datetime(&user.last_activity),
                    ],
                )
                .map_err(wrap_err)?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, user_id.to_string()))
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<User>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare_cached(schema::SELECT_USER_BY_USER_ID)
                    .map_err(wrap_err)?;
                match stmt.query_row([user_id], row_to_user) {
                    Ok(user) => Ok(Some(user)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, user_id.to_string()))
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        let code = code.to_string();
        let id = code.clone();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare_cached(schema::SELECT_USER_BY_REFERRAL_CODE)
                    .map_err(wrap_err)?;
                match stmt.query_row([&code], row_to_user) {
                    Ok(user) => Ok(Some(user)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, id))
    }

    async fn update_fields(
        &self,
        user_id: UserId,
        update: &UserUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let update = update.clone();
        let updated_at = format_datetime(&updated_at);

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(
                        schema::UPDATE_USER_FIELDS,
                        rusqlite::params![
                            user_id,
                            update.username,
                            update.first_name,
                            update.last_name,
                            update.language,
                            update.is_active,
                            update.is_premium,
                            update.referred_by,
                            updated_at,
                        ],
                    )
                    .map_err(wrap_err)?;
                if rows == 0 {
                    Err(wrap_err(rusqlite::Error::QueryReturnedNoRows))
                } else {
                    Ok(())
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, user_id.to_string()))
    }

    async fn set_last_activity(&self, user_id: UserId, at: DateTime<Utc>) -> Result<()> {
        let at = format_datetime(&at);

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(schema::UPDATE_LAST_ACTIVITY, rusqlite::params![user_id, at])
                    .map_err(wrap_err)?;
                if rows == 0 {
                    Err(wrap_err(rusqlite::Error::QueryReturnedNoRows))
                } else {
                    Ok(())
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, user_id.to_string()))
    }

    async fn count_active(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .call(|conn| {
                conn.query_row(schema::COUNT_ACTIVE_USERS, [], |row| row.get(0))
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, "active"))?;

        count_to_u64(count)
    }

    async fn find_active(&self, pagination: Pagination) -> Result<Vec<User>> {
        let limit = i64::from(pagination.limit);
        let offset = i64::try_from(pagination.offset()).unwrap_or(i64::MAX);

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare_cached(schema::SELECT_ACTIVE_USERS_PAGE)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map([limit, offset], row_to_user)
                    .map_err(wrap_err)?;

                let mut users = Vec::new();
                for row_result in rows {
                    users.push(row_result.map_err(wrap_err)?);
                }
                Ok(users)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, "active"))
    }

    async fn aggregate_stats(&self) -> Result<UserStats> {
        let (total, active, premium): (i64, i64, i64) = self
            .conn
            .call(|conn| {
                conn.query_row(schema::SELECT_USER_STATS, [], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })
                .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, "stats"))?;

        counts_to_stats(total, active, premium)
    }

    async fn ping(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.query_row(schema::PING, [], |row| row.get::<_, i64>(0))
                    .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, "ping"))
    }
}

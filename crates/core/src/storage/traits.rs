use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::user::{ActiveUsersPage, RecordId, User, UserId, UserStats, UserUpdate};

use super::{Pagination, Result};

/// Persistence primitives for users.
///
/// Implementations are the source of truth and hold no caching logic. Mutations
/// of a user that does not exist fail with [`RepositoryError::NotFound`].
///
/// [`RepositoryError::NotFound`]: super::RepositoryError::NotFound
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user and returns the record identifier assigned to it.
    ///
    /// Fails with `Conflict` if the user ID or the referral code is taken.
    async fn insert_user(&self, user: &User) -> Result<RecordId>;

    /// Gets a user by their Telegram ID.
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<User>>;

    /// Gets a user by their referral code.
    async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>>;

    /// Merges the set fields of `update` and stamps `updated_at`.
    async fn update_fields(
        &self,
        user_id: UserId,
        update: &UserUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Sets the last activity timestamp, leaving every other field untouched.
    async fn set_last_activity(&self, user_id: UserId, at: DateTime<Utc>) -> Result<()>;

    /// Counts active users.
    async fn count_active(&self) -> Result<u64>;

    /// Gets one page of active users, most recently active first.
    async fn find_active(&self, pagination: Pagination) -> Result<Vec<User>>;

    /// Counts total, active and premium users.
    async fn aggregate_stats(&self) -> Result<UserStats>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}

/// User operations exposed to handlers.
///
/// Reads that find nothing return `Ok(None)`; errors are reserved for conflicts
/// and storage faults.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates a user, filling in timestamps, the active flag, the referral
    /// code and the record identifier on `user`.
    async fn create(&self, user: &mut User) -> Result<()>;

    /// Gets a user by their Telegram ID.
    async fn get_by_user_id(&self, user_id: UserId) -> Result<Option<User>>;

    /// Gets a user by their referral code.
    async fn get_by_referral_code(&self, code: &str) -> Result<Option<User>>;

    /// Applies a partial update.
    async fn update(&self, user_id: UserId, update: &UserUpdate) -> Result<()>;

    /// Marks the user as active now.
    async fn update_last_activity(&self, user_id: UserId) -> Result<()>;

    /// Soft-deletes a user by deactivating it.
    async fn delete(&self, user_id: UserId) -> Result<()>;

    /// Gets one page of active users and the total number of active users.
    async fn get_active_users(&self, pagination: Pagination) -> Result<ActiveUsersPage>;

    /// Gets aggregate user counts.
    async fn get_user_stats(&self) -> Result<UserStats>;
}

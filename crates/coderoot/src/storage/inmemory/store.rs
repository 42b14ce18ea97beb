//! In-memory user store implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use coderoot_core::storage::{Pagination, RepositoryError, Result, UserStore};
use coderoot_core::user::{RecordId, User, UserId, UserStats, UserUpdate};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, User>,
    next_record_id: RecordId,
}

/// In-memory user store.
///
/// Data is not persisted and is lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryUserStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(user_id: UserId) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: "User",
        id: user_id.to_string(),
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert_user(&self, user: &User) -> Result<RecordId> {
        let mut inner = self.inner.write().await;

        let code_taken = user.referral_code.as_ref().is_some_and(|code| {
            inner
                .users
                .values()
                .any(|u| u.referral_code.as_ref() == Some(code))
        });
        if inner.users.contains_key(&user.user_id) || code_taken {
            return Err(RepositoryError::Conflict {
                entity_type: "User",
                id: user.user_id.to_string(),
            });
        }

        inner.next_record_id += 1;
        let record_id = inner.next_record_id;
        let mut stored = user.clone();
        stored.record_id = Some(record_id);
        inner.users.insert(user.user_id, stored);

        Ok(record_id)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.referral_code.as_deref() == Some(code))
            .cloned())
    }

    async fn update_fields(
        &self,
        user_id: UserId,
        update: &UserUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| not_found(user_id))?;
        update.apply_to(user, updated_at);
        Ok(())
    }

    async fn set_last_activity(&self, user_id: UserId, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| not_found(user_id))?;
        user.last_activity = at;
        Ok(())
    }

    async fn count_active(&self) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().filter(|u| u.is_active).count() as u64)
    }

    async fn find_active(&self, pagination: Pagination) -> Result<Vec<User>> {
        let inner = self.inner.read().await;
        let mut active: Vec<&User> = inner.users.values().filter(|u| u.is_active).collect();
        active.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then(b.user_id.cmp(&a.user_id))
        });

        let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
        Ok(active
            .into_iter()
            .skip(offset)
            .take(pagination.limit as usize)
            .cloned()
            .collect())
    }

    async fn aggregate_stats(&self) -> Result<UserStats> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .fold(UserStats::default(), |mut stats, user| {
                stats.total += 1;
                stats.active += u64::from(user.is_active);
                stats.premium += u64::from(user.is_premium);
                stats
            }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

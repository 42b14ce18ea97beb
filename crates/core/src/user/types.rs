use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telegram user identifier.
pub type UserId = i64;

/// Identifier assigned by the document store on insert.
pub type RecordId = i64;

/// A bot user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Storage-assigned record identifier. `None` until the user is inserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    pub user_id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub language: String,
    pub is_active: bool,
    pub is_premium: bool,
    /// The user whose referral code brought this user in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<UserId>,
    #[serde(default)]
    pub referral_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl User {
    /// Creates an active user with all timestamps set to now.
    pub fn new(user_id: UserId, first_name: impl Into<String>, language: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            record_id: None,
            user_id,
            username: None,
            first_name: first_name.into(),
            last_name: None,
            language: language.into(),
            is_active: true,
            is_premium: false,
            referred_by: None,
            referral_code: None,
            created_at: now,
            updated_at: now,
            last_activity: now,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn with_referred_by(mut self, referrer: UserId) -> Self {
        self.referred_by = Some(referrer);
        self
    }

    pub fn with_referral_code(mut self, code: impl Into<String>) -> Self {
        self.referral_code = Some(code.into());
        self
    }

    pub fn with_premium(mut self, is_premium: bool) -> Self {
        self.is_premium = is_premium;
        self
    }

    /// Sets the last activity timestamp (useful for testing).
    pub fn with_last_activity(mut self, at: DateTime<Utc>) -> Self {
        self.last_activity = at;
        self
    }

    /// Sets the created/updated timestamps (useful for testing).
    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }
}

/// A partial update of a user.
///
/// Only fields set to `Some` are written. The user ID and referral code are
/// absent: both are immutable once the user exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: Option<String>,
    pub is_active: Option<bool>,
    pub is_premium: Option<bool>,
    pub referred_by: Option<UserId>,
}

impl UserUpdate {
    /// An update that only changes the preferred language.
    pub fn language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            ..Self::default()
        }
    }

    /// The soft-delete update: flips the active flag off.
    pub fn deactivate() -> Self {
        Self {
            is_active: Some(false),
            ..Self::default()
        }
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.language.is_none()
            && self.is_active.is_none()
            && self.is_premium.is_none()
            && self.referred_by.is_none()
    }

    /// Merges the set fields into `user` and stamps `updated_at`.
    pub fn apply_to(&self, user: &mut User, updated_at: DateTime<Utc>) {
        if let Some(ref username) = self.username {
            user.username = Some(username.clone());
        }
        if let Some(ref first_name) = self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(ref last_name) = self.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(ref language) = self.language {
            user.language = language.clone();
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        if let Some(is_premium) = self.is_premium {
            user.is_premium = is_premium;
        }
        if let Some(referred_by) = self.referred_by {
            user.referred_by = Some(referred_by);
        }
        user.updated_at = updated_at;
    }
}

/// Aggregate user counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub premium: u64,
}

/// One page of active users plus the total number of active users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveUsersPage {
    pub users: Vec<User>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

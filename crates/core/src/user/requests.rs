//! API request and response types for user operations.
//!
//! Pure data types shared by the HTTP handlers and their tests.

use serde::{Deserialize, Serialize};

use super::functions::parse_referral_payload;
use super::types::{User, UserId};

/// Default page size for active user listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Inbound first interaction from a Telegram user (`/start`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Preferred language; the configured default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Raw `/start` text or deep-link payload, e.g. `/start ref_ab12cd34`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl StartRequest {
    pub fn new(user_id: UserId, first_name: impl Into<String>) -> Self {
        Self {
            user_id,
            username: None,
            first_name: first_name.into(),
            last_name: None,
            language: None,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Referral code carried by the payload, if any.
    pub fn referral_code(&self) -> Option<&str> {
        self.payload.as_deref().and_then(parse_referral_payload)
    }

    /// Builds the user to create for this request.
    pub fn to_user(&self, default_language: &str) -> User {
        let language = self.language.as_deref().unwrap_or(default_language);
        let mut user = User::new(self.user_id, self.first_name.clone(), language);
        user.username = self.username.clone();
        user.last_name = self.last_name.clone();
        user
    }
}

/// Result of an onboarding interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub user: User,
    /// True if this interaction created the user.
    pub created: bool,
}

/// Query parameters for listing active users.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListActiveUsersQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for ListActiveUsersQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::UserError;
use super::types::{User, UserUpdate};

/// Length of a generated referral code.
pub const REFERRAL_CODE_LEN: usize = 8;

/// Prefix that marks a referral code inside a `/start` payload.
pub const REFERRAL_PREFIX: &str = "ref_";

/// Generates a fresh referral code from a random UUID.
pub fn generate_referral_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(REFERRAL_CODE_LEN);
    code
}

/// Prepares a user for insertion.
///
/// Stamps all three timestamps with `now`, marks the user active and fills in
/// a referral code when none (or an empty one) was supplied. A supplied code
/// is kept as-is.
pub fn prepare_new_user(user: &mut User, now: DateTime<Utc>) {
    user.created_at = now;
    user.updated_at = now;
    user.last_activity = now;
    user.is_active = true;

    if user.referral_code.as_deref().is_none_or(str::is_empty) {
        user.referral_code = Some(generate_referral_code());
    }
}

/// Extracts a referral code from a `/start` payload.
///
/// Accepts both the bare deep-link payload (`ref_ab12cd34`) and the full
/// command text (`/start ref_ab12cd34`).
///
/// # Examples
///
/// ```
/// use coderoot_core::user::parse_referral_payload;
///
/// assert_eq!(parse_referral_payload("/start ref_ab12cd34"), Some("ab12cd34"));
/// assert_eq!(parse_referral_payload("ref_ab12cd34"), Some("ab12cd34"));
/// assert_eq!(parse_referral_payload("/start"), None);
/// assert_eq!(parse_referral_payload("/start ref_"), None);
/// ```
pub fn parse_referral_payload(text: &str) -> Option<&str> {
    text.split_whitespace()
        .find_map(|token| token.strip_prefix(REFERRAL_PREFIX))
        .filter(|code| !code.is_empty())
}

fn validate_language(language: &str) -> Result<(), UserError> {
    let len = language.chars().count();
    if !(2..=10).contains(&len) {
        return Err(UserError::InvalidLanguage(language.to_string()));
    }
    Ok(())
}

/// Validates a user before creation.
pub fn validate_new_user(user: &User) -> Result<(), UserError> {
    if user.user_id <= 0 {
        return Err(UserError::InvalidUserId(user.user_id));
    }
    if user.first_name.trim().is_empty() {
        return Err(UserError::EmptyFirstName);
    }
    validate_language(&user.language)
}

/// Validates a partial update.
pub fn validate_update(update: &UserUpdate) -> Result<(), UserError> {
    if update.is_empty() {
        return Err(UserError::EmptyUpdate);
    }
    if let Some(ref first_name) = update.first_name {
        if first_name.trim().is_empty() {
            return Err(UserError::EmptyFirstName);
        }
    }
    if let Some(ref language) = update.language {
        validate_language(language)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_generated_code_length_and_charset() {
        let code = generate_referral_code();

        assert_eq!(code.len(), REFERRAL_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_codes_differ() {
        assert_ne!(generate_referral_code(), generate_referral_code());
    }

    #[test]
    fn test_prepare_new_user_sets_defaults() {
        let mut user = User::new(1, "Ada", "fa");
        user.is_active = false;

        prepare_new_user(&mut user, fixed_timestamp());

        assert!(user.is_active);
        assert_eq!(user.created_at, fixed_timestamp());
        assert_eq!(user.updated_at, fixed_timestamp());
        assert_eq!(user.last_activity, fixed_timestamp());
        assert_eq!(user.referral_code.as_ref().map(String::len), Some(8));
    }

    #[test]
    fn test_prepare_new_user_keeps_supplied_code() {
        let mut user = User::new(1, "Ada", "fa").with_referral_code("custom01");

        prepare_new_user(&mut user, fixed_timestamp());

        assert_eq!(user.referral_code.as_deref(), Some("custom01"));
    }

    #[test]
    fn test_prepare_new_user_replaces_empty_code() {
        let mut user = User::new(1, "Ada", "fa").with_referral_code("");

        prepare_new_user(&mut user, fixed_timestamp());

        assert_eq!(user.referral_code.as_ref().map(String::len), Some(8));
    }

    #[test]
    fn test_parse_referral_payload_ignores_other_tokens() {
        assert_eq!(parse_referral_payload("/start hello"), None);
        assert_eq!(parse_referral_payload(""), None);
        assert_eq!(
            parse_referral_payload("/start promo ref_zz99"),
            Some("zz99")
        );
    }

    #[test]
    fn test_validate_new_user() {
        assert!(validate_new_user(&User::new(1, "Ada", "fa")).is_ok());
        assert_eq!(
            validate_new_user(&User::new(0, "Ada", "fa")),
            Err(UserError::InvalidUserId(0))
        );
        assert_eq!(
            validate_new_user(&User::new(1, "  ", "fa")),
            Err(UserError::EmptyFirstName)
        );
        assert_eq!(
            validate_new_user(&User::new(1, "Ada", "f")),
            Err(UserError::InvalidLanguage("f".to_string()))
        );
    }

    #[test]
    fn test_validate_update() {
        assert_eq!(
            validate_update(&UserUpdate::default()),
            Err(UserError::EmptyUpdate)
        );
        assert!(validate_update(&UserUpdate::language("en")).is_ok());
        assert_eq!(
            validate_update(&UserUpdate::language("a-very-long-tag")),
            Err(UserError::InvalidLanguage("a-very-long-tag".to_string()))
        );

        let blank_name = UserUpdate {
            first_name: Some(String::new()),
            ..UserUpdate::default()
        };
        assert_eq!(validate_update(&blank_name), Err(UserError::EmptyFirstName));
    }
}

use std::time::Duration;

use crate::user::UserId;

/// Default lifetime of a cached user.
pub const USER_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Returns the cache key for a user.
///
/// # Examples
///
/// ```
/// use coderoot_core::cache::user_key;
///
/// assert_eq!(user_key(123456789), "user:123456789");
/// ```
pub fn user_key(user_id: UserId) -> String {
    format!("user:{}", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_key_format() {
        assert_eq!(user_key(1), "user:1");
        assert_eq!(user_key(-1001234567890), "user:-1001234567890");
    }

    #[test]
    fn test_default_ttl_is_one_hour() {
        assert_eq!(USER_CACHE_TTL.as_secs(), 3600);
    }
}

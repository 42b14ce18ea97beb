//! SQLite schema definitions and SQL query constants.
//!
//! Pure data, no I/O. Timestamps are stored as fixed-width RFC 3339 strings
//! with nanoseconds, so ordering by the text column orders by time.

/// SQL statement to create the users table and its indexes.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    username TEXT,
    first_name TEXT NOT NULL,
    last_name TEXT,
    language TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_premium INTEGER NOT NULL DEFAULT 0,
    referred_by INTEGER,
    referral_code TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_activity TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_users_user_id ON users(user_id);
CREATE INDEX IF NOT EXISTS idx_users_username ON users(username) WHERE username IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_users_referral_code ON users(referral_code) WHERE referral_code IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_users_last_activity ON users(last_activity DESC);
"#;

pub const INSERT_USER: &str = r#"
INSERT INTO users (
    user_id, username, first_name, last_name, language, is_active, is_premium,
    referred_by, referral_code, created_at, updated_at, last_activity
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
"#;

pub const SELECT_USER_BY_USER_ID: &str = r#"
SELECT id, user_id, username, first_name, last_name, language, is_active, is_premium,
       referred_by, referral_code, created_at, updated_at, last_activity
FROM users
WHERE user_id = ?1
"#;

pub const SELECT_USER_BY_REFERRAL_CODE: &str = r#"
SELECT id, user_id, username, first_name, last_name, language, is_active, is_premium,
       referred_by, referral_code, created_at, updated_at, last_activity
FROM users
WHERE referral_code = ?1
"#;

/// Partial update: a NULL parameter leaves the column as it is.
pub const UPDATE_USER_FIELDS: &str = r#"
UPDATE users
SET username = COALESCE(?2, username),
    first_name = COALESCE(?3, first_name),
    last_name = COALESCE(?4, last_name),
    language = COALESCE(?5, language),
    is_active = COALESCE(?6, is_active),
    is_premium = COALESCE(?7, is_premium),
    referred_by = COALESCE(?8, referred_by),
    updated_at = ?9
WHERE user_id = ?1
"#;

pub const UPDATE_LAST_ACTIVITY: &str = r#"
UPDATE users
SET last_activity = ?2
WHERE user_id = ?1
"#;

pub const COUNT_ACTIVE_USERS: &str = r#"
SELECT COUNT(*)
FROM users
WHERE is_active = 1
"#;

pub const SELECT_ACTIVE_USERS_PAGE: &str = r#"
SELECT id, user_id, username, first_name, last_name, language, is_active, is_premium,
       referred_by, referral_code, created_at, updated_at, last_activity
FROM users
WHERE is_active = 1
ORDER BY last_activity DESC, user_id DESC
LIMIT ?1 OFFSET ?2
"#;

pub const SELECT_USER_STATS: &str = r#"
SELECT COUNT(*),
       COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0),
       COALESCE(SUM(CASE WHEN is_premium = 1 THEN 1 ELSE 0 END), 0)
FROM users
"#;

pub const PING: &str = "SELECT 1";

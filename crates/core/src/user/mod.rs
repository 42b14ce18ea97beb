mod error;
mod functions;
mod requests;
mod types;

pub use error::UserError;
pub use functions::{
    generate_referral_code, parse_referral_payload, prepare_new_user, validate_new_user,
    validate_update, REFERRAL_CODE_LEN, REFERRAL_PREFIX,
};
pub use requests::{ListActiveUsersQuery, StartRequest, StartResponse, DEFAULT_PAGE_LIMIT};
pub use types::{ActiveUsersPage, RecordId, User, UserId, UserStats, UserUpdate};

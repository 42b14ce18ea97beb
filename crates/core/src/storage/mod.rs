mod error;
mod http_mapping;
mod scope;
mod traits;
mod types;

pub use error::{PaginationError, RepositoryError, Result};
pub use http_mapping::{pagination_error_to_status_code, repository_error_to_status_code};
pub use scope::CallScope;
pub use traits::{UserRepository, UserStore};
pub use types::Pagination;

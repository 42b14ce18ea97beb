//! Functional core for the coderoot bot backend.
//!
//! - [`user`]: the `User` entity, partial updates, and pure lifecycle helpers
//! - [`cache`]: cache contract, key builders and value serialization
//! - [`storage`]: document store and repository contracts, errors, pagination

pub mod cache;
pub mod storage;
pub mod user;

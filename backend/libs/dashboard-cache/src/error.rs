//! Cache error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cached value for key {key} has a different type")]
    TypeMismatch { key: String },

    #[error("Invalid max age: freshness window must be greater than zero")]
    InvalidMaxAge,
}

pub type CacheResult<T> = Result<T, CacheError>;

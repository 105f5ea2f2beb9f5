//! Cache key schema
//!
//! Key format: v{VERSION}:{entity}[:sub_key]

/// Cache schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 1;

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Full user collection
    /// Format: v1:users
    pub fn users() -> String {
        format!("v{}:users", CACHE_VERSION)
    }

    /// Full post collection
    /// Format: v1:posts
    pub fn posts() -> String {
        format!("v{}:posts", CACHE_VERSION)
    }

    /// Full comment collection
    /// Format: v1:comments
    pub fn comments() -> String {
        format!("v{}:comments", CACHE_VERSION)
    }

    /// Extract entity type from key
    pub fn entity_type(key: &str) -> Option<&str> {
        // Format: v{N}:{entity}...
        key.split(':').nth(1)
    }
}

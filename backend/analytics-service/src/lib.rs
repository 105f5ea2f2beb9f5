//! Engagement analytics for the social dashboard
//!
//! Fetches users, posts, and comments through a cached data access layer and
//! derives the dashboard views from them.

pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{AnalyticsError, Result};

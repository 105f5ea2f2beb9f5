//! Backing data source for the dashboard collections
//!
//! `DataSource` is the seam between the dashboard and whatever serves users,
//! posts, and comments. `FixtureDataSource` serves a fixed snapshot with a
//! per-collection delay to mimic network latency.

use crate::config::SourceConfig;
use crate::error::Result;
use crate::models::{Comment, Post, User};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Representative engagement data: 7 users, 7 posts, 17 comments
const BUNDLED_FIXTURE: &str = include_str!("../../fixtures/dashboard.json");

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch_users(&self) -> Result<Vec<User>>;

    async fn fetch_posts(&self) -> Result<Vec<Post>>;

    async fn fetch_comments(&self) -> Result<Vec<Comment>>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Simulated latency per collection
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedLatency {
    pub users: Duration,
    pub posts: Duration,
    pub comments: Duration,
}

impl From<&SourceConfig> for SimulatedLatency {
    fn from(config: &SourceConfig) -> Self {
        Self {
            users: config.users_latency,
            posts: config.posts_latency,
            comments: config.comments_latency,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixtureDataSource {
    data: FixtureData,
    latency: SimulatedLatency,
}

impl FixtureDataSource {
    pub fn new(data: FixtureData, latency: SimulatedLatency) -> Self {
        Self { data, latency }
    }

    /// Fixture compiled into the binary
    pub fn bundled(latency: SimulatedLatency) -> Result<Self> {
        Self::from_json(BUNDLED_FIXTURE, latency)
    }

    pub fn from_json(json: &str, latency: SimulatedLatency) -> Result<Self> {
        let data: FixtureData = serde_json::from_str(json)?;
        Ok(Self::new(data, latency))
    }

    pub async fn from_path(path: &Path, latency: SimulatedLatency) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json, latency)
    }

    /// Fixture file named by the config, or the bundled one
    pub async fn from_config(config: &SourceConfig) -> Result<Self> {
        let latency = SimulatedLatency::from(config);
        let source = match &config.fixture_path {
            Some(path) => Self::from_path(path, latency).await?,
            None => Self::bundled(latency)?,
        };

        info!(
            fixture = config
                .fixture_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "bundled".to_string()),
            users = source.data.users.len(),
            posts = source.data.posts.len(),
            comments = source.data.comments.len(),
            "Fixture data source loaded"
        );

        Ok(source)
    }

    pub fn data(&self) -> &FixtureData {
        &self.data
    }
}

#[async_trait]
impl DataSource for FixtureDataSource {
    async fn fetch_users(&self) -> Result<Vec<User>> {
        tokio::time::sleep(self.latency.users).await;
        debug!(count = self.data.users.len(), "Fetched users");
        Ok(self.data.users.clone())
    }

    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        tokio::time::sleep(self.latency.posts).await;
        debug!(count = self.data.posts.len(), "Fetched posts");
        Ok(self.data.posts.clone())
    }

    async fn fetch_comments(&self) -> Result<Vec<Comment>> {
        tokio::time::sleep(self.latency.comments).await;
        debug!(count = self.data.comments.len(), "Fetched comments");
        Ok(self.data.comments.clone())
    }
}

//! Data models for analytics-service
//!
//! This module defines structures for:
//! - User, Post, Comment: entities as served by the backing data source
//! - CommentCounts: per-post comment tally
//! - UserWithCommentCount, TrendingPost, FeedEntry: derived dashboard rows

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    /// Author; may reference a user that does not exist
    pub user_id: String,
    pub title: String,
    pub content: String,
    /// ISO-8601 timestamp
    pub created_at: String,
}

impl Post {
    /// Parsed `created_at`, `None` when it is not an ISO-8601 timestamp
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    /// Target post; may reference a post that does not exist
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
}

/// Parse an ISO-8601 timestamp
///
/// Offset-less date-times and bare dates are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Comment tally keyed by post id
///
/// Missing keys read as zero through [`CommentCounts::get_or_default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentCounts(HashMap<String, usize>);

impl CommentCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_default(&self, post_id: &str) -> usize {
        self.0.get(post_id).copied().unwrap_or(0)
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.0.contains_key(post_id)
    }

    /// Ensure an entry exists without touching an existing count
    pub fn ensure(&mut self, post_id: &str) {
        self.0.entry(post_id.to_string()).or_insert(0);
    }

    pub fn increment(&mut self, post_id: &str) {
        *self.0.entry(post_id.to_string()).or_insert(0) += 1;
    }

    /// Largest count across every entry, orphans included; 0 when empty
    pub fn max_count(&self) -> usize {
        self.0.values().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, usize)> for CommentCounts {
    fn from_iter<I: IntoIterator<Item = (K, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithCommentCount {
    #[serde(flatten)]
    pub user: User,
    /// Comments received across every post the user authored
    pub comment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingPost {
    #[serde(flatten)]
    pub post: Post,
    pub comment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    #[serde(flatten)]
    pub post: Post,
    /// `None` when the post's author is unknown
    pub user: Option<User>,
    pub comment_count: usize,
}

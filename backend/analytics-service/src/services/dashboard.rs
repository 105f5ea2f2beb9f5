//! Dashboard views computed from one snapshot of the collections

use crate::models::{FeedEntry, TrendingPost, UserWithCommentCount};
use crate::services::aggregation::{build_feed, count_comments, top_users, trending_posts};
use crate::services::data_access::DashboardSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardViews {
    /// Publication sequence number; 0 until published
    pub generation: u64,
    pub computed_at: DateTime<Utc>,
    pub top_users: Vec<UserWithCommentCount>,
    pub trending_posts: Vec<TrendingPost>,
    pub feed: Vec<FeedEntry>,
}

impl DashboardViews {
    pub fn compute(snapshot: &DashboardSnapshot, top_users_limit: usize) -> Self {
        let counts = count_comments(&snapshot.posts, &snapshot.comments);

        Self {
            generation: 0,
            computed_at: Utc::now(),
            top_users: top_users(&snapshot.users, &snapshot.posts, &counts, top_users_limit),
            trending_posts: trending_posts(&snapshot.posts, &counts),
            feed: build_feed(&snapshot.users, &snapshot.posts, &counts),
        }
    }
}

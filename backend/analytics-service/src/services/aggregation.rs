//! Engagement aggregation for the dashboard views
//!
//! Every function here is pure: it reads the snapshot it is given and returns
//! freshly allocated rows. Dangling foreign keys never fail a call:
//! - a comment on an unknown post is still tallied under that post id
//! - a post by an unknown author contributes to nobody's total
//! - a feed entry for an unknown author carries `user: None`
//!
//! All orderings are stable, so rows that compare equal keep the relative
//! order they had in the input.

use crate::error::{AnalyticsError, Result};
use crate::models::{
    Comment, CommentCounts, FeedEntry, Post, TrendingPost, User, UserWithCommentCount,
};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::debug;

/// Number of users shown on the top commenters board
pub const DEFAULT_TOP_USERS_LIMIT: usize = 5;

/// Tally comments per post
///
/// Every post starts at zero so posts without comments still have an entry.
/// Comments pointing at unknown posts grow the map under their own id.
pub fn count_comments(posts: &[Post], comments: &[Comment]) -> CommentCounts {
    let mut counts = CommentCounts::new();

    for post in posts {
        counts.ensure(&post.id);
    }

    for comment in comments {
        counts.increment(&comment.post_id);
    }

    debug!(
        posts = posts.len(),
        comments = comments.len(),
        entries = counts.len(),
        "Comment counts computed"
    );

    counts
}

/// Rank users by the comments their posts received
///
/// One row per input user (zero-engagement users included), highest total
/// first, ties in input order, truncated to `limit`.
pub fn top_users(
    users: &[User],
    posts: &[Post],
    counts: &CommentCounts,
    limit: usize,
) -> Vec<UserWithCommentCount> {
    let mut per_author: HashMap<&str, usize> = HashMap::new();
    for post in posts {
        *per_author.entry(post.user_id.as_str()).or_insert(0) += counts.get_or_default(&post.id);
    }

    let mut ranked: Vec<(&User, usize)> = users
        .iter()
        .map(|user| {
            let total = per_author.get(user.id.as_str()).copied().unwrap_or(0);
            (user, total)
        })
        .collect();

    // Vec::sort_by is stable
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    debug!(users = users.len(), limit, "Top users ranked");

    ranked
        .into_iter()
        .take(limit)
        .map(|(user, comment_count)| UserWithCommentCount {
            user: user.clone(),
            comment_count,
        })
        .collect()
}

/// Convert an externally supplied limit into a ranking limit
pub fn validate_limit(raw: i64) -> Result<usize> {
    usize::try_from(raw).map_err(|_| {
        AnalyticsError::InvalidArgument(format!("limit must be non-negative, got {}", raw))
    })
}

/// Posts sharing the highest comment count, newest first
///
/// The maximum is taken over every entry in `counts`. When nothing has been
/// commented on the maximum is zero and every post ties for it.
pub fn trending_posts(posts: &[Post], counts: &CommentCounts) -> Vec<TrendingPost> {
    let max_count = counts.max_count();

    let mut trending: Vec<TrendingPost> = posts
        .iter()
        .filter(|post| counts.get_or_default(&post.id) == max_count)
        .map(|post| TrendingPost {
            post: post.clone(),
            comment_count: max_count,
        })
        .collect();

    trending.sort_by_cached_key(|row| newest_first(&row.post));

    debug!(
        max_count,
        trending = trending.len(),
        "Trending posts selected"
    );

    trending
}

/// All posts, newest first
pub fn sorted_feed(posts: &[Post]) -> Vec<Post> {
    let mut feed = posts.to_vec();
    feed.sort_by_cached_key(newest_first);
    feed
}

/// Sorted feed joined with each post's author and comment count
pub fn build_feed(users: &[User], posts: &[Post], counts: &CommentCounts) -> Vec<FeedEntry> {
    let authors: HashMap<&str, &User> = users
        .iter()
        .map(|user| (user.id.as_str(), user))
        .collect();

    let feed: Vec<FeedEntry> = sorted_feed(posts)
        .into_iter()
        .map(|post| FeedEntry {
            user: authors.get(post.user_id.as_str()).map(|user| (*user).clone()),
            comment_count: counts.get_or_default(&post.id),
            post,
        })
        .collect();

    debug!(entries = feed.len(), "Feed built");

    feed
}

/// Sort key placing later timestamps first and unparseable ones last
fn newest_first(post: &Post) -> Reverse<Option<DateTime<Utc>>> {
    Reverse(post.created_at_utc())
}

pub mod aggregation;
pub mod dashboard;
pub mod data_access;
pub mod data_source;
pub mod media;

pub use aggregation::{
    build_feed, count_comments, sorted_feed, top_users, trending_posts, validate_limit,
    DEFAULT_TOP_USERS_LIMIT,
};
pub use dashboard::DashboardViews;
pub use data_access::{DashboardSnapshot, DataAccessLayer};
pub use data_source::{DataSource, FixtureData, FixtureDataSource, SimulatedLatency};
pub use media::{
    avatar_url_or_fallback, image_url_or_fallback, post_image_url, user_avatar_url,
    AVATAR_FALLBACK_URL, POST_IMAGE_FALLBACK_URL,
};

//! Subscription management: follow, unfollow and list, acting as a named
//! user. The (user, feed) uniqueness constraint lives in the store; this
//! layer only resolves the acting user before delegating.

use crate::db::{FeedStore, Follow};
use crate::error::Result;

/// Follow the feed at `url` as `user_name`.
///
/// Fails with `NotFound` when the user or feed is missing and `Conflict`
/// when the user already follows that feed.
pub async fn follow_feed<S: FeedStore>(store: &S, user_name: &str, url: &str) -> Result<Follow> {
    let user = store.get_user_by_name(user_name).await?;
    let feed = store.get_feed_by_url(url).await?;
    store.create_follow(user.id, feed.id).await
}

/// Remove the follow of `user_name` on the feed at `url`.
pub async fn unfollow_feed<S: FeedStore>(store: &S, user_name: &str, url: &str) -> Result<()> {
    let user = store.get_user_by_name(user_name).await?;
    store.delete_follow(user.id, url).await
}

/// Names of the feeds `user_name` follows.
pub async fn list_following<S: FeedStore>(store: &S, user_name: &str) -> Result<Vec<String>> {
    let user = store.get_user_by_name(user_name).await?;
    store.follows_for_user(user.id).await
}

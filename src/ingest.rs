use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::db::{Feed, FeedStore, NewPost};
use crate::error::{Error, Result};
use crate::fetcher::ParsedFeed;

/// Store the new posts from a parsed feed and advance its watermark.
///
/// Policy decisions, applied per item:
/// - `pubDate` present but unparseable: log and skip that item only; the
///   rest of the feed still goes through.
/// - `pubDate` absent: the post is stored without a published timestamp.
/// - duplicate post URL: the store's `Conflict` means "already known" and
///   is swallowed.
///
/// The watermark advances after the item loop even when items were
/// skipped, so a persistently malformed feed does not get retried every
/// tick ahead of healthy feeds. Storage errors abort the run before the
/// watermark moves; the scheduler retries that feed on a later tick.
///
/// Returns the number of posts actually inserted.
pub async fn ingest<S: FeedStore>(store: &S, feed: &Feed, parsed: &ParsedFeed) -> Result<u64> {
    let mut added = 0;

    for item in &parsed.items {
        let published_at = match item.pub_date.as_deref() {
            Some(raw) => match parse_pub_date(raw) {
                Ok(at) => Some(at),
                Err(err) => {
                    warn!("skipping '{}' from '{}': {}", item.title, feed.name, err);
                    continue;
                }
            },
            None => None,
        };

        let new_post = NewPost {
            feed_id: feed.id,
            url: &item.link,
            title: &item.title,
            description: item.description.as_deref(),
            published_at,
        };

        match store.create_post(new_post).await {
            Ok(()) => added += 1,
            Err(err) if err.is_conflict() => {
                debug!("already have post {}", item.link);
            }
            Err(err) => return Err(err),
        }
    }

    store.mark_fetched(feed.id, Utc::now()).await?;

    Ok(added)
}

/// RSS 2.0 dates are RFC 1123 with a numeric zone, a subset of RFC 2822.
fn parse_pub_date(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("bad pubDate '{}': {}", raw, e)))
}

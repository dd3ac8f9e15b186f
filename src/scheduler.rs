use std::time::Duration;

use tracing::{debug, info, warn};

use crate::db::FeedStore;
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::ingest::ingest;

/// Parse an interval string like `"1m"` or `"30s"`.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let period =
        humantime::parse_duration(s).map_err(|e| Error::Parse(format!("bad interval '{s}': {e}")))?;
    if period.is_zero() {
        return Err(Error::Parse(format!("interval '{s}' must be positive")));
    }
    Ok(period)
}

/// The polling loop: one feed per tick, oldest watermark first.
///
/// Runs until the process is stopped. No per-feed outcome terminates it:
/// an empty feed table, a dead server, a malformed document or a transient
/// storage failure are all logged and the loop waits for the next tick.
pub async fn run<S: FeedStore>(store: &S, fetcher: &Fetcher, period: Duration) {
    info!(
        "collecting feeds every {}",
        humantime::format_duration(period)
    );

    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        if let Err(err) = tick(store, fetcher).await {
            match err {
                Error::NotFound(_) => debug!("no feeds to fetch yet"),
                err => warn!("fetch cycle failed: {}", err),
            }
        }
    }
}

/// One scheduling cycle: pick the least-recently-fetched feed, fetch it,
/// ingest it.
pub async fn tick<S: FeedStore>(store: &S, fetcher: &Fetcher) -> Result<()> {
    let feed = store.next_feed_to_fetch().await?;
    info!("fetching {} ({})", feed.name, feed.url);

    let parsed = fetcher.fetch(&feed.url).await?;
    let added = ingest(store, &feed, &parsed).await?;

    info!("stored {} new posts from '{}'", added, feed.name);
    Ok(())
}

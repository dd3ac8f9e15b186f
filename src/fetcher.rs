use std::time::Duration;

use reqwest::Client;
use rss::Channel;
use tracing::warn;

use crate::error::{Error, Result};

/// Bound on a single fetch so a dead server cannot stall the scheduler.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// An RSS 2.0 document reduced to the fields the ingest path cares about.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: String,
    pub description: String,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    /// Raw `pubDate` text; timestamp parsing belongs to the ingest step,
    /// which owns the skip-on-bad-date policy.
    pub pub_date: Option<String>,
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent("tidings/0.1 (feed aggregator)")
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// GET the URL and parse the body as RSS 2.0.
    ///
    /// Transport failures, timeouts and non-2xx statuses map to
    /// [`Error::Network`]; a body that is not a well-formed RSS document
    /// maps to [`Error::Parse`]. The XML parser decodes standard entity
    /// escaping, so stored titles and descriptions are human-readable.
    pub async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        let channel = Channel::read_from(&bytes[..]).map_err(|e| Error::Parse(e.to_string()))?;

        let mut items = Vec::new();
        for item in channel.items() {
            let Some(link) = item.link() else {
                warn!(
                    "skipping entry with no link in '{}': {:?}",
                    channel.title(),
                    item.title()
                );
                continue;
            };

            items.push(ParsedItem {
                title: item.title().unwrap_or("Untitled").to_string(),
                link: link.to_string(),
                description: item.description().map(str::to_string),
                pub_date: item.pub_date().map(str::to_string),
            });
        }

        Ok(ParsedFeed {
            title: channel.title().to_string(),
            description: channel.description().to_string(),
            items,
        })
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

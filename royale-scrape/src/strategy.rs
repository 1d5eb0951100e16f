use crate::extract::{decks_from_api_json, decks_from_html};
use crate::model::{Deck, DeckSource};
use anyhow::Result;
use async_trait::async_trait;
use royale_config::ScraperConfig;
use royale_drivers::browser::RoyalePage;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// The page operations strategies rely on.
#[async_trait]
pub trait DeckPage: Send + Sync {
    async fn wait_for_any(
        &self,
        selectors: &[String],
        timeout: Duration,
        poll: Duration,
    ) -> Result<Option<String>>;
    async fn scroll_to_bottom(&self, steps: u32) -> Result<()>;
    async fn content(&self) -> Result<String>;
    async fn resource_urls(&self, needle: &str) -> Result<Vec<String>>;
    async fn fetch_json(&self, url: &str) -> Result<Value>;
}

#[async_trait]
impl DeckPage for RoyalePage {
    async fn wait_for_any(
        &self,
        selectors: &[String],
        timeout: Duration,
        poll: Duration,
    ) -> Result<Option<String>> {
        RoyalePage::wait_for_any(self, selectors, timeout, poll).await
    }

    async fn scroll_to_bottom(&self, steps: u32) -> Result<()> {
        RoyalePage::scroll_to_bottom(self, steps).await
    }

    async fn content(&self) -> Result<String> {
        self.get_content().await
    }

    async fn resource_urls(&self, needle: &str) -> Result<Vec<String>> {
        RoyalePage::resource_urls(self, needle).await
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.fetch_json_in_page(url).await
    }
}

/// One way of pulling decks out of a loaded page.
///
/// An empty `Ok` means "nothing found here", letting the next strategy try.
#[async_trait]
pub trait DeckStrategy: Send + Sync {
    fn source(&self) -> DeckSource;
    async fn extract(&self, page: &dyn DeckPage) -> Result<Vec<Deck>>;
}

/// Replays the page's own deck API request once it shows up in the
/// resource timing buffer.
pub struct NetworkCapture {
    pub needle: String,
    pub timeout: Duration,
    pub poll: Duration,
}

impl NetworkCapture {
    pub fn from_config(cfg: &ScraperConfig) -> Self {
        Self {
            needle: cfg.api_fragment.clone(),
            timeout: Duration::from_secs(cfg.poll_timeout_secs),
            poll: Duration::from_millis(cfg.poll_interval_ms.max(1)),
        }
    }
}

#[async_trait]
impl DeckStrategy for NetworkCapture {
    fn source(&self) -> DeckSource {
        DeckSource::NetworkCapture
    }

    async fn extract(&self, page: &dyn DeckPage) -> Result<Vec<Deck>> {
        let started = Instant::now();
        let url = loop {
            let urls = page.resource_urls(&self.needle).await?;
            if let Some(latest) = urls.last() {
                break latest.clone();
            }
            if started.elapsed() >= self.timeout {
                tracing::debug!(target: "scrape.network", needle = %self.needle, "no matching request observed");
                return Ok(Vec::new());
            }
            sleep(self.poll).await;
        };

        tracing::debug!(target: "scrape.network", %url, "replaying deck api request");
        let payload = page.fetch_json(&url).await?;
        Ok(decks_from_api_json(&payload))
    }
}

/// Reads decks from the rendered DOM with selector fallbacks.
pub struct DomScrape {
    pub deck_selectors: Vec<String>,
    pub card_selectors: Vec<String>,
    pub timeout: Duration,
    pub poll: Duration,
    pub scroll_steps: u32,
}

impl DomScrape {
    pub fn from_config(cfg: &ScraperConfig) -> Self {
        Self {
            deck_selectors: cfg.deck_selectors.clone(),
            card_selectors: cfg.card_selectors.clone(),
            timeout: Duration::from_secs(cfg.poll_timeout_secs),
            poll: Duration::from_millis(cfg.poll_interval_ms.max(1)),
            scroll_steps: cfg.scroll_steps,
        }
    }
}

#[async_trait]
impl DeckStrategy for DomScrape {
    fn source(&self) -> DeckSource {
        DeckSource::DomScrape
    }

    async fn extract(&self, page: &dyn DeckPage) -> Result<Vec<Deck>> {
        let matched = page
            .wait_for_any(&self.deck_selectors, self.timeout, self.poll)
            .await?;
        if matched.is_none() {
            return Ok(Vec::new());
        }
        if self.scroll_steps > 0 {
            page.scroll_to_bottom(self.scroll_steps).await?;
        }
        let html = page.content().await?;
        Ok(decks_from_html(&html, &self.deck_selectors, &self.card_selectors))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Scripted page for strategy and runner tests.
    #[derive(Default)]
    pub struct FakePage {
        /// Successive answers to `resource_urls`; the last one repeats.
        pub resource_polls: Mutex<Vec<Vec<String>>>,
        pub payload: Value,
        pub html: String,
        pub selector_hit: Option<String>,
        pub scrolled: Mutex<u32>,
    }

    #[async_trait]
    impl DeckPage for FakePage {
        async fn wait_for_any(&self, _: &[String], _: Duration, _: Duration) -> Result<Option<String>> {
            Ok(self.selector_hit.clone())
        }
        async fn scroll_to_bottom(&self, _: u32) -> Result<()> {
            *self.scrolled.lock().unwrap() += 1;
            Ok(())
        }
        async fn content(&self) -> Result<String> {
            Ok(self.html.clone())
        }
        async fn resource_urls(&self, _: &str) -> Result<Vec<String>> {
            let mut polls = self.resource_polls.lock().unwrap();
            if polls.len() > 1 {
                Ok(polls.remove(0))
            } else {
                Ok(polls.first().cloned().unwrap_or_default())
            }
        }
        async fn fetch_json(&self, _: &str) -> Result<Value> {
            Ok(self.payload.clone())
        }
    }
}

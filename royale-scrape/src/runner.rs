use crate::model::{Deck, DeckReport, DeckSource};
use crate::strategy::{DeckPage, DeckStrategy, DomScrape, NetworkCapture};
use async_trait::async_trait;
use royale_common::RoyaleError;
use royale_config::ScraperConfig;
use royale_drivers::browser::{RoyaleDriver, StealthProfile};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("No deck data found")]
    NoDecks,
    #[error("browser failure: {0:#}")]
    Browser(#[source] anyhow::Error),
}

impl From<ScrapeError> for RoyaleError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::Browser(e) => RoyaleError::Driver(e),
            ScrapeError::NoDecks => RoyaleError::Scrape(ScrapeError::NoDecks.to_string()),
        }
    }
}

/// An open browser that can load pages.
#[async_trait]
pub trait BrowserSession: Send {
    async fn open(&mut self, url: &str) -> anyhow::Result<Box<dyn DeckPage>>;
    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> anyhow::Result<Box<dyn BrowserSession>>;
}

/// Launches stealth Chrome sessions through a WebDriver endpoint.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    pub webdriver_url: String,
    pub headless: bool,
    pub profile: StealthProfile,
    pub nav_timeout: Duration,
    pub script_timeout: Duration,
}

impl ChromeLauncher {
    pub fn from_config(cfg: &ScraperConfig) -> Self {
        Self {
            webdriver_url: cfg.webdriver_url.clone(),
            headless: cfg.headless,
            profile: StealthProfile::from(cfg.stealth),
            nav_timeout: Duration::from_secs(cfg.nav_timeout_secs),
            script_timeout: Duration::from_secs(cfg.poll_timeout_secs.max(30)),
        }
    }
}

struct ChromeSession {
    driver: RoyaleDriver,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn open(&mut self, url: &str) -> anyhow::Result<Box<dyn DeckPage>> {
        let page = self.driver.goto(url).await?;
        Ok(Box::new(page))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.driver.close().await
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> anyhow::Result<Box<dyn BrowserSession>> {
        let driver = RoyaleDriver::new(&self.webdriver_url, self.headless, self.profile).await?;
        if let Err(e) = driver
            .set_timeouts(self.nav_timeout, self.script_timeout)
            .await
        {
            close_logged(driver.close()).await;
            return Err(e);
        }
        Ok(Box::new(ChromeSession { driver }))
    }
}

/// Close errors never replace the outcome of the work done before closing.
async fn close_logged(close: impl std::future::Future<Output = anyhow::Result<()>>) {
    if let Err(e) = close.await {
        tracing::warn!(target: "scrape.runner", error = %format!("{e:#}"), "browser.close_failed");
    }
}

/// Runs deck strategies inside a browser session with whole-attempt retries.
///
/// Scrapes are serialized; concurrent callers queue behind the running one.
pub struct DeckScraper {
    launcher: Arc<dyn BrowserLauncher>,
    strategies: Vec<Box<dyn DeckStrategy>>,
    target_url: String,
    attempts: u32,
    backoff: Duration,
    gate: Mutex<()>,
}

impl DeckScraper {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        strategies: Vec<Box<dyn DeckStrategy>>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            launcher,
            strategies,
            target_url: target_url.into(),
            attempts: 1,
            backoff: Duration::from_secs(1),
            gate: Mutex::new(()),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Chrome launcher with network capture first, DOM scraping second.
    pub fn from_config(cfg: &ScraperConfig) -> Self {
        Self::with_launcher(Arc::new(ChromeLauncher::from_config(cfg)), cfg)
    }

    /// Same strategy lineup as [`DeckScraper::from_config`] with a custom launcher.
    pub fn with_launcher(launcher: Arc<dyn BrowserLauncher>, cfg: &ScraperConfig) -> Self {
        let strategies: Vec<Box<dyn DeckStrategy>> = vec![
            Box::new(NetworkCapture::from_config(cfg)),
            Box::new(DomScrape::from_config(cfg)),
        ];
        Self::new(launcher, strategies, cfg.target_url.clone())
            .with_attempts(cfg.attempts)
            .with_backoff(Duration::from_millis(cfg.backoff_ms))
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(1u32 << (attempt.saturating_sub(1)).min(16))
    }

    pub async fn scrape(&self) -> Result<DeckReport, ScrapeError> {
        let _running = self.gate.lock().await;

        let mut last_err: Option<anyhow::Error> = None;
        for attempt in 1..=self.attempts {
            tracing::info!(target: "scrape.runner", attempt, url = %self.target_url, "scrape.attempt");
            match self.attempt().await {
                Ok(Some((source, decks))) => {
                    tracing::info!(
                        target: "scrape.runner",
                        attempt,
                        ?source,
                        decks = decks.len(),
                        "scrape.success"
                    );
                    return Ok(DeckReport {
                        decks,
                        source,
                        attempts: attempt,
                    });
                }
                Ok(None) => {
                    tracing::warn!(target: "scrape.runner", attempt, "scrape.empty");
                    last_err = None;
                }
                Err(e) => {
                    tracing::warn!(target: "scrape.runner", attempt, error = %format!("{e:#}"), "scrape.failed");
                    last_err = Some(e);
                }
            }
            if attempt < self.attempts {
                sleep(self.delay_for(attempt)).await;
            }
        }

        Err(match last_err {
            Some(e) => ScrapeError::Browser(e),
            None => ScrapeError::NoDecks,
        })
    }

    async fn attempt(&self) -> anyhow::Result<Option<(DeckSource, Vec<Deck>)>> {
        let mut session = self.launcher.launch().await?;
        let outcome = self.run_strategies(session.as_mut()).await;
        close_logged(session.close()).await;
        outcome
    }

    async fn run_strategies(
        &self,
        session: &mut dyn BrowserSession,
    ) -> anyhow::Result<Option<(DeckSource, Vec<Deck>)>> {
        let page = session.open(&self.target_url).await?;
        let mut first_err = None;
        for strategy in &self.strategies {
            match strategy.extract(page.as_ref()).await {
                Ok(decks) if !decks.is_empty() => return Ok(Some((strategy.source(), decks))),
                Ok(_) => {
                    tracing::debug!(target: "scrape.runner", source = ?strategy.source(), "strategy.empty");
                }
                Err(e) => {
                    tracing::debug!(target: "scrape.runner", source = ?strategy.source(), error = %e, "strategy.failed");
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::fake::FakePage;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    struct Counters {
        launched: AtomicU32,
        closed: AtomicU32,
        open_now: AtomicU32,
        open_peak: AtomicU32,
        close_fails: AtomicBool,
    }

    /// Hands out pages from a script, one per launch.
    struct ScriptedLauncher {
        pages: Mutex<Vec<anyhow::Result<FakePage>>>,
        counters: Arc<Counters>,
    }

    struct ScriptedSession {
        page: Option<anyhow::Result<FakePage>>,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn open(&mut self, _url: &str) -> anyhow::Result<Box<dyn DeckPage>> {
            match self.page.take() {
                Some(Ok(p)) => Ok(Box::new(p)),
                Some(Err(e)) => Err(e),
                None => anyhow::bail!("page already opened"),
            }
        }
        async fn close(self: Box<Self>) -> anyhow::Result<()> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            self.counters.open_now.fetch_sub(1, Ordering::SeqCst);
            if self.counters.close_fails.load(Ordering::SeqCst) {
                anyhow::bail!("chromedriver went away");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserLauncher for ScriptedLauncher {
        async fn launch(&self) -> anyhow::Result<Box<dyn BrowserSession>> {
            self.counters.launched.fetch_add(1, Ordering::SeqCst);
            let now = self.counters.open_now.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.open_peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let page = self.pages.lock().unwrap().remove(0);
            Ok(Box::new(ScriptedSession {
                page: Some(page),
                counters: self.counters.clone(),
            }))
        }
    }

    fn scraper(pages: Vec<anyhow::Result<FakePage>>, attempts: u32) -> (DeckScraper, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let launcher = Arc::new(ScriptedLauncher {
            pages: Mutex::new(pages),
            counters: counters.clone(),
        });
        let cfg = ScraperConfig {
            attempts,
            backoff_ms: 1,
            poll_timeout_secs: 0,
            poll_interval_ms: 1,
            ..ScraperConfig::default()
        };
        (DeckScraper::with_launcher(launcher, &cfg), counters)
    }

    fn empty_page() -> FakePage {
        FakePage::default()
    }

    fn dom_page() -> FakePage {
        FakePage {
            html: r#"<div class="deck_segment"><img class="deck_card" alt="Golem"><img class="deck_card" alt="Night Witch"></div>"#.into(),
            selector_hit: Some(".deck_segment".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn network_capture_is_preferred() {
        let page = FakePage {
            resource_polls: Mutex::new(vec![vec!["https://x/api/decks/popular".into()]]),
            payload: json!({"items": [{"cards": ["Miner", "Poison"]}]}),
            ..dom_page()
        };
        let (scraper, counters) = scraper(vec![Ok(page)], 1);
        let report = scraper.scrape().await.unwrap();
        assert_eq!(report.source, DeckSource::NetworkCapture);
        assert_eq!(report.card_names(), vec![vec!["Miner", "Poison"]]);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_back_to_dom_and_retries_after_empty_attempt() {
        let (scraper, counters) = scraper(vec![Ok(empty_page()), Ok(dom_page())], 3);
        let report = scraper.scrape().await.unwrap();
        assert_eq!(report.source, DeckSource::DomScrape);
        assert_eq!(report.attempts, 2);
        assert_eq!(counters.launched.load(Ordering::SeqCst), 2);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_everywhere_is_no_decks() {
        let (scraper, counters) = scraper(vec![Ok(empty_page()), Ok(empty_page())], 2);
        let err = scraper.scrape().await.unwrap_err();
        assert!(matches!(err, ScrapeError::NoDecks));
        assert_eq!(err.to_string(), "No deck data found");
        assert_eq!(counters.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn browser_is_closed_when_navigation_fails() {
        let (scraper, counters) = scraper(vec![Err(anyhow::anyhow!("net::ERR_TIMED_OUT"))], 1);
        let err = scraper.scrape().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Browser(_)));
        assert!(err.to_string().contains("ERR_TIMED_OUT"));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_failure_keeps_scrape_result() {
        let (scraper, counters) = scraper(vec![Ok(dom_page())], 1);
        counters.close_fails.store(true, Ordering::SeqCst);
        let report = scraper.scrape().await.unwrap();
        assert_eq!(report.card_names(), vec![vec!["Golem", "Night Witch"]]);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_logged_swallows_errors() {
        close_logged(async { Err(anyhow::anyhow!("session not found")) }).await;
        close_logged(async { Ok(()) }).await;
    }

    #[tokio::test]
    async fn concurrent_scrapes_run_one_browser_at_a_time() {
        let (scraper, counters) = scraper(vec![Ok(dom_page()), Ok(dom_page())], 1);
        let (a, b) = tokio::join!(scraper.scrape(), scraper.scrape());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(counters.launched.load(Ordering::SeqCst), 2);
        assert_eq!(counters.open_peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let (scraper, _) = scraper(vec![], 3);
        let scraper = scraper.with_backoff(Duration::from_millis(100));
        assert_eq!(scraper.delay_for(1), Duration::from_millis(100));
        assert_eq!(scraper.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn scrape_errors_map_into_workspace_error() {
        let err: RoyaleError = ScrapeError::NoDecks.into();
        assert!(matches!(err, RoyaleError::Scrape(ref m) if m == "No deck data found"));
        let err: RoyaleError = ScrapeError::Browser(anyhow::anyhow!("boom")).into();
        assert!(matches!(err, RoyaleError::Driver(_)));
    }
}

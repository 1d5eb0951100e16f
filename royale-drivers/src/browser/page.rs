use crate::browser::{
    behavioral::BehavioralEngine,
    fingerprint::UserAgentManager,
    stealth::{StealthProfile, page_scripts},
};
use anyhow::{anyhow, Result};
use fantoccini::{elements::Element, Client, Locator};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

const RESOURCE_URLS_JS: &str = r#"
    const needle = arguments[0];
    return performance.getEntriesByType('resource')
        .map(e => e.name)
        .filter(n => n.includes(needle));
"#;

const FETCH_JSON_JS: &str = r#"
    const done = arguments[arguments.length - 1];
    fetch(arguments[0], { credentials: 'include', headers: { 'Accept': 'application/json' } })
        .then(r => r.json().then(data => done({ ok: r.ok, status: r.status, data })))
        .catch(e => done({ ok: false, status: 0, error: String(e) }));
"#;

const SCROLL_STEP_JS: &str = r#"
    const steps = Math.max(1, arguments[0]);
    window.scrollBy(0, Math.ceil(document.body.scrollHeight / steps));
    return window.scrollY + window.innerHeight >= document.body.scrollHeight;
"#;

/// A loaded page: selector polling, lazy-load scrolling and in-page fetches.
pub struct RoyalePage {
    pub(crate) client: Client,
    pub(crate) stealth_profile: StealthProfile,
    pub(crate) fingerprint_manager: UserAgentManager,
    pub(crate) behavioral_engine: BehavioralEngine,
}

impl RoyalePage {
    /// Construct a page wrapper around an existing WebDriver client.
    pub fn new(
        client: Client,
        stealth_profile: StealthProfile,
        fingerprint_manager: UserAgentManager,
        behavioral_engine: BehavioralEngine,
    ) -> Self {
        Self {
            client,
            stealth_profile,
            fingerprint_manager,
            behavioral_engine,
        }
    }

    /// Navigate to `url`, then run the stealth scripts for the session profile.
    pub async fn goto(&mut self, url: &str) -> Result<()> {
        self.behavioral_engine.random_delay(300, 1200).await;
        self.client.goto(url).await?;

        let ua = self.fingerprint_manager.session_profile();
        for script in page_scripts(self.stealth_profile, ua) {
            self.client.execute(&script, vec![]).await?;
        }
        Ok(())
    }

    /// Full page HTML source.
    pub async fn get_content(&self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Element>> {
        Ok(self.client.find_all(Locator::Css(selector)).await?)
    }

    /// Poll a list of selectors until one of them matches, in list order.
    ///
    /// Returns the selector that matched, or `None` once `timeout` elapses.
    pub async fn wait_for_any(
        &self,
        selectors: &[String],
        timeout: Duration,
        poll: Duration,
    ) -> Result<Option<String>> {
        let started = Instant::now();
        loop {
            for selector in selectors {
                if !self.find_elements(selector).await?.is_empty() {
                    debug!(
                        target: "browser.selector",
                        %selector,
                        waited_ms = started.elapsed().as_millis() as u64,
                        "selector matched"
                    );
                    return Ok(Some(selector.clone()));
                }
            }
            if started.elapsed() >= timeout {
                debug!(target: "browser.selector", ?selectors, "no selector matched before timeout");
                return Ok(None);
            }
            sleep(poll).await;
        }
    }

    /// Scroll down in `steps` increments to trigger lazy loading.
    pub async fn scroll_to_bottom(&self, steps: u32) -> Result<()> {
        for _ in 0..steps.max(1) {
            let at_bottom = self
                .client
                .execute(SCROLL_STEP_JS, vec![json!(steps)])
                .await?;
            self.behavioral_engine.random_delay(250, 700).await;
            if at_bottom.as_bool().unwrap_or(false) {
                break;
            }
        }
        Ok(())
    }

    /// URLs of network resources the page has loaded whose URL contains `needle`.
    pub async fn resource_urls(&self, needle: &str) -> Result<Vec<String>> {
        let value = self
            .client
            .execute(RESOURCE_URLS_JS, vec![json!(needle)])
            .await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// Fetch `url` from inside the page (same cookies and origin) and return its JSON body.
    pub async fn fetch_json_in_page(&self, url: &str) -> Result<Value> {
        let reply = self
            .client
            .execute_async(FETCH_JSON_JS, vec![json!(url)])
            .await?;
        if reply.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(reply.get("data").cloned().unwrap_or(Value::Null));
        }
        let status = reply.get("status").and_then(Value::as_u64).unwrap_or(0);
        let error = reply
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        Err(anyhow!("in-page fetch of {url} failed (status {status}): {error}"))
    }
}

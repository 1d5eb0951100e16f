use crate::browser::{
    behavioral::BehavioralEngine,
    fingerprint::UserAgentManager,
    page::RoyalePage,
    stealth::{build_stealth_arguments, StealthProfile},
};
use anyhow::{Context, Result};
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::time::Duration;
use webdriver::capabilities::Capabilities;

/// Default Chromedriver endpoint.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Thin wrapper around a `fantoccini` WebDriver client with stealth and
/// behavioral helpers.
pub struct RoyaleDriver {
    pub client: Client,
    pub behavioral_engine: BehavioralEngine,
    pub user_agent_manager: UserAgentManager,
    pub stealth_profile: StealthProfile,
}

impl RoyaleDriver {
    /// Connect to a running WebDriver service at `webdriver_url`.
    pub async fn new(
        webdriver_url: &str,
        headless: bool,
        stealth_profile: StealthProfile,
    ) -> Result<Self> {
        let mut user_agent_manager = UserAgentManager::new();
        let ua = user_agent_manager.session_profile();
        let args = build_stealth_arguments(stealth_profile, ua, headless);

        tracing::debug!(
            target: "browser.driver",
            %webdriver_url,
            headless,
            ?stealth_profile,
            user_agent = %ua.user_agent,
            "driver.connect"
        );

        let client = ClientBuilder::native()
            .capabilities(chrome_capabilities(args))
            .connect(webdriver_url)
            .await
            .with_context(|| format!("failed to connect to WebDriver at {webdriver_url}"))?;

        Ok(Self {
            client,
            behavioral_engine: BehavioralEngine::new(),
            user_agent_manager,
            stealth_profile,
        })
    }

    /// Cap how long navigation and async scripts may take.
    pub async fn set_timeouts(&self, page_load: Duration, script: Duration) -> Result<()> {
        self.client
            .update_timeouts(TimeoutConfiguration::new(
                Some(script),
                Some(page_load),
                None,
            ))
            .await?;
        Ok(())
    }

    /// Navigate to `url` and return a [`RoyalePage`] with stealth/fingerprint
    /// scripts applied.
    pub async fn goto(&mut self, url: &str) -> Result<RoyalePage> {
        let mut page = RoyalePage::new(
            self.client.clone(),
            self.stealth_profile,
            self.user_agent_manager.clone(),
            self.behavioral_engine.clone(),
        );
        page.goto(url).await?;
        Ok(page)
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

fn chrome_capabilities(args: Vec<String>) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": args, "excludeSwitches": ["enable-automation"] }),
    );
    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_options_carry_args_and_hide_automation() {
        let caps = chrome_capabilities(vec!["--headless=new".into()]);
        let opts = &caps["goog:chromeOptions"];
        assert_eq!(opts["args"][0], "--headless=new");
        assert_eq!(opts["excludeSwitches"][0], "enable-automation");
    }
}

//! Loader for dashboard configuration with YAML + environment overlays.
//!
//! Precedence, lowest to highest: built-in defaults, YAML sources in the order
//! they were added, then `ROYALE__SECTION__FIELD` environment variables.
//! String values may reference `${VAR}` placeholders which are expanded after
//! merging; unknown variables are left untouched.
//!
//! The upstream token falls back to `CR_API_TOKEN` when no source sets it.
use config::{Config, ConfigError, Environment, File, FileFormat};
use royale_common::StealthLevel;
use royale_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const TOKEN_ENV: &str = "CR_API_TOKEN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoyaleConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub scraper: ScraperConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".into(),
            static_dir: PathBuf::from("pages"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_token: String,
    pub timeout_secs: u64,
    pub retries: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://proxy.royaleapi.dev/v1/".into(),
            api_token: std::env::var(TOKEN_ENV).unwrap_or_default(),
            timeout_secs: 15,
            retries: 2,
        }
    }
}

impl UpstreamConfig {
    /// True when a usable token is present (placeholders that failed to expand don't count).
    pub fn has_token(&self) -> bool {
        let t = self.api_token.trim();
        !t.is_empty() && !t.contains("${")
    }
}

/// Popular-decks scraper settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub stealth: StealthLevel,
    pub target_url: String,
    /// Substring identifying the page's own deck API among network resources.
    pub api_fragment: String,
    pub nav_timeout_secs: u64,
    pub poll_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub attempts: u32,
    pub backoff_ms: u64,
    pub deck_selectors: Vec<String>,
    pub card_selectors: Vec<String>,
    pub scroll_steps: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: true,
            stealth: StealthLevel::Balanced,
            target_url: "https://royaleapi.com/decks/popular".into(),
            api_fragment: "/api/decks/popular".into(),
            nav_timeout_secs: 90,
            poll_timeout_secs: 10,
            poll_interval_ms: 500,
            attempts: 2,
            backoff_ms: 1000,
            deck_selectors: vec![
                ".deck_segment".into(),
                "[data-deck]".into(),
                ".decks .deck".into(),
                "div[class*='deck_card__four_wide']".into(),
            ],
            card_selectors: vec![
                "img.deck_card".into(),
                "img[alt]".into(),
                ".card-name".into(),
            ],
            scroll_steps: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub emit_stderr: bool,
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: true,
            filter: "info,tower_http=info".into(),
            dir: None,
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct RoyaleConfigLoader {
    files: Vec<(PathBuf, bool)>,
    inline: Vec<String>,
}

impl Default for RoyaleConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RoyaleConfigLoader {
    /// Start with defaults plus `ROYALE__` env overrides.
    ///
    /// ```
    /// use royale_config::RoyaleConfigLoader;
    ///
    /// let config = RoyaleConfigLoader::new()
    ///     .with_yaml_str("server:\n  bind: 127.0.0.1:8080")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.server.bind, "127.0.0.1:8080");
    /// assert_eq!(config.upstream.base_url, "https://proxy.royaleapi.dev/v1/");
    /// ```
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            inline: Vec::new(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that is skipped when missing, so env-only deployments work.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet (tests and CLI overrides).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.inline.push(yaml.to_string());
        self
    }

    /// Consume the builder and deserialize the merged sources into [`RoyaleConfig`].
    ///
    /// ```
    /// use royale_config::RoyaleConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_UPSTREAM_TOKEN", "injected-from-env"); }
    ///
    /// let config = RoyaleConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// upstream:
    ///   api_token: "${DOC_UPSTREAM_TOKEN}"
    ///   retries: 0
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.upstream.api_token, "injected-from-env");
    /// assert_eq!(config.upstream.retries, 0);
    ///
    /// unsafe { std::env::remove_var("DOC_UPSTREAM_TOKEN"); }
    /// ```
    pub fn load(self) -> Result<RoyaleConfig, ConfigError> {
        let mut builder = Config::builder();
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.inline {
            builder = builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        }
        builder = builder.add_source(
            Environment::with_prefix("ROYALE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: RoyaleConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        tracing::debug!(
            bind = %typed.server.bind,
            upstream = %typed.upstream.base_url,
            token_loaded = typed.upstream.has_token(),
            "config.loaded"
        );
        Ok(typed)
    }
}

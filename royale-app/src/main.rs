use anyhow::Result;
use clap::{Parser, Subcommand};
use royale_api::RoyaleApi;
use royale_common::RoyaleError;
use royale_common::observability::{LogConfig, init_logging};
use royale_config::{RoyaleConfig, RoyaleConfigLoader};
use royale_scrape::DeckScraper;
use royale_web::AppState;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG: &str = "royale.yaml";

#[derive(Debug, Parser)]
#[command(name = "royale", version, about = "Clash Royale dashboard server and deck scraper")]
struct Cli {
    /// YAML config file; `royale.yaml` is read when present if this is omitted.
    #[arg(long, short, global = true, env = "ROYALE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the dashboard and the JSON relay (default).
    Serve {
        /// Overrides `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one popular-decks scrape and print the result as JSON.
    Scrape {
        #[arg(long)]
        pretty: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<RoyaleConfig> {
    let loader = match path {
        Some(p) => RoyaleConfigLoader::new().with_file(p),
        None => RoyaleConfigLoader::new().with_optional_file(DEFAULT_CONFIG),
    };
    loader
        .load()
        .map_err(|e| RoyaleError::Config(e.to_string()).into())
}

fn build_api(cfg: &RoyaleConfig) -> Result<RoyaleApi> {
    let up = &cfg.upstream;
    if !up.has_token() {
        tracing::warn!(target: "royale.app", "no upstream token configured; set CR_API_TOKEN");
    }
    let token = if up.has_token() { up.api_token.clone() } else { String::new() };
    RoyaleApi::from_settings(
        &up.base_url,
        token,
        Duration::from_secs(up.timeout_secs),
        up.retries,
    )
    .map_err(|e| RoyaleError::Upstream(e.to_string()).into())
}

async fn serve(cfg: RoyaleConfig, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
    let state = AppState::new(build_api(&cfg)?, DeckScraper::from_config(&cfg.scraper));
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    royale_web::serve_listener(listener, state, &cfg.server.static_dir, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "royale.app", error = %e, "ctrl_c handler failed");
        }
        tracing::info!(target: "royale.app", "shutdown requested");
    })
    .await?;
    Ok(())
}

async fn scrape(cfg: RoyaleConfig, pretty: bool) -> Result<()> {
    let report = DeckScraper::from_config(&cfg.scraper)
        .scrape()
        .await
        .map_err(RoyaleError::from)?;
    let body = json!({ "decks": report.card_names() });
    let out = if pretty {
        serde_json::to_string_pretty(&body)?
    } else {
        serde_json::to_string(&body)?
    };
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::from_filename(".env.local").ok();
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_ref())?;

    let log_path = init_logging(LogConfig {
        app_name: "royale",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.emit_stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::debug!(target: "royale.app", log = %log_path.display(), "logging.ready");

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => serve(cfg, bind).await,
        Command::Scrape { pretty } => scrape(cfg, pretty).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_upstream_base_is_an_upstream_error() {
        let mut cfg = RoyaleConfig::default();
        cfg.upstream.base_url = "not a url".into();
        let err = build_api(&cfg).err().expect("expected build_api to fail");
        assert!(matches!(
            err.downcast_ref::<RoyaleError>(),
            Some(RoyaleError::Upstream(_))
        ));
    }

    #[test]
    fn default_upstream_builds_without_token() {
        assert!(build_api(&RoyaleConfig::default()).is_ok());
    }
}

//! Common types and utilities shared across Royale crates.
//!
//! This crate defines the shared error type, the stealth level enum used by
//! both configuration and the browser driver, and the observability helpers.
//! It stays dependency-light so every crate in the workspace can use it.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`RoyaleError`] and [`Result`]: Shared error handling
//! - [`StealthLevel`]: how hard the scraper tries to look like a person
use serde::{Deserialize, Serialize};

pub mod observability;

/// Browser automation stealth level.
///
/// ```rust
/// use royale_common::StealthLevel;
///
/// let level: StealthLevel = serde_json::from_str("\"maximum\"").unwrap();
/// assert_eq!(level, StealthLevel::Maximum);
/// assert_eq!(StealthLevel::default(), StealthLevel::Balanced);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StealthLevel {
    Lightweight,
    #[default]
    Balanced,
    Maximum,
}

/// Error types used across the Royale workspace.
#[derive(thiserror::Error, Debug)]
pub enum RoyaleError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The upstream game API client could not be set up or used.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A scrape attempt finished without usable data.
    #[error("Scrape error: {0}")]
    Scrape(String),

    /// A driver (browser, network, etc.) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`RoyaleError`].
pub type Result<T> = std::result::Result<T, RoyaleError>;

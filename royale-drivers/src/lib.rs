//! Driver layer for browser automation.
//!
//! This crate exposes the WebDriver session and page helpers the deck scraper
//! uses to load dynamically rendered pages without tripping bot checks.
//!
//! - [`browser::driver::RoyaleDriver`]: WebDriver client wrapper
//! - [`browser::page::RoyalePage`]: DOM polling, scrolling and in-page fetch helpers
//! - [`browser::behavioral::BehavioralEngine`]: human-like timings
//! - [`browser::stealth`]: stealth profiles and JS evasions
pub mod browser;

//! Popular-deck scraping.
//!
//! A scrape loads the decks page in a stealth browser session and runs a list
//! of strategies against it until one produces decks:
//!
//! - [`strategy::NetworkCapture`]: find the page's own deck API call among
//!   loaded resources and re-fetch it from inside the page
//! - [`strategy::DomScrape`]: wait for deck containers, scroll, and read card
//!   names out of the rendered HTML
//!
//! [`runner::DeckScraper`] owns the browser lifecycle and retries whole
//! attempts with exponential backoff.
pub mod extract;
pub mod model;
pub mod runner;
pub mod strategy;

pub use model::{Deck, DeckReport, DeckSource};
pub use runner::{ChromeLauncher, DeckScraper, ScrapeError};

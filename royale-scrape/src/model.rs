use serde::{Deserialize, Serialize};

/// One deck as an ordered list of card names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub cards: Vec<String>,
}

/// Which strategy produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckSource {
    NetworkCapture,
    DomScrape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckReport {
    pub decks: Vec<Deck>,
    pub source: DeckSource,
    pub attempts: u32,
}

impl DeckReport {
    /// Wire shape returned by `/api/scrape`: `{"decks": [["Knight", ...], ...]}`.
    pub fn card_names(&self) -> Vec<Vec<String>> {
        self.decks.iter().map(|d| d.cards.clone()).collect()
    }
}

use royale_api::RoyaleApi;
use royale_scrape::DeckScraper;
use std::sync::Arc;

/// Shared handles for every route.
#[derive(Clone)]
pub struct AppState {
    pub api: RoyaleApi,
    pub scraper: Arc<DeckScraper>,
}

impl AppState {
    pub fn new(api: RoyaleApi, scraper: DeckScraper) -> Self {
        Self {
            api,
            scraper: Arc::new(scraper),
        }
    }
}

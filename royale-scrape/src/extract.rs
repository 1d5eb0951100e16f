//! Pure extraction from captured API payloads and rendered HTML.
use crate::model::Deck;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

/// Decks from the site's deck API payload.
///
/// Accepts `{"items": [...]}` or a bare array. Each deck contributes the
/// `name` of every entry in its `cards` array (plain strings are accepted
/// too); decks that yield no names are dropped.
///
/// ```
/// use royale_scrape::extract::decks_from_api_json;
/// use serde_json::json;
///
/// let decks = decks_from_api_json(&json!({
///     "items": [{"cards": [{"name": "Hog Rider"}, {"name": "Log"}]}, {"cards": []}]
/// }));
/// assert_eq!(decks.len(), 1);
/// assert_eq!(decks[0].cards, vec!["Hog Rider", "Log"]);
/// ```
pub fn decks_from_api_json(payload: &Value) -> Vec<Deck> {
    let items = match payload {
        Value::Object(obj) => obj.get("items").and_then(Value::as_array),
        Value::Array(arr) => Some(arr),
        _ => None,
    };
    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|deck| {
            let cards: Vec<String> = deck
                .get("cards")
                .and_then(Value::as_array)?
                .iter()
                .filter_map(|c| match c {
                    Value::String(s) => Some(s.as_str()),
                    other => other.get("name").and_then(Value::as_str),
                })
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            (!cards.is_empty()).then_some(Deck { cards })
        })
        .collect()
}

fn parse_selectors(raw: &[String]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                tracing::warn!(target: "scrape.extract", selector = %s, error = %e, "invalid selector skipped");
                None
            }
        })
        .collect()
}

fn card_name(el: &ElementRef<'_>) -> Option<String> {
    let raw = match el.value().attr("alt") {
        Some(alt) => alt.to_string(),
        None => el.text().collect::<String>(),
    };
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

fn cards_in(container: &ElementRef<'_>, card_selectors: &[Selector]) -> Vec<String> {
    for sel in card_selectors {
        let mut names: Vec<String> = Vec::new();
        for name in container.select(sel).filter_map(|el| card_name(&el)) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        if !names.is_empty() {
            return names;
        }
    }
    Vec::new()
}

/// Decks from rendered HTML using ordered selector fallbacks.
///
/// Container selectors are tried in order and the first one yielding at
/// least one deck wins. Inside a container the first card selector that
/// yields names is used; names come from `alt` when present, else the
/// element's text, deduplicated in document order.
pub fn decks_from_html(html: &str, deck_selectors: &[String], card_selectors: &[String]) -> Vec<Deck> {
    let doc = Html::parse_document(html);
    let deck_sels = parse_selectors(deck_selectors);
    let card_sels = parse_selectors(card_selectors);

    for (idx, deck_sel) in deck_sels.iter().enumerate() {
        let decks: Vec<Deck> = doc
            .select(deck_sel)
            .map(|container| cards_in(&container, &card_sels))
            .filter(|cards| !cards.is_empty())
            .map(|cards| Deck { cards })
            .collect();
        if !decks.is_empty() {
            tracing::debug!(target: "scrape.extract", selector_index = idx, decks = decks.len(), "html decks found");
            return decks;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sels(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn api_json_accepts_bare_array_and_strings() {
        let decks = decks_from_api_json(&json!([
            {"cards": ["Knight", {"name": " Archers "}, {"id": 1}]},
            {"name": "no cards key"}
        ]));
        assert_eq!(decks, vec![Deck { cards: vec!["Knight".into(), "Archers".into()] }]);
    }

    #[test]
    fn api_json_other_shapes_are_empty() {
        assert!(decks_from_api_json(&json!({"data": []})).is_empty());
        assert!(decks_from_api_json(&json!("nope")).is_empty());
    }

    #[test]
    fn html_first_matching_container_selector_wins() {
        let html = r#"
            <div class="deck_segment">
              <img class="deck_card" alt="Hog Rider"><img class="deck_card" alt="Fireball">
              <img class="deck_card" alt="Hog Rider">
            </div>
            <div class="deck_segment"><img class="deck_card" alt="Golem"></div>
            <div data-deck="1"><span class="card-name">Miner</span></div>
        "#;
        let decks = decks_from_html(
            html,
            &sels(&[".missing", ".deck_segment", "[data-deck]"]),
            &sels(&["img.deck_card", ".card-name"]),
        );
        assert_eq!(decks.len(), 2);
        assert_eq!(decks[0].cards, vec!["Hog Rider", "Fireball"]);
        assert_eq!(decks[1].cards, vec!["Golem"]);
    }

    #[test]
    fn html_falls_back_to_text_and_later_selectors() {
        let html = r#"<div data-deck="1"><span class="card-name"> Mega
            Knight </span><span class="card-name">Zap</span></div>"#;
        let decks = decks_from_html(
            html,
            &sels(&["div[", ".deck_segment", "[data-deck]"]),
            &sels(&["img.deck_card", ".card-name"]),
        );
        assert_eq!(decks, vec![Deck { cards: vec!["Mega Knight".into(), "Zap".into()] }]);
    }

    #[test]
    fn html_without_decks_is_empty() {
        let decks = decks_from_html("<p>Checking your browser…</p>", &sels(&[".deck_segment"]), &sels(&["img[alt]"]));
        assert!(decks.is_empty());
    }
}

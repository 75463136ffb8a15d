//! Alternate HTML ingestion path.
//!
//! Some upstream surfaces serve the inventory as a rendered page instead of
//! the JSON API. This parser recovers the same `SearchPage` from HTML so the
//! extraction pipeline is identical downstream: first from the embedded
//! JSON state blob when present, otherwise from the result-card markup.
//!
//! **Update process**: when parsing fails, capture an HTML sample, update
//! the selectors, and add a test fixture.

use crate::error::{Result, WatchError};
use crate::inventory::models::{OptionCode, RawListing, SearchPage};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Embedded JSON state blobs.
static STATE_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[type='application/json']").unwrap());

/// Result container carrying the server-reported match count.
static RESULTS_SECTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section[data-total-matches]").unwrap());

/// One listing card.
static RESULT_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article.result-card").unwrap());

/// Option rows inside a card.
static OPTION_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li[data-group]").unwrap());

/// Parses an inventory results HTML page into the JSON-path page model.
pub fn parse_results_html(html: &str) -> Result<SearchPage> {
    let document = Html::parse_document(html);

    // Prefer the embedded JSON state: it is the same payload the API serves.
    for script in document.select(&STATE_SCRIPT) {
        let text = script.text().collect::<String>();
        if text.contains("total_matches_found") {
            debug!("Using embedded JSON state blob");
            return serde_json::from_str(&text).map_err(|e| {
                WatchError::Transport(format!("embedded inventory state unparseable: {e}"))
            });
        }
    }

    // Fall back to the rendered cards.
    let mut results = Vec::new();
    for card in document.select(&RESULT_CARD) {
        let listing = parse_card(card)?;
        trace!("Parsed card: {}", listing.vin);
        results.push(listing);
    }

    let total_matches_found = document
        .select(&RESULTS_SECTION)
        .next()
        .and_then(|section| section.value().attr("data-total-matches"))
        .and_then(|value| value.parse().ok())
        .unwrap_or(results.len() as u32);

    debug!("Scraped {} cards (total reported: {})", results.len(), total_matches_found);
    Ok(SearchPage { total_matches_found, results })
}

fn parse_card(card: ElementRef) -> Result<RawListing> {
    let vin = required_attr(card, "data-vin", "(unknown)")?;

    let year = required_attr(card, "data-year", &vin)?
        .parse()
        .map_err(|_| malformed(&vin, "data-year is not a number"))?;

    let purchase_price = required_attr(card, "data-price", &vin)?
        .parse()
        .map_err(|_| malformed(&vin, "data-price is not a number"))?;

    let is_demo = card.value().attr("data-demo").is_some_and(|value| value == "true");
    let odometer =
        card.value().attr("data-odometer").and_then(|value| value.parse().ok()).unwrap_or(0.0);
    let odometer_type =
        card.value().attr("data-odometer-type").unwrap_or_default().to_string();

    let mut option_codes = Vec::new();
    for row in card.select(&OPTION_ROW) {
        let element = row.value();
        // data-group is guaranteed by the selector
        let group = element.attr("data-group").unwrap_or_default().to_string();
        option_codes.push(OptionCode {
            group,
            code: element.attr("data-code").map(String::from),
            name: element.attr("data-name").map(String::from).or_else(|| {
                let text = row.text().collect::<String>().trim().to_string();
                (!text.is_empty()).then_some(text)
            }),
            value: element.attr("data-value").map(String::from),
            unit_short: element.attr("data-unit").map(String::from),
            acceleration_value: element.attr("data-accel-value").map(String::from),
            acceleration_unit_short: element.attr("data-accel-unit").map(String::from),
        });
    }

    Ok(RawListing { vin, year, purchase_price, is_demo, odometer, odometer_type, option_codes })
}

fn required_attr(card: ElementRef, attr: &str, vin: &str) -> Result<String> {
    card.value()
        .attr(attr)
        .map(String::from)
        .ok_or_else(|| malformed(vin, &format!("{attr} attribute missing")))
}

fn malformed(vin: &str, reason: &str) -> WatchError {
    WatchError::MalformedListing { vin: vin.to_string(), reason: reason.to_string() }
}

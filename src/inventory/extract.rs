//! Turns raw search results into priced, normalized listing summaries.

use crate::error::{Result, WatchError};
use crate::incentives::{IncentiveEngine, Jurisdiction};
use crate::inventory::models::{ListingSummary, RawListing, SearchPage};
use crate::inventory::pricing::{PricingQuote, PricingResolver};
use tracing::{debug, info};

const MAKE: &str = "Tesla";

/// Extraction pipeline for one search page.
///
/// Any listing failure aborts the whole extraction: partial result sets are
/// never handed to the notifier, and the run controller retries the full run.
pub struct Extractor<'a> {
    resolver: PricingResolver<'a>,
    engine: &'a IncentiveEngine,
    jurisdiction: Jurisdiction,
    referral_discount: f64,
}

impl<'a> Extractor<'a> {
    pub fn new(
        resolver: PricingResolver<'a>,
        engine: &'a IncentiveEngine,
        jurisdiction: Jurisdiction,
        referral_discount: f64,
    ) -> Self {
        Self { resolver, engine, jurisdiction, referral_discount }
    }

    /// Prices every listing on the page, preserving the server's
    /// price-ascending order. Returns the summaries and the server-reported
    /// total match count.
    pub async fn extract(&self, page: &SearchPage) -> Result<(Vec<ListingSummary>, u32)> {
        let mut summaries = Vec::with_capacity(page.results.len());

        for car in &page.results {
            summaries.push(self.summarize(car).await?);
        }

        info!("Extracted {}/{} listings", summaries.len(), page.total_matches_found);
        Ok((summaries, page.total_matches_found))
    }

    async fn summarize(&self, car: &RawListing) -> Result<ListingSummary> {
        let model_code = required_code(car, "MODEL")?;
        let trim_code = required_code(car, "TRIM")?;

        debug!("Pricing {} ({} {})", car.vin, model_code, trim_code);
        let quote = self.resolver.resolve(&car.vin, &model_code, &trim_code, car.purchase_price).await?;

        let incentives = self.engine.total(car, &self.jurisdiction);

        Ok(build_summary(car, quote, incentives, self.referral_discount))
    }
}

/// MODEL and TRIM option codes are mandatory; everything else degrades to an
/// empty display field.
fn required_code(car: &RawListing, group: &str) -> Result<String> {
    car.option(group)
        .and_then(|option| option.code.clone())
        .ok_or_else(|| WatchError::MalformedListing {
            vin: car.vin.clone(),
            reason: format!("{group} option code missing"),
        })
}

fn build_summary(
    car: &RawListing,
    quote: PricingQuote,
    incentives: f64,
    referral: f64,
) -> ListingSummary {
    let demo = if car.is_demo { "[DEMO]".to_string() } else { String::new() };

    // Sub-mile odometers read as new; skip the marker.
    let miles = if car.odometer >= 1.0 {
        format!("[{} {}]", car.odometer as i64, car.odometer_type)
    } else {
        String::new()
    };

    // Display names fall back to option codes when the server omits them.
    let model = non_empty_or(car.option_name("MODEL"), car.option("MODEL"));
    let trim = non_empty_or(car.option_name("TRIM"), car.option("TRIM"));

    ListingSummary {
        year: car.year.to_string(),
        make: MAKE.to_string(),
        model,
        trim,
        demo,
        miles,
        paint: car.option_name("PAINT"),
        wheels: car.option_name("WHEELS").replace("\u{2019}\u{2019}", "''"),
        range: spec_value(car, "SPECS_RANGE"),
        speed: spec_value(car, "SPECS_TOP_SPEED"),
        acceleration: acceleration_spec(car),
        interior: car.option_name("INTERIOR"),
        seating: car.option_name("REAR_SEATS"),
        autopilot: car.option_name("AUTOPILOT"),
        price: car.purchase_price,
        taxes: quote.taxes,
        fees: quote.fees,
        incentives,
        referral,
        link: quote.order_url,
    }
}

fn non_empty_or(name: String, option: Option<&crate::inventory::models::OptionCode>) -> String {
    if !name.is_empty() {
        return name;
    }
    option.and_then(|o| o.code.clone()).unwrap_or_default()
}

/// "{value} {unit_short}" for a spec group, empty when either part is absent.
fn spec_value(car: &RawListing, group: &str) -> String {
    car.option(group)
        .and_then(|option| match (&option.value, &option.unit_short) {
            (Some(value), Some(unit)) => Some(format!("{value} {unit}")),
            _ => None,
        })
        .unwrap_or_default()
}

/// "{accel} {accel_unit} in {value} {unit}", e.g. "0-60 mph in 4.8 sec".
fn acceleration_spec(car: &RawListing) -> String {
    car.option("SPECS_ACCELERATION")
        .and_then(|option| {
            match (
                &option.acceleration_value,
                &option.acceleration_unit_short,
                &option.value,
                &option.unit_short,
            ) {
                (Some(accel), Some(accel_unit), Some(value), Some(unit)) => {
                    Some(format!("{accel} {accel_unit} in {value} {unit}"))
                }
                _ => None,
            }
        })
        .unwrap_or_default()
}

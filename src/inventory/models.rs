//! Data models for inventory search responses and priced listing summaries.

use serde::{Deserialize, Deserializer};

/// One page of inventory search results, as returned by the upstream API.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    /// Server-reported match count; may exceed the listings actually fetched.
    pub total_matches_found: u32,
    /// Raw listings in the server's price-ascending order.
    #[serde(default)]
    pub results: Vec<RawListing>,
}

/// A raw search result record. Only the fields the pipeline consumes are
/// modeled; the upstream payload carries many more.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawListing {
    #[serde(rename = "VIN")]
    pub vin: String,
    #[serde(rename = "Year")]
    pub year: u16,
    #[serde(rename = "PurchasePrice")]
    pub purchase_price: f64,
    #[serde(rename = "IsDemo", default)]
    pub is_demo: bool,
    #[serde(rename = "Odometer", default)]
    pub odometer: f64,
    #[serde(rename = "OdometerType", default)]
    pub odometer_type: String,
    #[serde(rename = "OptionCodeData", default)]
    pub option_codes: Vec<OptionCode>,
}

impl RawListing {
    /// Looks up an option entry by group key (MODEL, TRIM, PAINT, ...).
    pub fn option(&self, group: &str) -> Option<&OptionCode> {
        self.option_codes.iter().find(|code| code.group == group)
    }

    /// Display name for an option group, empty when the group is absent.
    pub fn option_name(&self, group: &str) -> String {
        self.option(group)
            .and_then(|code| code.name.as_deref())
            .map(|name| name.trim().to_string())
            .unwrap_or_default()
    }
}

/// One keyed option group on a raw listing. The upstream mixes strings and
/// numbers in the value fields, so everything is normalized to strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionCode {
    pub group: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub value: Option<String>,
    #[serde(default)]
    pub unit_short: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub acceleration_value: Option<String>,
    #[serde(default)]
    pub acceleration_unit_short: Option<String>,
}

/// Accepts either a JSON string or number and yields its string form.
fn de_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// The normalized, priced record built by the extractor.
///
/// Descriptive fields are display strings and may be empty; empty fields are
/// omitted from rendered output. Monetary figures stay numeric so the
/// payment/net-cost arithmetic is exact.
#[derive(Debug, Clone)]
pub struct ListingSummary {
    pub year: String,
    pub make: String,
    pub model: String,
    pub trim: String,
    /// "[DEMO]" marker, or empty.
    pub demo: String,
    /// "[<odometer> <unit>]" marker, or empty.
    pub miles: String,
    pub paint: String,
    pub wheels: String,
    pub range: String,
    pub speed: String,
    pub acceleration: String,
    pub interior: String,
    pub seating: String,
    pub autopilot: String,
    pub price: f64,
    pub taxes: f64,
    pub fees: f64,
    pub incentives: f64,
    pub referral: f64,
    /// Per-VIN order permalink captured during pricing resolution.
    pub link: String,
}

impl ListingSummary {
    /// Grouping identity: "year make model trim".
    pub fn name(&self) -> String {
        [&self.year, &self.make, &self.model, &self.trim]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// All-in amount due: price plus taxes and fees. Always >= price.
    pub fn payment(&self) -> f64 {
        self.price + self.taxes + self.fees
    }

    /// Payment less incentives and the referral discount. May drop below the
    /// sticker price when incentives are large.
    pub fn net_cost(&self) -> f64 {
        self.payment() - self.incentives - self.referral
    }
}

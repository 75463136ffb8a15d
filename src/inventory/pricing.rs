//! Per-listing pricing resolution: order-page token minting followed by the
//! fees/taxes calculation that consumes those tokens.

use crate::config::Config;
use crate::error::{Result, WatchError};
use crate::inventory::client::{InventoryApi, OrderPage};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;
use tracing::debug;

/// CSRF pair embedded in the order-page body. Non-greedy, spans lines.
static CSRF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"csrf_key":"(.*?)","csrf_token":"(.*?)""#).unwrap());

/// Ephemeral per-listing session state. Minted by one order-page request,
/// consumed by the next fees/taxes request, then dropped. Never cached or
/// reused across listings.
#[derive(Debug)]
pub struct PricingContext {
    pub order_url: String,
    pub coin_auth: String,
    pub csrf_name: String,
    pub csrf_value: String,
}

impl PricingContext {
    /// Extracts the session cookie and CSRF pair from an order-page response.
    fn from_order_page(vin: &str, page: OrderPage) -> Result<Self> {
        let coin_auth = page.coin_auth.ok_or_else(|| WatchError::MissingToken {
            vin: vin.to_string(),
            reason: "coin_auth cookie absent from order response".to_string(),
        })?;

        let captures = CSRF_RE.captures(&page.body).ok_or_else(|| WatchError::MissingToken {
            vin: vin.to_string(),
            reason: "csrf_key/csrf_token pair not found in order response body".to_string(),
        })?;

        Ok(Self {
            order_url: page.url,
            coin_auth,
            csrf_name: captures[1].to_string(),
            csrf_value: captures[2].to_string(),
        })
    }
}

/// Authoritative tax and fee totals for one listing, plus its permalink.
/// The two totals are kept separate; callers combine as needed.
#[derive(Debug, Clone)]
pub struct PricingQuote {
    pub order_url: String,
    pub taxes: f64,
    pub fees: f64,
}

/// Resolves per-listing order identifiers and tax/fee totals.
///
/// The two calls are inherently sequential per listing: the second depends on
/// tokens minted by the first.
pub struct PricingResolver<'a> {
    api: &'a dyn InventoryApi,
    country: String,
    city: String,
    state: String,
    postal: String,
}

impl<'a> PricingResolver<'a> {
    /// Creates a resolver bound to the configured jurisdiction.
    pub fn new(api: &'a dyn InventoryApi, config: &Config) -> Self {
        Self {
            api,
            country: config.country.clone(),
            city: config.city.clone(),
            state: config.state.clone(),
            postal: config.zipcode.clone(),
        }
    }

    /// Fetches order identifiers for a VIN and then its tax/fee totals.
    pub async fn resolve(
        &self,
        vin: &str,
        model_code: &str,
        trim_code: &str,
        price: f64,
    ) -> Result<PricingQuote> {
        let page = self.api.order_page(vin).await?;
        let context = PricingContext::from_order_page(vin, page)?;

        debug!("Resolved session tokens for {}", vin);

        let body = self.request_body(model_code, trim_code, price, &context);
        // Context moves in; tokens die with this call.
        let PricingContext { order_url, coin_auth, .. } = context;
        let response = self.api.fees_and_taxes(&order_url, &coin_auth, &body).await?;

        let (taxes, fees) = parse_totals(&response)?;
        debug!("Priced {}: taxes={:.2} fees={:.2}", vin, taxes, fees);

        Ok(PricingQuote { order_url, taxes, fees })
    }

    /// The calculator body. The CSRF value rides under three keys: its own
    /// dynamic name plus the fixed csrf_name/csrf_value pair.
    fn request_body(
        &self,
        model_code: &str,
        trim_code: &str,
        price: f64,
        context: &PricingContext,
    ) -> Value {
        let mut body = Map::new();
        body.insert("country".to_string(), json!(self.country));
        body.insert("city".to_string(), json!(self.city));
        body.insert("state".to_string(), json!(self.state));
        body.insert("postalCode".to_string(), json!(self.postal));
        body.insert("basePrice".to_string(), json!(0));
        body.insert("vehiclePrice".to_string(), json!(price as i64));
        body.insert("modelCode".to_string(), json!(model_code));
        body.insert("trimCode".to_string(), json!(trim_code));
        body.insert(context.csrf_name.clone(), json!(context.csrf_value));
        body.insert("csrf_name".to_string(), json!(context.csrf_name));
        body.insert("csrf_value".to_string(), json!(context.csrf_value));
        Value::Object(body)
    }
}

/// Sums the `amount` field across the response's tax and fee line items.
fn parse_totals(response: &str) -> Result<(f64, f64)> {
    let costs: Value = serde_json::from_str(response)
        .map_err(|e| WatchError::Transport(format!("unexpected fees/taxes payload: {e}")))?;

    let cash = costs.get("AUTO_CASH").ok_or_else(|| {
        WatchError::Transport("fees/taxes payload missing AUTO_CASH section".to_string())
    })?;

    Ok((sum_amounts(cash.get("taxes")), sum_amounts(cash.get("fees"))))
}

fn sum_amounts(items: Option<&Value>) -> f64 {
    items
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(|item| amount_of(item.get("amount"))).sum())
        .unwrap_or(0.0)
}

/// Amounts arrive as numbers or numeric strings depending on the line item.
fn amount_of(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock API that records the calculator body and serves canned responses.
    struct MockApi {
        order: OrderPage,
        costs: String,
        seen_body: Mutex<Option<Value>>,
    }

    impl MockApi {
        fn new(order: OrderPage, costs: &str) -> Self {
            Self { order, costs: costs.to_string(), seen_body: Mutex::new(None) }
        }
    }

    #[async_trait]
    impl InventoryApi for MockApi {
        async fn search(&self) -> crate::error::Result<String> {
            unimplemented!("not used by pricing tests")
        }

        async fn order_page(&self, _vin: &str) -> crate::error::Result<OrderPage> {
            Ok(self.order.clone())
        }

        async fn fees_and_taxes(
            &self,
            _referrer: &str,
            _coin_auth: &str,
            body: &Value,
        ) -> crate::error::Result<String> {
            *self.seen_body.lock().unwrap() = Some(body.clone());
            Ok(self.costs.clone())
        }
    }

    fn make_order_page() -> OrderPage {
        OrderPage {
            url: "https://www.tesla.com/my/order/VIN1?postal=07065".to_string(),
            coin_auth: Some("tok123".to_string()),
            body: r#"{"app":{"csrf_key":"_csrf","csrf_token":"secret-token"}}"#.to_string(),
        }
    }

    const COSTS: &str = r#"{"AUTO_CASH":{
        "fees":[{"amount":250},{"amount":"1390"}],
        "taxes":[{"amount":3245.59}]
    }}"#;

    #[tokio::test]
    async fn test_resolve_returns_separate_totals() {
        let api = MockApi::new(make_order_page(), COSTS);
        let resolver = PricingResolver::new(&api, &Config::default());

        let quote = resolver.resolve("VIN1", "my", "LRAWD", 48990.0).await.unwrap();
        assert_eq!(quote.taxes, 3245.59);
        assert_eq!(quote.fees, 1640.0);
        assert_eq!(quote.order_url, "https://www.tesla.com/my/order/VIN1?postal=07065");
    }

    #[tokio::test]
    async fn test_calculator_body_carries_csrf_under_three_keys() {
        let api = MockApi::new(make_order_page(), COSTS);
        let resolver = PricingResolver::new(&api, &Config::default());

        resolver.resolve("VIN1", "my", "LRAWD", 48990.0).await.unwrap();

        let body = api.seen_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["country"], "US");
        assert_eq!(body["state"], "NJ");
        assert_eq!(body["postalCode"], "07065");
        assert_eq!(body["basePrice"], 0);
        assert_eq!(body["vehiclePrice"], 48990);
        assert_eq!(body["modelCode"], "my");
        assert_eq!(body["trimCode"], "LRAWD");
        assert_eq!(body["_csrf"], "secret-token");
        assert_eq!(body["csrf_name"], "_csrf");
        assert_eq!(body["csrf_value"], "secret-token");
    }

    #[tokio::test]
    async fn test_missing_cookie_is_missing_token() {
        let mut order = make_order_page();
        order.coin_auth = None;

        let api = MockApi::new(order, COSTS);
        let resolver = PricingResolver::new(&api, &Config::default());

        let err = resolver.resolve("VIN1", "my", "LRAWD", 48990.0).await.unwrap_err();
        assert!(matches!(err, WatchError::MissingToken { .. }));
        assert!(err.to_string().contains("coin_auth"));
    }

    #[tokio::test]
    async fn test_missing_csrf_pair_is_missing_token() {
        let mut order = make_order_page();
        order.body = "<html>nothing useful</html>".to_string();

        let api = MockApi::new(order, COSTS);
        let resolver = PricingResolver::new(&api, &Config::default());

        let err = resolver.resolve("VIN1", "my", "LRAWD", 48990.0).await.unwrap_err();
        assert!(matches!(err, WatchError::MissingToken { .. }));
    }

    #[test]
    fn test_csrf_regex_spans_lines() {
        let body = "prefix\n\"csrf_key\":\"_csrf\",\"csrf_token\":\"tok\nwith-newline\"\nsuffix";
        let captures = CSRF_RE.captures(body).unwrap();
        assert_eq!(&captures[1], "_csrf");
        assert_eq!(&captures[2], "tok\nwith-newline");
    }

    #[test]
    fn test_csrf_regex_is_non_greedy() {
        let body = r#""csrf_key":"a","csrf_token":"b" ... "csrf_key":"c","csrf_token":"d""#;
        let captures = CSRF_RE.captures(body).unwrap();
        assert_eq!(&captures[1], "a");
        assert_eq!(&captures[2], "b");
    }

    #[test]
    fn test_parse_totals_handles_string_amounts() {
        let (taxes, fees) = parse_totals(COSTS).unwrap();
        assert_eq!(taxes, 3245.59);
        assert_eq!(fees, 1640.0);
    }

    #[test]
    fn test_parse_totals_empty_lists() {
        let (taxes, fees) = parse_totals(r#"{"AUTO_CASH":{"fees":[],"taxes":[]}}"#).unwrap();
        assert_eq!(taxes, 0.0);
        assert_eq!(fees, 0.0);
    }

    #[test]
    fn test_parse_totals_missing_section_is_transport() {
        let err = parse_totals(r#"{"something":"else"}"#).unwrap_err();
        assert!(matches!(err, WatchError::Transport(_)));

        let err = parse_totals("not json").unwrap_err();
        assert!(matches!(err, WatchError::Transport(_)));
    }
}

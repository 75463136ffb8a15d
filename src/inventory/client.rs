//! HTTP client for the inventory and configurator APIs using wreq for TLS
//! fingerprint emulation.

use crate::config::Config;
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use rand::RngExt;
use std::time::Duration;
use tracing::{debug, info, warn};
use wreq::Client;
use wreq_util::Emulation;

/// Raw order-flow response: the redirected URL, the session cookie (when the
/// server set one), and the body text carrying the embedded CSRF pair.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub url: String,
    pub coin_auth: Option<String>,
    pub body: String,
}

/// Trait over the three upstream endpoints - enables mocking for tests.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Fetches one page of inventory search results (raw JSON body).
    async fn search(&self) -> Result<String>;

    /// Fetches the per-VIN order page used to mint session tokens.
    async fn order_page(&self, vin: &str) -> Result<OrderPage>;

    /// Posts a fees/taxes calculation. Non-200 maps to `PricingService`.
    async fn fees_and_taxes(
        &self,
        referrer: &str,
        coin_auth: &str,
        body: &serde_json::Value,
    ) -> Result<String>;
}

/// Inventory HTTP client with browser impersonation and anti-bot measures.
pub struct InventoryClient {
    client: Client,
    config: Config,
    delay_ms: u64,
    delay_jitter_ms: u64,
    base_url: Option<String>,
}

impl InventoryClient {
    /// Creates a new client with the given configuration.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_base_url(config, None).await
    }

    /// Creates a new client with an optional custom base URL (for testing).
    pub async fn with_base_url(config: &Config, base_url: Option<String>) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10));

        // Configure proxy if specified
        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url)?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            config: config.clone(),
            delay_ms: config.delay_ms,
            delay_jitter_ms: config.delay_jitter_ms,
            base_url,
        })
    }

    /// Returns the base URL (custom for testing, or production default).
    fn base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| "https://www.tesla.com".to_string())
    }

    /// The compact JSON value sent as the `query` parameter of a search.
    fn search_query(&self) -> serde_json::Value {
        let c = &self.config;
        serde_json::json!({
            "query": {
                "model": c.model,
                "condition": "new",
                "options": { "TRIM": [c.trim] },
                "arrangeby": "Price",
                "order": "asc",
                "market": c.country,
                "language": "en",
                "lat": c.latitude,
                "lng": c.longitude,
                "zip": c.zipcode,
                "range": 0,
                "region": c.state
            },
            "offset": 0,
            "count": c.top_results_count,
            "outsideOffset": 0,
            "outsideSearch": false
        })
    }

    /// Issues a GET with the shared browser-emulation header set.
    async fn get(&self, url: &str) -> Result<wreq::Response> {
        // Human-like delay with jitter between outbound calls
        self.delay().await;

        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "*/*")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Dnt", "1")
            .header("Referer", self.config.browser_url())
            .header("Sec-Fetch-Dest", "empty")
            .header("Sec-Fetch-Mode", "cors")
            .header("Sec-Fetch-Site", "same-origin")
            .send()
            .await
            .map_err(|e| WatchError::Transport(format!("GET {url}: {e}")))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == 403 || status == 429 {
            warn!("Blocked ({}). Consider using a proxy or increasing delay.", status);
        }

        Ok(response)
    }

    /// Adds a random delay to mimic human behavior.
    async fn delay(&self) {
        if self.delay_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total_delay = self.delay_ms + jitter;
        debug!("Delaying {}ms", total_delay);
        tokio::time::sleep(Duration::from_millis(total_delay)).await;
    }
}

#[async_trait]
impl InventoryApi for InventoryClient {
    async fn search(&self) -> Result<String> {
        let query = self.search_query().to_string();
        let url = format!(
            "{}/inventory/api/v1/inventory-results?query={}",
            self.base_url(),
            urlencoding::encode(&query)
        );

        info!("Searching inventory: model={} trim={}", self.config.model, self.config.trim);
        let response = self.get(&url).await?;

        let status = response.status();
        if !status.is_success() {
            // Keep the full URL for diagnosability; these APIs drift silently.
            return Err(WatchError::Transport(format!("search failed: URL={url} status={status}")));
        }

        response
            .text()
            .await
            .map_err(|e| WatchError::Transport(format!("search body read failed: {e}")))
    }

    async fn order_page(&self, vin: &str) -> Result<OrderPage> {
        let c = &self.config;
        let url = format!(
            "{}/{}/order/{}?postal={}&region={}&coord={}",
            self.base_url(),
            c.model,
            vin,
            urlencoding::encode(&c.zipcode),
            urlencoding::encode(&c.state),
            urlencoding::encode(&c.coord())
        );

        info!("Fetching order page: {}", vin);
        let response = self.get(&url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Transport(format!(
                "order page failed: URL={url} status={status}"
            )));
        }

        // The final URI reflects any redirect; it becomes the permalink.
        let final_url = response.uri().to_string();
        let coin_auth = response
            .cookies()
            .find(|cookie| cookie.name() == "coin_auth")
            .map(|cookie| cookie.value().to_string());

        let body = response
            .text()
            .await
            .map_err(|e| WatchError::Transport(format!("order body read failed: {e}")))?;

        Ok(OrderPage { url: final_url, coin_auth, body })
    }

    async fn fees_and_taxes(
        &self,
        referrer: &str,
        coin_auth: &str,
        body: &serde_json::Value,
    ) -> Result<String> {
        self.delay().await;

        let url = format!("{}/configurator/api/v3/fees-taxes-calculator", self.base_url());
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "*/*")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Content-Type", "application/json")
            .header("Origin", "www.tesla.com")
            .header("Referer", referrer)
            .header("Cookie", format!("coin_auth={coin_auth}"))
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| WatchError::Transport(format!("POST {url}: {e}")))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status.as_u16() != 200 {
            return Err(WatchError::PricingService { status: status.as_u16() });
        }

        response
            .text()
            .await
            .map_err(|e| WatchError::Transport(format!("fees/taxes body read failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_test_config() -> Config {
        let mut config = Config::default();
        config.delay_ms = 0; // No delay for tests
        config.delay_jitter_ms = 0;
        config.top_results_count = 2;
        config
    }

    #[test]
    fn test_search_query_shape() {
        let config = make_test_config();
        let client = tokio_test::block_on(InventoryClient::with_base_url(&config, None)).unwrap();

        let query = client.search_query();
        assert_eq!(query["query"]["model"], "my");
        assert_eq!(query["query"]["condition"], "new");
        assert_eq!(query["query"]["options"]["TRIM"][0], "LRAWD");
        assert_eq!(query["query"]["arrangeby"], "Price");
        assert_eq!(query["query"]["order"], "asc");
        assert_eq!(query["query"]["zip"], "07065");
        assert_eq!(query["count"], 2);
        assert_eq!(query["outsideSearch"], false);

        // Compact encoding, no pretty-printing
        let encoded = query.to_string();
        assert!(!encoded.contains('\n'));
        assert!(!encoded.contains(": "));
    }

    #[tokio::test]
    async fn test_search_success() {
        let mock_server = MockServer::start().await;

        let page = r#"{"total_matches_found": 1, "results": []}"#;
        Mock::given(method("GET"))
            .and(path("/inventory/api/v1/inventory-results"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&mock_server)
            .await;

        let config = make_test_config();
        let client =
            InventoryClient::with_base_url(&config, Some(mock_server.uri())).await.unwrap();

        let body = client.search().await.unwrap();
        assert!(body.contains("total_matches_found"));
    }

    #[tokio::test]
    async fn test_search_non_2xx_is_transport_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/inventory/api/v1/inventory-results"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let config = make_test_config();
        let client =
            InventoryClient::with_base_url(&config, Some(mock_server.uri())).await.unwrap();

        let err = client.search().await.unwrap_err();
        assert!(matches!(err, WatchError::Transport(_)));
        // Error text must carry the attempted URL
        assert!(err.to_string().contains("/inventory/api/v1/inventory-results"));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_order_page_captures_cookie_and_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/my/order/5YJYGDEE1MF000001"))
            .and(query_param("postal", "07065"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "coin_auth=tok123; Path=/")
                    .set_body_string(r#"{"csrf_key":"_csrf","csrf_token":"abc"}"#),
            )
            .mount(&mock_server)
            .await;

        let config = make_test_config();
        let client =
            InventoryClient::with_base_url(&config, Some(mock_server.uri())).await.unwrap();

        let page = client.order_page("5YJYGDEE1MF000001").await.unwrap();
        assert_eq!(page.coin_auth.as_deref(), Some("tok123"));
        assert!(page.body.contains("csrf_key"));
        assert!(page.url.contains("/my/order/5YJYGDEE1MF000001"));
    }

    #[tokio::test]
    async fn test_order_page_missing_cookie_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/my/order/VIN1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("no tokens here"))
            .mount(&mock_server)
            .await;

        let config = make_test_config();
        let client =
            InventoryClient::with_base_url(&config, Some(mock_server.uri())).await.unwrap();

        let page = client.order_page("VIN1").await.unwrap();
        assert!(page.coin_auth.is_none());
    }

    #[tokio::test]
    async fn test_fees_and_taxes_success() {
        let mock_server = MockServer::start().await;

        let costs = r#"{"AUTO_CASH":{"fees":[{"amount":250}],"taxes":[{"amount":3245.59}]}}"#;
        Mock::given(method("POST"))
            .and(path("/configurator/api/v3/fees-taxes-calculator"))
            .respond_with(ResponseTemplate::new(200).set_body_string(costs))
            .mount(&mock_server)
            .await;

        let config = make_test_config();
        let client =
            InventoryClient::with_base_url(&config, Some(mock_server.uri())).await.unwrap();

        let body = client
            .fees_and_taxes("https://referrer", "tok", &serde_json::json!({"vehiclePrice": 48990}))
            .await
            .unwrap();
        assert!(body.contains("AUTO_CASH"));
    }

    #[tokio::test]
    async fn test_fees_and_taxes_non_200_carries_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/configurator/api/v3/fees-taxes-calculator"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let config = make_test_config();
        let client =
            InventoryClient::with_base_url(&config, Some(mock_server.uri())).await.unwrap();

        let err = client
            .fees_and_taxes("https://referrer", "tok", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::PricingService { status: 403 }));
    }

    #[tokio::test]
    async fn test_base_url_default() {
        let config = make_test_config();
        let client = InventoryClient::new(&config).await.unwrap();
        assert_eq!(client.base_url(), "https://www.tesla.com");
    }

    #[tokio::test]
    async fn test_base_url_custom() {
        let config = make_test_config();
        let client =
            InventoryClient::with_base_url(&config, Some("http://custom.url".to_string()))
                .await
                .unwrap();
        assert_eq!(client.base_url(), "http://custom.url");
    }
}

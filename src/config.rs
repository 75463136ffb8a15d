//! Configuration management with TOML, environment variables, and CLI overrides.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Application configuration with layered loading.
///
/// Geocoding and timezone lookup are external collaborators: the
/// latitude/longitude/timezone triple is supplied here rather than resolved
/// from the street address at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Address and jurisdiction
    #[serde(default)]
    pub street: String,
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_county")]
    pub county: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_zipcode")]
    pub zipcode: String,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    /// IANA timezone identifier used for report timestamps.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    // Vehicle search
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_trim")]
    pub trim: String,
    /// Fixed discount applied to every listing's net cost.
    #[serde(default = "default_referral_discount")]
    pub referral_discount: f64,
    #[serde(default = "default_top_results_count")]
    pub top_results_count: usize,

    // Operational
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    /// Uniform random retry backoff, inclusive bounds in seconds.
    #[serde(default = "default_backoff_min_secs")]
    pub backoff_min_secs: u64,
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
    /// Sleep between successful runs in watch mode.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base delay between outbound requests in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Random jitter added to the request delay (0 to this value).
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,
    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    // Notification
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP credentials come from the environment only, never the file.
    #[serde(skip)]
    pub smtp_user: Option<String>,
    #[serde(skip)]
    pub smtp_password: Option<String>,
    #[serde(default = "default_mailing_list_path")]
    pub mailing_list_path: String,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

fn default_city() -> String {
    "Rahway".to_string()
}

fn default_county() -> String {
    "Union".to_string()
}

fn default_state() -> String {
    "NJ".to_string()
}

fn default_country() -> String {
    "US".to_string()
}

fn default_zipcode() -> String {
    "07065".to_string()
}

fn default_latitude() -> f64 {
    40.6041777
}

fn default_longitude() -> f64 {
    -74.2824862
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_model() -> String {
    "my".to_string()
}

fn default_trim() -> String {
    "LRAWD".to_string()
}

fn default_referral_discount() -> f64 {
    500.0
}

fn default_top_results_count() -> usize {
    10
}

fn default_max_retry_attempts() -> u32 {
    5
}

fn default_backoff_min_secs() -> u64 {
    3
}

fn default_backoff_max_secs() -> u64 {
    9
}

fn default_interval_secs() -> u64 {
    60 * 60 * 3
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_delay_ms() -> u64 {
    500
}

fn default_delay_jitter_ms() -> u64 {
    500
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_mailing_list_path() -> String {
    "resources/mailing_list.txt".to_string()
}

fn default_snapshot_path() -> String {
    "resources/last_results.txt".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            street: String::new(),
            city: default_city(),
            county: default_county(),
            state: default_state(),
            country: default_country(),
            zipcode: default_zipcode(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            timezone: default_timezone(),
            model: default_model(),
            trim: default_trim(),
            referral_discount: default_referral_discount(),
            top_results_count: default_top_results_count(),
            max_retry_attempts: default_max_retry_attempts(),
            backoff_min_secs: default_backoff_min_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            proxy: None,
            smtp_host: default_smtp_host(),
            smtp_user: None,
            smtp_password: None,
            mailing_list_path: default_mailing_list_path(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("tsla-watcher").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(user) = std::env::var("SMTP_USER_EMAIL") {
            if !user.is_empty() {
                self.smtp_user = Some(user);
            }
        }

        if let Ok(password) = std::env::var("SMTP_USER_PASSWORD") {
            if !password.is_empty() {
                self.smtp_password = Some(password);
            }
        }

        if let Ok(proxy) = std::env::var("TSLA_PROXY") {
            self.proxy = Some(proxy);
        }

        self
    }

    /// Parses the configured IANA timezone identifier.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone '{}': {}", self.timezone, e))
    }

    /// The human-facing inventory search URL, used as permalink and referer.
    pub fn browser_url(&self) -> String {
        format!(
            "https://www.tesla.com/inventory/new/{}?TRIM={}&arrangeby=plh&zip={}&range=0",
            self.model, self.trim, self.zipcode
        )
    }

    /// Mailing-address text with the county suffixed when the suffix is missing.
    pub fn address_text(&self) -> String {
        let county = if self.county.to_lowercase().ends_with("county") || self.county.is_empty() {
            self.county.clone()
        } else {
            format!("{} County", self.county.trim())
        };

        [&self.street, &self.city, &county, &self.state, &self.country, &self.zipcode]
            .iter()
            .filter(|line| !line.is_empty())
            .map(|line| line.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Coordinate pair in "lat,lng" form for order-page requests.
    pub fn coord(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

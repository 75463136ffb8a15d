//! The run controller: search, price, render, notify, and retry.

use crate::config::Config;
use crate::error::{Result, WatchError};
use crate::format::{make_banner, ResultPage, View};
use crate::incentives::{IncentiveEngine, Jurisdiction};
use crate::inventory::{scrape, Extractor, InventoryApi, PricingResolver, SearchPage};
use crate::notify::{Mailer, Notifier, Recipients};
use crate::snapshot::SnapshotStore;
use chrono::Utc;
use chrono_tz::Tz;
use rand::RngExt;
use std::time::Duration;
use tracing::{error, info, warn};

/// Owns one polling cycle end to end, plus the retry and scheduling logic
/// around it.
pub struct Watcher<A> {
    config: Config,
    api: A,
    engine: IncentiveEngine,
    recipients: Recipients,
    mailer: Option<Box<dyn Mailer>>,
    store: Box<dyn SnapshotStore>,
    tz: Tz,
}

impl<A: InventoryApi> Watcher<A> {
    pub fn new(
        config: Config,
        api: A,
        engine: IncentiveEngine,
        recipients: Recipients,
        mailer: Option<Box<dyn Mailer>>,
        store: Box<dyn SnapshotStore>,
    ) -> anyhow::Result<Self> {
        let tz = config.tz()?;
        Ok(Self { config, api, engine, recipients, mailer, store, tz })
    }

    /// One cycle with retries. Transient failures are retried with a random
    /// backoff up to the configured attempt cap; anything else fails fast.
    pub async fn run_once(&self) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.attempt_run().await {
                Ok(banner) => return Ok(banner),
                Err(e) if e.is_retryable() && attempt < self.config.max_retry_attempts => {
                    warn!("Failed attempt #{}: {}", attempt, e);
                    self.backoff().await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Polls forever, one cycle per interval. Failed cycles are logged and
    /// the schedule keeps going.
    pub async fn watch(&self) {
        loop {
            match self.run_once().await {
                Ok(banner) => println!("{banner}"),
                Err(e) => error!("Run failed: {}", e),
            }
            info!("Sleeping {}s until the next run", self.config.interval_secs);
            tokio::time::sleep(Duration::from_secs(self.config.interval_secs)).await;
        }
    }

    async fn attempt_run(&self) -> Result<String> {
        let raw = self.api.search().await?;
        // The endpoint occasionally serves a rendered page instead of JSON;
        // fall back to scraping before declaring the payload unusable.
        let page: SearchPage = match serde_json::from_str(&raw) {
            Ok(page) => page,
            Err(e) => {
                let scraped = scrape::parse_results_html(&raw)?;
                if scraped.results.is_empty() && scraped.total_matches_found == 0 {
                    return Err(WatchError::Transport(format!("unexpected search payload: {e}")));
                }
                warn!("Search returned HTML; scraped {} listings", scraped.results.len());
                scraped
            }
        };

        let resolver = PricingResolver::new(&self.api, &self.config);
        let extractor = Extractor::new(
            resolver,
            &self.engine,
            Jurisdiction::from(&self.config),
            self.config.referral_discount,
        );
        let (cars, total) = extractor.extract(&page).await?;

        let results = ResultPage::new(self.timestamp(), total, self.config.browser_url(), cars);
        info!("Search results:\n{}", results.render(View::Plain));

        // A failed notification keeps the cycle's results: report them and
        // leave the snapshot for the next cycle to diff against.
        let notifier = Notifier::new(&self.recipients, self.mailer.as_deref(), self.store.as_ref());
        let (subject, addressed) = match notifier.dispatch(&results).await {
            Ok(dispatch) => (dispatch.subject, dispatch.recipients),
            Err(e) => {
                warn!("Notification failed: {}", e);
                (results.subject(None), Vec::new())
            }
        };

        let sender = self
            .mailer
            .as_ref()
            .map(|mailer| mailer.sender().to_string())
            .or_else(|| self.config.smtp_user.clone())
            .unwrap_or_default();
        Ok(make_banner(&sender, &addressed, &subject, &results.render(View::Plain)))
    }

    /// Report timestamps like "Mar 7, 9 PM", in the configured timezone.
    fn timestamp(&self) -> String {
        Utc::now()
            .with_timezone(&self.tz)
            .format("%b %d, %I %p")
            .to_string()
            .replace(" 0", " ")
    }

    async fn backoff(&self) {
        let secs = rand::rng()
            .random_range(self.config.backoff_min_secs..=self.config.backoff_max_secs);
        info!("Backing off {}s before retrying", secs);
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
}

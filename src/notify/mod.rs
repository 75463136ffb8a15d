//! Notification dispatch: change detection, channel fan-out, and snapshot
//! persistence for the next run's comparison.

pub mod diff;
pub mod mailer;
pub mod recipients;

pub use mailer::{Mailer, SmtpMailer};
pub use recipients::{parse_recipients, Recipients};

use crate::error::{Result, WatchError};
use crate::format::{ResultPage, View};
use crate::snapshot::SnapshotStore;
use tracing::{info, warn};

/// What a dispatch cycle did, for the run report.
#[derive(Debug)]
pub struct Dispatch {
    /// The email subject used (with the no-change suffix when applicable).
    pub subject: String,
    /// Everyone addressed this cycle, email then SMS.
    pub recipients: Vec<String>,
    /// Set when the results matched the previous snapshot.
    pub unchanged_since: Option<String>,
}

/// Routes a result page to its recipients and persists the snapshot.
///
/// Email recipients hear about every cycle; SMS recipients only hear about
/// changes. The snapshot is written only after all sends succeed (or are
/// skipped), so a failed notification is retried against the same baseline.
pub struct Notifier<'a> {
    recipients: &'a Recipients,
    mailer: Option<&'a dyn Mailer>,
    store: &'a dyn SnapshotStore,
}

impl<'a> Notifier<'a> {
    pub fn new(
        recipients: &'a Recipients,
        mailer: Option<&'a dyn Mailer>,
        store: &'a dyn SnapshotStore,
    ) -> Self {
        Self { recipients, mailer, store }
    }

    pub async fn dispatch(&self, page: &ResultPage) -> Result<Dispatch> {
        let plain = page.render(View::Plain);

        // A missing or unreadable snapshot just means "treat as changed".
        let previous = match self.store.load().await {
            Ok(previous) => previous,
            Err(e) => {
                warn!("Could not read previous results: {}", e);
                None
            }
        };
        let unchanged_since = previous
            .as_deref()
            .filter(|prev| !diff::has_changed(prev, &plain))
            .and_then(diff::header_timestamp);
        if let Some(since) = &unchanged_since {
            info!("No change as of {} since {}", page.timestamp, since);
        }

        let subject = page.subject(unchanged_since.as_deref());
        match self.mailer {
            Some(mailer) => {
                if !self.recipients.email.is_empty() {
                    let body = page.render(View::HtmlLong);
                    self.send_all(mailer, "EMAIL", &self.recipients.email, &subject, &body).await?;
                }
                if !self.recipients.sms.is_empty() && unchanged_since.is_none() {
                    let body = page.render(View::HtmlShort);
                    self.send_all(mailer, "SMS", &self.recipients.sms, &page.subject(None), &body)
                        .await?;
                }
                if self.recipients.is_empty() {
                    warn!("Mailing list is empty; results will not be sent");
                }
            }
            None => warn!("Missing SMTP credentials; results will not be sent"),
        }

        self.store.save(&plain).await?;

        let recipients =
            self.recipients.email.iter().chain(&self.recipients.sms).cloned().collect();
        Ok(Dispatch { subject, recipients, unchanged_since })
    }

    async fn send_all(
        &self,
        mailer: &dyn Mailer,
        channel: &str,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<()> {
        for recipient in recipients {
            mailer.send(recipient, subject, body).await.map_err(|e| {
                WatchError::Notification { channel: channel.to_string(), reason: format!("{e:#}") }
            })?;
        }
        info!("Notified {} {} recipient(s)", recipients.len(), channel);
        Ok(())
    }
}

//! tsla-watcher - Tesla inventory watcher with email and SMS alerts

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{warn, Level};
use tracing_subscriber::EnvFilter;
use tsla_watcher::config::Config;
use tsla_watcher::incentives::IncentiveEngine;
use tsla_watcher::inventory::InventoryClient;
use tsla_watcher::notify::{parse_recipients, Mailer, Recipients, SmtpMailer};
use tsla_watcher::snapshot::FsSnapshotStore;
use tsla_watcher::watcher::Watcher;

#[derive(Parser)]
#[command(
    name = "tsla-watcher",
    version,
    about = "Tesla inventory watcher with email and SMS alerts",
    long_about = "Polls Tesla's new-vehicle inventory for a configured model and trim, \
                  prices each listing with taxes, fees, and local incentives, and \
                  notifies a mailing list when the results change."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "TSLA_PROXY")]
    proxy: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one polling cycle and print the report
    #[command(alias = "r")]
    Run,

    /// Poll on an interval until interrupted
    #[command(alias = "w")]
    Watch,

    /// Serve an HTTP endpoint that runs a cycle per request
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        bind: String,
    },

    /// Show how the mailing list splits into email and SMS recipients
    Recipients,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }

    match cli.command {
        Commands::Run => {
            let watcher = build_watcher(config).await?;
            let banner = watcher.run_once().await?;
            println!("{}", banner);
        }

        Commands::Watch => {
            let watcher = build_watcher(config).await?;
            watcher.watch().await;
        }

        Commands::Serve { bind } => {
            let watcher = build_watcher(config).await?;
            tsla_watcher::server::serve(Arc::new(watcher), &bind).await?;
        }

        Commands::Recipients => {
            let recipients = load_recipients(&config).await;
            println!("Email recipients:");
            for email in &recipients.email {
                println!("  {}", email);
            }
            println!("SMS recipients:");
            for sms in &recipients.sms {
                println!("  {}", sms);
            }
        }
    }

    Ok(())
}

async fn build_watcher(config: Config) -> Result<Watcher<InventoryClient>> {
    let recipients = load_recipients(&config).await;

    let mailer: Option<Box<dyn Mailer>> = match (&config.smtp_user, &config.smtp_password) {
        (Some(user), Some(password)) => {
            Some(Box::new(SmtpMailer::new(&config.smtp_host, user, password)?))
        }
        _ => {
            warn!("SMTP_USER_EMAIL/SMTP_USER_PASSWORD not set; notifications disabled");
            None
        }
    };

    let api = InventoryClient::new(&config).await?;
    let store = Box::new(FsSnapshotStore::new(&config.snapshot_path));

    Watcher::new(config, api, IncentiveEngine::default(), recipients, mailer, store)
}

/// The mailing list is optional: a missing file just means nobody to notify.
async fn load_recipients(config: &Config) -> Recipients {
    match tokio::fs::read_to_string(&config.mailing_list_path).await {
        Ok(content) => parse_recipients(&content),
        Err(e) => {
            warn!("Could not read mailing list {}: {}", config.mailing_list_path, e);
            Recipients::default()
        }
    }
}

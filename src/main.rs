mod aggregator;
mod config;
mod models;
mod notify;
mod scrapers;
mod storage;

use std::path::PathBuf;
use std::sync::Arc;

use aggregator::Aggregator;
use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use config::{AppConfig, NotifyConfig};
use models::Listing;
use notify::{should_send_daily_status, Notifier};
use scrapers::{ScanContext, SiteScraper};
use storage::{RunStatus, SeenSet};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Watch classifieds sites for listings matching search terms and notify about new ones
#[derive(Debug, Parser)]
#[command(name = "listing-watch", version)]
struct Cli {
    /// JSON config file; built-in defaults are used when it does not exist
    #[arg(long, env = "LISTING_WATCH_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Scrape and print results without notifying or touching state files
    #[arg(long, conflicts_with = "test_notification")]
    scan_only: bool,

    /// Also write the scan-only results to this JSON file
    #[arg(long, requires = "scan_only")]
    output: Option<PathBuf>,

    /// Send one sample listing through every configured channel and exit
    #[arg(long)]
    test_notification: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    info!("🔎 Listing Watch");
    info!("⏰ {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    info!("==========================================");

    if cli.test_notification {
        let status = RunStatus::load(&config.status_file);
        let notifier = Notifier::from_config(&notify_config(&status))?;
        if notifier.send_test_notification().await {
            info!("✅ Test notification sent");
        } else {
            warn!("⚠️ Test notification was not delivered by any channel");
        }
        return Ok(());
    }

    if cli.scan_only {
        return scan_only(&config, cli.output).await;
    }

    run(&config).await
}

fn notify_config(status: &RunStatus) -> NotifyConfig {
    NotifyConfig::from_env(status.telegram_chat_id.clone(), status.notify_email.clone())
}

fn build_aggregator(config: &AppConfig) -> Result<Aggregator> {
    let ctx = Arc::new(ScanContext::from_config(config)?);
    let scrapers = SiteScraper::all(ctx.clone())?;
    Ok(Aggregator::new(ctx.registry.clone(), scrapers))
}

/// One scheduled run: scrape, notify about unseen listings, persist state
async fn run(config: &AppConfig) -> Result<()> {
    let status = RunStatus::load(&config.status_file);
    if !status.enabled {
        info!("⏸️ Scanner is disabled; enable it from the management page");
        return Ok(());
    }

    let notify_config = notify_config(&status);
    let notifier = Notifier::from_config(&notify_config)?;
    run_with(config, status, &notifier, &notify_config.ui_url).await
}

/// Listings are marked seen only after a successful dispatch; both state
/// files are written whatever the outcome.
async fn run_with(config: &AppConfig, mut status: RunStatus, notifier: &Notifier, ui_url: &str) -> Result<()> {
    let mut seen = SeenSet::load(&config.seen_items_file);
    info!("📋 {} listings already seen", seen.len());

    let listings = build_aggregator(config)?.scrape_all().await;
    info!("📊 Found {} results in total", listings.len());

    let fresh = seen.filter_new(&listings);
    info!("🆕 New listings: {}", fresh.len());

    if !fresh.is_empty() {
        if notifier.notify(&fresh).await {
            seen.mark_all(&fresh);
            status.last_weekly_notification = Some(Utc::now());
            info!("✅ Notifications sent");
        } else {
            warn!("⚠️ No channel delivered the notification; listings stay unseen");
        }
    }

    if should_send_daily_status(Utc::now()) {
        info!("📅 Sending daily status...");
        notifier.send_daily_status(ui_url).await;
    }

    if let Err(e) = seen.save(&config.seen_items_file) {
        error!("Error saving seen items: {:#}", e);
    }
    if let Err(e) = status.save(&config.status_file) {
        error!("Error saving status: {:#}", e);
    }

    info!("✅ Scan finished");
    Ok(())
}

async fn scan_only(config: &AppConfig, output: Option<PathBuf>) -> Result<()> {
    let listings = build_aggregator(config)?.scrape_all().await;

    if listings.is_empty() {
        info!("❌ No results found");
    } else {
        info!("\n✅ Found {} results\n", listings.len());
        print_listings(&listings);
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&listings)?;
        tokio::fs::write(&path, json).await?;
        info!("💾 Saved results to {}", path.display());
    }

    Ok(())
}

fn print_listings(listings: &[Listing]) {
    for (i, listing) in listings.iter().enumerate() {
        println!("[{}] {}", i + 1, listing.site);
        println!("    📦 {}", listing.title);
        println!("    💰 {}", listing.price);
        if !listing.description.is_empty() {
            let preview: String = listing.description.chars().take(100).collect();
            println!("    📝 {}", preview);
        }
        if !listing.phone.is_empty() {
            println!("    📞 {}", listing.phone);
        }
        println!("    🔗 {}", listing.url);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SiteConfig, SiteRegistry};
    use crate::models::Site;
    use crate::notify::{Alert, Delivery, NotificationChannel};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Counts result notifications; status heartbeats (no email part) are ignored
    struct CountingChannel {
        succeed: bool,
        results: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NotificationChannel for CountingChannel {
        fn name(&self) -> &'static str {
            "Counting"
        }

        async fn deliver(&self, alert: &Alert) -> Result<Delivery> {
            if alert.email.is_some() {
                self.results.fetch_add(1, Ordering::SeqCst);
            }
            if self.succeed {
                Ok(Delivery::Sent)
            } else {
                anyhow::bail!("channel down")
            }
        }
    }

    fn notifier(succeed: bool, results: &Arc<AtomicUsize>) -> Notifier {
        Notifier::new(vec![Box::new(CountingChannel {
            succeed,
            results: results.clone(),
        })])
    }

    async fn gun2_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div class="jet-listing-grid__item"><h4>Glock 45 MOS</h4><a href="/w/1">go</a> 3,500 ₪</div>"#,
            ))
            .mount(&server)
            .await;
        server
    }

    fn config_for(server: &MockServer, dir: &Path) -> AppConfig {
        AppConfig {
            seen_items_file: dir.join("seen_items.json"),
            status_file: dir.join("status.json"),
            request_timeout_secs: 5,
            sites: SiteRegistry::new(vec![SiteConfig {
                name: Site::Gun2.registry_name().to_string(),
                url: format!("{}/", server.uri()),
                search_url: None,
                extra_urls: Vec::new(),
                base_url: server.uri(),
                enabled: true,
            }]),
            ..AppConfig::default()
        }
    }

    fn seen_count(path: &Path) -> usize {
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        raw["items"].as_array().unwrap().len()
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["listing-watch", "--scan-only", "--output", "out.json"]).unwrap();
        assert!(cli.scan_only);
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));

        assert!(Cli::try_parse_from(["listing-watch", "--output", "out.json"]).is_err());
        assert!(Cli::try_parse_from(["listing-watch", "--scan-only", "--test-notification"]).is_err());
    }

    #[tokio::test]
    async fn test_disabled_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            seen_items_file: dir.path().join("seen_items.json"),
            status_file: dir.path().join("status.json"),
            ..AppConfig::default()
        };
        std::fs::write(&config.status_file, r#"{"enabled": false}"#).unwrap();

        run(&config).await.unwrap();

        assert!(!config.seen_items_file.exists());
        assert_eq!(std::fs::read_to_string(&config.status_file).unwrap(), r#"{"enabled": false}"#);
    }

    #[tokio::test]
    async fn test_delivered_listings_are_marked_seen() {
        let server = gun2_server().await;
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&server, dir.path());
        let results = Arc::new(AtomicUsize::new(0));

        let status = RunStatus::load(&config.status_file);
        run_with(&config, status, &notifier(true, &results), "https://ui.example")
            .await
            .unwrap();

        assert_eq!(results.load(Ordering::SeqCst), 1);
        assert_eq!(seen_count(&config.seen_items_file), 1);
        assert!(RunStatus::load(&config.status_file).last_weekly_notification.is_some());

        // Nothing new on the second run
        let status = RunStatus::load(&config.status_file);
        run_with(&config, status, &notifier(true, &results), "https://ui.example")
            .await
            .unwrap();
        assert_eq!(results.load(Ordering::SeqCst), 1);
        assert_eq!(seen_count(&config.seen_items_file), 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_listings_unseen() {
        let server = gun2_server().await;
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&server, dir.path());
        let results = Arc::new(AtomicUsize::new(0));

        let status = RunStatus::load(&config.status_file);
        run_with(&config, status, &notifier(false, &results), "https://ui.example")
            .await
            .unwrap();

        assert_eq!(results.load(Ordering::SeqCst), 1);
        assert_eq!(seen_count(&config.seen_items_file), 0);
        let status = RunStatus::load(&config.status_file);
        assert!(status.enabled);
        assert!(status.last_weekly_notification.is_none());

        // The same listing is offered again next run
        run_with(&config, status, &notifier(false, &results), "https://ui.example")
            .await
            .unwrap();
        assert_eq!(results.load(Ordering::SeqCst), 2);
    }
}

use clap::Parser;
use deal_watch::config::ServiceConfig;
use deal_watch::crawlers::WebDriverFetcher;
use deal_watch::monitor::Monitor;
use deal_watch::notifiers::{CallMeBotNotifier, LogNotifier, Notifier};
use deal_watch::parsers::HtmlOfferExtractor;
use deal_watch::server::{self, AppState, StartRequest};
use deal_watch::store::JsonFileStore;
use std::sync::Arc;
use url::Url;

mod args;
use args::{Args, start_defaults};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };
    config.apply_env();
    args.apply(&mut config);

    println!("Note: fetching pages requires a WebDriver server (e.g., ChromeDriver).");
    println!("Using {} (set WEBDRIVER_URL or --webdriver-url to change it)", config.webdriver_url);

    let notifier: Arc<dyn Notifier> = match &config.callmebot_api_key {
        Some(key) => Arc::new(CallMeBotNotifier::new(key)),
        None => {
            ::log::warn!("No CallMeBot API key configured; notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let mut monitor = Monitor::new(
        Arc::new(WebDriverFetcher::from_config(&config)),
        Arc::new(HtmlOfferExtractor::default()),
        notifier,
        Arc::new(JsonFileStore::new(&config.state_file)),
    );
    if let Some(origin) = &config.base_origin {
        monitor = monitor.with_base_origin(Url::parse(origin)?);
    }
    let monitor = Arc::new(monitor);

    let defaults = start_defaults(&args, &config);
    if args.autostart {
        monitor
            .start(StartRequest::default().into_config(&defaults))
            .await?;
    }

    let app = server::router(AppState::new(Arc::clone(&monitor), defaults));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    ::log::info!("Control API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.shutdown().await;
    ::log::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        ::log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    ::log::info!("Ctrl-C received, shutting down");
}

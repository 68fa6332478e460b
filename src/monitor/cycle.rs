use crate::config::MonitorConfig;
use crate::crawlers::PageFetcher;
use crate::error::{DeliveryError, FetchError, StoreError};
use crate::monitor::state::RunState;
use crate::notifiers::{Notifier, format_offers_message};
use crate::offer::Offer;
use crate::parsers::{OfferExtractor, collect_offers};
use crate::store::{SeenSet, SeenStore};
use crate::utils::origin_of;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Collaborators the monitor loop drives
#[derive(Clone)]
pub struct MonitorDeps {
    pub fetcher: Arc<dyn PageFetcher>,
    pub extractor: Arc<dyn OfferExtractor>,
    pub notifier: Arc<dyn Notifier>,
    pub store: Arc<dyn SeenStore>,
    /// Fixed origin for relative links; each page's own origin when unset
    pub base_origin: Option<Url>,
}

/// Outcome of one pass over the configured URLs
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub urls_checked: usize,
    pub urls_failed: usize,
    pub new_offers: Vec<Offer>,
    /// The notifier accepted the message
    pub notified: bool,
    /// The seen-set was written to the store
    pub persisted: bool,
    /// A stop request cut the URL list short
    pub cancelled: bool,
}

/// Runs monitoring cycles for one run until cancelled
pub(crate) struct Worker {
    deps: MonitorDeps,
    config: MonitorConfig,
    seen: SeenSet,
    /// The in-memory seen-set differs from the stored one
    dirty: bool,
    state: Arc<RwLock<RunState>>,
    cancel: CancellationToken,
}

impl Worker {
    pub(crate) fn new(
        deps: MonitorDeps,
        config: MonitorConfig,
        seen: SeenSet,
        state: Arc<RwLock<RunState>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            deps,
            config,
            seen,
            dirty: false,
            state,
            cancel,
        }
    }

    #[cfg(test)]
    pub(crate) fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Cycle, then sleep, until the cancellation token fires
    pub(crate) async fn run(mut self) {
        let interval = Duration::from_secs(self.config.interval_secs);
        ::log::info!(
            "Monitoring {} URL(s) every {}s for discounts in [{}, {}]",
            self.config.urls.len(),
            self.config.interval_secs,
            self.config.discount_min,
            self.config.discount_max
        );

        while !self.cancel.is_cancelled() {
            let report = self.run_cycle().await;
            ::log::info!(
                "Cycle done: {} URL(s) checked, {} failed, {} new offer(s)",
                report.urls_checked,
                report.urls_failed,
                report.new_offers.len()
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        if self.dirty {
            self.persist();
        }
        ::log::info!("Monitor loop stopped");
    }

    /// One fetch-extract-filter-notify-persist pass over every URL
    pub(crate) async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        let urls = self.config.urls.clone();

        for url in &urls {
            if self.cancel.is_cancelled() {
                ::log::debug!("Stop requested, skipping remaining URLs");
                report.cancelled = true;
                break;
            }

            // A panicking collaborator costs this URL, not the loop
            let scanned = AssertUnwindSafe(self.scan(url)).catch_unwind().await;
            match scanned.unwrap_or_else(|panic| {
                Err(FetchError::Panicked {
                    url: url.to_string(),
                    reason: panic_message(&*panic),
                })
            }) {
                Ok(offers) => {
                    report.urls_checked += 1;
                    let fresh = self.take_new(offers);
                    if !fresh.is_empty() {
                        ::log::info!("{} new offer(s) on {}", fresh.len(), url);
                    }
                    report.new_offers.extend(fresh);
                }
                Err(e) => {
                    report.urls_failed += 1;
                    ::log::warn!("Skipping {} this cycle: {}", url, e);
                }
            }
        }

        if !report.new_offers.is_empty() {
            self.with_state(|state| {
                state.record_new_offers(&report.new_offers);
                state.seen_count = self.seen.len();
            });
            report.notified = self.notify(&report.new_offers).await;
        }

        if self.dirty {
            report.persisted = self.persist();
        }

        self.with_state(|state| state.last_checked_at = Some(Utc::now()));
        report
    }

    /// Fetches one page and extracts its offers
    async fn scan(&self, url: &str) -> Result<Vec<Offer>, FetchError> {
        let base_origin = self
            .deps
            .base_origin
            .clone()
            .or_else(|| origin_of(url))
            .ok_or_else(|| FetchError::Navigation {
                url: url.to_string(),
                reason: "URL has no origin to resolve links against".to_string(),
            })?;

        let markup = self.deps.fetcher.fetch(url).await?;
        let results = self.deps.extractor.extract(&markup, &base_origin);
        Ok(collect_offers(url, results))
    }

    /// Keeps in-range offers whose link has not been seen, marking them seen
    fn take_new(&mut self, offers: Vec<Offer>) -> Vec<Offer> {
        let mut fresh = Vec::new();
        for offer in offers {
            if !self.config.accepts(offer.discount_percent) {
                continue;
            }
            if self.seen.insert(offer.id().to_string()) {
                self.dirty = true;
                fresh.push(offer);
            }
        }
        fresh
    }

    /// Sends one message for all new offers; failures are logged, not retried
    async fn notify(&self, offers: &[Offer]) -> bool {
        let message = format_offers_message(offers);
        let sent = AssertUnwindSafe(self.deps.notifier.send(&self.config.recipient, &message))
            .catch_unwind()
            .await;
        match sent.unwrap_or_else(|panic| Err(DeliveryError::Panicked(panic_message(&*panic)))) {
            Ok(()) => {
                ::log::info!(
                    "Notified {} about {} offer(s)",
                    self.config.recipient,
                    offers.len()
                );
                true
            }
            Err(e) => {
                ::log::error!(
                    "Failed to notify {} about {} offer(s): {}",
                    self.config.recipient,
                    offers.len(),
                    e
                );
                false
            }
        }
    }

    /// Writes the seen-set; on failure the in-memory set stays authoritative
    fn persist(&mut self) -> bool {
        let saved = std::panic::catch_unwind(AssertUnwindSafe(|| self.deps.store.save(&self.seen)));
        match saved.unwrap_or_else(|panic| Err(StoreError::Panicked(panic_message(&*panic)))) {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                ::log::warn!("{}; keeping seen-set in memory", e);
                false
            }
        }
    }

    fn with_state(&self, update: impl FnOnce(&mut RunState)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut state);
    }
}

impl Drop for Worker {
    /// However the task ends, the run it belonged to is no longer active
    fn drop(&mut self) {
        self.with_state(|state| state.active = false);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

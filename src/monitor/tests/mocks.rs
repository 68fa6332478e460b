// Fake collaborators for driving the monitor without a browser or gateway

use crate::crawlers::PageFetcher;
use crate::error::{DeliveryError, ExtractionError, FetchError, StoreError};
use crate::notifiers::Notifier;
use crate::offer::Offer;
use crate::parsers::OfferExtractor;
use crate::store::{SeenSet, SeenStore};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub fn offer(link: &str, discount: u8) -> Offer {
    Offer::new(&format!("Producto {link}"), "$ 1.990", discount, link)
}

/// A site whose pages are scripted per URL
///
/// The fetcher returns the URL itself as markup and the extractor looks the
/// offers up by that markup, so one object plays both roles.
#[derive(Default)]
pub struct FakeSite {
    pages: Mutex<HashMap<String, Vec<Offer>>>,
    broken: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    fetch_delay: Mutex<Duration>,
    fetches: Mutex<Vec<String>>,
    bases: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_page(&self, url: &str, offers: Vec<Offer>) {
        self.pages.lock().unwrap().insert(url.to_string(), offers);
    }

    pub fn break_url(&self, url: &str) {
        self.broken.lock().unwrap().insert(url.to_string());
    }

    /// Make the extractor panic on this URL's page
    pub fn panic_on(&self, url: &str) {
        self.panicking.lock().unwrap().insert(url.to_string());
    }

    /// Make every fetch take this long after it is recorded
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    /// Base origins the extractor was called with
    pub fn bases(&self) -> Vec<String> {
        self.bases.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetches.lock().unwrap().push(url.to_string());
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.broken.lock().unwrap().contains(url) {
            return Err(FetchError::Navigation {
                url: url.to_string(),
                reason: "browser crashed".to_string(),
            });
        }
        Ok(url.to_string())
    }
}

impl OfferExtractor for FakeSite {
    fn extract(&self, markup: &str, base_origin: &Url) -> Vec<Result<Offer, ExtractionError>> {
        self.bases.lock().unwrap().push(base_origin.to_string());
        if self.panicking.lock().unwrap().contains(markup) {
            panic!("extractor blew up on {markup}");
        }
        let mut results: Vec<_> = self
            .pages
            .lock()
            .unwrap()
            .get(markup)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(Ok)
            .collect();
        // Every page also has one product the extractor cannot read
        results.push(Err(ExtractionError::MissingDiscount));
        results
    }
}

/// Notifier that records every message and can be told to fail
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
    panic: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        Arc::new(notifier)
    }

    pub fn panicking() -> Arc<Self> {
        let notifier = Self::default();
        notifier.panic.store(true, Ordering::SeqCst);
        Arc::new(notifier)
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        if self.panic.load(Ordering::SeqCst) {
            panic!("notifier blew up");
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::Rejected {
                status: 503,
                body: "gateway down".to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory seen-set store with switchable failures
#[derive(Default)]
pub struct MemoryStore {
    seen: Mutex<SeenSet>,
    saves: AtomicUsize,
    fail_writes: AtomicBool,
    corrupt: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_seen(links: &[&str]) -> Arc<Self> {
        let store = Self::default();
        *store.seen.lock().unwrap() = links.iter().map(|l| l.to_string()).collect();
        Arc::new(store)
    }

    pub fn seen(&self) -> SeenSet {
        self.seen.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_corrupt(&self, corrupt: bool) {
        self.corrupt.store(corrupt, Ordering::SeqCst);
    }
}

impl SeenStore for MemoryStore {
    fn load(&self) -> Result<SeenSet, StoreError> {
        if self.corrupt.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt {
                path: PathBuf::from("memory"),
                reason: "garbage".to_string(),
            });
        }
        Ok(self.seen())
    }

    fn save(&self, seen: &SeenSet) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                path: PathBuf::from("memory"),
                source: std::io::Error::other("disk full"),
            });
        }
        *self.seen.lock().unwrap() = seen.clone();
        Ok(())
    }
}

use crate::offer::Offer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// How many recently found offers are kept for display
pub const RECENT_OFFERS_CAP: usize = 20;

/// Progress of the current (or last) monitoring run
///
/// Written by the monitor loop, read by the control surface as snapshots.
#[derive(Debug, Clone)]
pub struct RunState {
    pub active: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    /// New offers found since the run started
    pub total_offers_found: usize,
    /// Size of the seen-set
    pub seen_count: usize,
    pub urls: Vec<String>,
    recent: VecDeque<Offer>,
    recent_cap: usize,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            active: false,
            last_checked_at: None,
            total_offers_found: 0,
            seen_count: 0,
            urls: Vec::new(),
            recent: VecDeque::new(),
            recent_cap: RECENT_OFFERS_CAP,
        }
    }
}

impl RunState {
    /// Fresh state for a run that is starting now
    pub fn started(urls: Vec<String>, seen_count: usize, recent_cap: usize) -> Self {
        Self {
            active: true,
            urls,
            seen_count,
            recent_cap,
            ..Self::default()
        }
    }

    /// Adds newly found offers in front of the recent buffer
    pub fn record_new_offers(&mut self, offers: &[Offer]) {
        for offer in offers {
            self.recent.push_front(offer.clone());
        }
        self.recent.truncate(self.recent_cap);
        self.total_offers_found += offers.len();
    }

    /// Recently found offers, most recent first
    pub fn recent_offers(&self) -> Vec<Offer> {
        self.recent.iter().cloned().collect()
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            active: self.active,
            last_checked_at: self.last_checked_at,
            seen_count: self.seen_count,
            recent_count: self.recent.len(),
            total_offers_found: self.total_offers_found,
            urls: self.urls.clone(),
        }
    }
}

/// Point-in-time view of the monitor, as reported by the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorStatus {
    pub active: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub seen_count: usize,
    pub recent_count: usize,
    pub total_offers_found: usize,
    pub urls: Vec<String>,
}

//! Debounced stats refresh.
//!
//! Every successful commit changes the per-list counts shown in the sidebar,
//! so the engine pings the stats collaborator after each one. Pings are
//! fire-and-forget and debounced: a burst of clarifications ends up as a
//! single refresh, and delivery failures are swallowed (stats are
//! non-critical).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gtd_clarify_sdk::ClarifyApi;
use tokio::task::JoinHandle;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Debounced, fire-and-forget `notify_stats_changed` dispatcher.
pub struct StatsNotifier {
    api: Arc<dyn ClarifyApi>,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl StatsNotifier {
    pub fn new(api: Arc<dyn ClarifyApi>) -> Self {
        Self::with_debounce(api, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(api: Arc<dyn ClarifyApi>, debounce: Duration) -> Self {
        Self {
            api,
            debounce,
            pending: Mutex::new(None),
        }
    }

    /// Schedule a stats refresh, replacing any refresh still pending.
    pub fn notify(&self) {
        let api = Arc::clone(&self.api);
        let debounce = self.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let _ = api.notify_stats_changed().await;
        });

        let mut pending = self.pending.lock().unwrap();
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for StatsNotifier {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.lock().unwrap().take() {
            pending.abort();
        }
    }
}

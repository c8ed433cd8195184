//! Local checkout draft: a convenience cache of half-filled forms.
//!
//! Drafts are never a source of order data. They live under two string keys,
//! expire after a day and are removed once an order goes through.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::form::{CheckoutForm, DeliveryInput, GuestDetails, InvoiceProfile};
use super::session::CheckoutStep;

pub const DRAFT_KEY: &str = "checkout_draft";
pub const DRAFT_TIMESTAMP_KEY: &str = "checkout_draft_timestamp";
pub const DRAFT_TTL_HOURS: i64 = 24;
pub const AUTOSAVE_DEBOUNCE: std::time::Duration = std::time::Duration::from_secs(2);

/// String key/value storage, as offered by a browser.
pub trait DraftStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

#[derive(Default)]
pub struct InMemoryDraftStore {
    values: Mutex<HashMap<String, String>>,
}

impl DraftStore for InMemoryDraftStore {
    fn get(&self, key: &str) -> Option<String> { self.values.lock().ok()?.get(key).cloned() }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }
}

/// What is kept between visits. Card data is never part of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckoutDraft {
    pub guest: Option<GuestDetails>,
    pub invoice: InvoiceProfile,
    pub step: CheckoutStep,
}

impl CheckoutDraft {
    pub fn capture(form: &CheckoutForm, step: CheckoutStep) -> Self {
        let guest = match &form.delivery {
            DeliveryInput::Guest(g) => Some(g.clone()),
            DeliveryInput::Account(_) => None,
        };
        Self { guest, invoice: form.invoice.normalized(), step }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DraftRecovery {
    Empty,
    /// Offer this to the buyer.
    Available { draft: CheckoutDraft, saved_at: DateTime<Utc> },
    /// Was too old (or unreadable) and has been deleted.
    Discarded,
}

pub struct CheckoutDraftManager {
    store: Arc<dyn DraftStore>,
    ttl: Duration,
    /// Bumped by `clear`; saves queued under an older generation are dropped.
    generation: Mutex<u64>,
}

impl CheckoutDraftManager {
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self { store, ttl: Duration::hours(DRAFT_TTL_HOURS), generation: Mutex::new(0) }
    }

    pub fn save(&self, draft: &CheckoutDraft, now: DateTime<Utc>) -> Result<(), serde_json::Error> {
        let _generation = self.generation();
        self.write(draft, now)
    }

    pub fn current_generation(&self) -> u64 { *self.generation() }

    /// Saves only if no `clear` happened since `generation` was read. Returns whether it wrote.
    pub fn save_if_current(&self, draft: &CheckoutDraft, generation: u64, now: DateTime<Utc>) -> Result<bool, serde_json::Error> {
        let current = self.generation();
        if *current != generation {
            debug!(generation, current = *current, "dropping draft save queued before the draft was cleared");
            return Ok(false);
        }
        self.write(draft, now).map(|_| true)
    }

    fn write(&self, draft: &CheckoutDraft, now: DateTime<Utc>) -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(draft)?;
        self.store.set(DRAFT_KEY, json);
        self.store.set(DRAFT_TIMESTAMP_KEY, now.to_rfc3339());
        Ok(())
    }

    fn generation(&self) -> MutexGuard<'_, u64> { self.generation.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) }

    pub fn recover(&self, now: DateTime<Utc>) -> DraftRecovery {
        let (Some(json), Some(stamp)) = (self.store.get(DRAFT_KEY), self.store.get(DRAFT_TIMESTAMP_KEY)) else {
            return DraftRecovery::Empty;
        };
        let saved_at = match DateTime::parse_from_rfc3339(&stamp) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                warn!(error = %e, "unreadable draft timestamp, discarding draft");
                self.remove_keys();
                return DraftRecovery::Discarded;
            }
        };
        if now - saved_at >= self.ttl {
            debug!(%saved_at, "checkout draft expired");
            self.remove_keys();
            return DraftRecovery::Discarded;
        }
        match serde_json::from_str(&json) {
            Ok(draft) => DraftRecovery::Available { draft, saved_at },
            Err(e) => {
                warn!(error = %e, "unreadable checkout draft, discarding");
                self.remove_keys();
                DraftRecovery::Discarded
            }
        }
    }

    /// Deletes the draft and invalidates any autosave still in flight.
    pub fn clear(&self) {
        let mut generation = self.generation();
        *generation += 1;
        self.remove_keys();
    }

    fn remove_keys(&self) {
        self.store.remove(DRAFT_KEY);
        self.store.remove(DRAFT_TIMESTAMP_KEY);
    }
}

/// Saves the latest draft once edits have paused for the debounce window.
pub struct DraftAutosaver {
    manager: Arc<CheckoutDraftManager>,
    tx: mpsc::UnboundedSender<PendingDraft>,
    handle: JoinHandle<()>,
}

struct PendingDraft {
    draft: CheckoutDraft,
    generation: u64,
}

impl DraftAutosaver {
    pub fn spawn(manager: Arc<CheckoutDraftManager>, debounce: std::time::Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingDraft>();
        let task_manager = manager.clone();
        let handle = tokio::spawn(async move {
            while let Some(mut latest) = rx.recv().await {
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(next)) => latest = next,
                        Ok(None) => {
                            flush(&task_manager, &latest);
                            return;
                        }
                        Err(_) => {
                            flush(&task_manager, &latest);
                            break;
                        }
                    }
                }
            }
        });
        Self { manager, tx, handle }
    }

    /// Call on every meaningful field change.
    pub fn notify(&self, draft: CheckoutDraft) {
        let pending = PendingDraft { draft, generation: self.manager.current_generation() };
        if self.tx.send(pending).is_err() {
            warn!("draft autosaver has stopped");
        }
    }

    /// Drops any pending save, e.g. right before the draft is deleted after a successful order.
    pub fn cancel(self) { self.handle.abort(); }

    /// Flushes a pending save and waits for it.
    pub async fn shutdown(self) {
        drop(self.tx);
        let _ = self.handle.await;
    }
}

fn flush(manager: &CheckoutDraftManager, pending: &PendingDraft) {
    if let Err(e) = manager.save_if_current(&pending.draft, pending.generation, Utc::now()) {
        warn!(error = %e, "could not save checkout draft");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::form::fixtures::{complete_guest_form, guest};

    fn manager() -> (Arc<InMemoryDraftStore>, CheckoutDraftManager) {
        let store = Arc::new(InMemoryDraftStore::default());
        (store.clone(), CheckoutDraftManager::new(store))
    }

    #[test]
    fn fresh_draft_is_offered() {
        let (_, drafts) = manager();
        let now = Utc::now();
        let draft = CheckoutDraft::capture(&complete_guest_form(), CheckoutStep::Payment);
        drafts.save(&draft, now).unwrap();
        match drafts.recover(now + Duration::hours(23)) {
            DraftRecovery::Available { draft: recovered, .. } => assert_eq!(recovered, draft),
            other => panic!("expected a draft, got {other:?}"),
        }
    }

    #[test]
    fn stale_draft_is_deleted_silently() {
        let (store, drafts) = manager();
        let now = Utc::now();
        drafts.save(&CheckoutDraft::capture(&complete_guest_form(), CheckoutStep::DeliveryInfo), now).unwrap();
        assert_eq!(drafts.recover(now + Duration::hours(25)), DraftRecovery::Discarded);
        assert!(store.get(DRAFT_KEY).is_none());
        assert!(store.get(DRAFT_TIMESTAMP_KEY).is_none());
        assert_eq!(drafts.recover(now), DraftRecovery::Empty);
    }

    #[test]
    fn draft_never_contains_card_data() {
        let (store, drafts) = manager();
        drafts.save(&CheckoutDraft::capture(&complete_guest_form(), CheckoutStep::Payment), Utc::now()).unwrap();
        let json = store.get(DRAFT_KEY).unwrap();
        assert!(!json.contains("4111"));
        assert!(json.contains(&guest().email));
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_waits_for_quiet_period() {
        let (store, drafts) = manager();
        let saver = DraftAutosaver::spawn(Arc::new(drafts), AUTOSAVE_DEBOUNCE);
        let form = complete_guest_form();

        saver.notify(CheckoutDraft::capture(&form, CheckoutStep::DeliveryInfo));
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        saver.notify(CheckoutDraft::capture(&form, CheckoutStep::Payment));
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert!(store.get(DRAFT_KEY).is_none(), "saved before the debounce window closed");

        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        let saved: CheckoutDraft = serde_json::from_str(&store.get(DRAFT_KEY).unwrap()).unwrap();
        assert_eq!(saved.step, CheckoutStep::Payment);
        saver.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_drops_a_pending_autosave() {
        let (store, drafts) = manager();
        let drafts = Arc::new(drafts);
        let saver = DraftAutosaver::spawn(drafts.clone(), AUTOSAVE_DEBOUNCE);
        let form = complete_guest_form();

        saver.notify(CheckoutDraft::capture(&form, CheckoutStep::Payment));
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        drafts.clear();
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        assert!(store.get(DRAFT_KEY).is_none());

        // Edits made after the clear are saved as usual.
        saver.notify(CheckoutDraft::capture(&form, CheckoutStep::DeliveryInfo));
        saver.shutdown().await;
        assert!(store.get(DRAFT_KEY).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_edit() {
        let (store, drafts) = manager();
        let saver = DraftAutosaver::spawn(Arc::new(drafts), AUTOSAVE_DEBOUNCE);
        saver.notify(CheckoutDraft::capture(&complete_guest_form(), CheckoutStep::DeliveryInfo));
        saver.shutdown().await;
        assert!(store.get(DRAFT_KEY).is_some());
    }
}

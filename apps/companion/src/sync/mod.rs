//! Local-first persistence of the profile, journal and check-ins.
//!
//! The local cache is always written first and always readable. The remote
//! document store is optional and strictly best-effort: every remote failure is
//! logged and absorbed here, never surfaced to callers.

pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod remote;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::models::{CheckIn, Feedback, JournalEntry, Profile, StoredJournalEntry};
use crate::storage::{LocalRepository, StoreError};

use outbox::{OutboxCollection, PendingWrite};
pub use postgres::{PgAuthProvider, PgDocumentStore};
use remote::{Direction, Fields, Identity};
pub use remote::Remote;

/// Maximum number of journal entries returned by `get_journal_history`.
pub const HISTORY_LIMIT: usize = 50;

const FEEDBACK_COLLECTION: &str = "feedback";

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Park undeliverable journal and check-in writes locally instead of
    /// dropping them.
    pub outbox: bool,
    pub app_version: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            outbox: false,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Where an append ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    Remote { id: String },
    Queued,
    Skipped,
}

#[derive(Clone)]
pub struct SyncLayer {
    local: Arc<LocalRepository>,
    remote: Option<Remote>,
    clock: Arc<dyn Clock>,
    options: SyncOptions,
    outbox_lock: Arc<Mutex<()>>,
}

impl SyncLayer {
    pub fn new(
        local: Arc<LocalRepository>,
        remote: Option<Remote>,
        clock: Arc<dyn Clock>,
        options: SyncOptions,
    ) -> Self {
        Self {
            local,
            remote,
            clock,
            options,
            outbox_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn is_remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    /// Restores the persisted session, if the auth provider still knows it.
    /// Does not create a new identity.
    pub async fn resume_session(&self) -> Option<Identity> {
        let remote = self.remote.as_ref()?;
        if let Some(identity) = remote.auth.current_identity() {
            return Some(identity);
        }

        let stored = match self.local.load_session().await {
            Ok(stored) => stored?,
            Err(e) => {
                warn!("Stored session unreadable: {e}");
                return None;
            }
        };

        match remote.auth.resume(&stored).await {
            Ok(true) => {
                info!("Resumed session {}", stored.uid);
                Some(stored)
            }
            Ok(false) => {
                info!("Stored session {} no longer valid, discarding", stored.uid);
                if let Err(e) = self.local.clear_session().await {
                    warn!("Failed to clear stale session: {e}");
                }
                None
            }
            Err(e) => {
                warn!("Session resume failed: {e}");
                None
            }
        }
    }

    /// Returns the current identity, resuming or creating an anonymous one if
    /// needed. `None` in local-only mode or when the provider is unreachable.
    pub async fn ensure_auth(&self) -> Option<Identity> {
        let remote = self.remote.as_ref()?;
        if let Some(identity) = self.resume_session().await {
            return Some(identity);
        }

        match remote.auth.sign_in_anonymously().await {
            Ok(identity) => {
                if let Err(e) = self.local.store_session(&identity).await {
                    warn!("Failed to persist session: {e}");
                }
                Some(identity)
            }
            Err(e) => {
                warn!("Anonymous sign-in failed: {e}");
                None
            }
        }
    }

    /// The signed-in identity without creating one.
    fn session(&self) -> Option<(&Remote, Identity)> {
        let remote = self.remote.as_ref()?;
        let identity = remote.auth.current_identity()?;
        Some((remote, identity))
    }

    // Profile

    pub async fn save_profile_local(&self, profile: &Profile) {
        if let Err(e) = self.local.store_profile(profile).await {
            error!("Failed to cache profile locally: {e}");
        }
    }

    /// Merges the profile into `users/{uid}`. Best-effort.
    pub async fn push_profile(&self, profile: &Profile) {
        let Some(remote) = self.remote.as_ref() else {
            return;
        };
        let Some(identity) = self.ensure_auth().await else {
            return;
        };

        let mut fields = Fields::new();
        match serde_json::to_value(profile) {
            Ok(value) => {
                fields.insert("profile".to_string(), value);
            }
            Err(e) => {
                error!("Profile not serializable: {e}");
                return;
            }
        }

        let path = format!("users/{}", identity.uid);
        match remote.docs.set_document(&path, fields, true).await {
            Ok(()) => debug!("Profile synced to {path}"),
            Err(e) => warn!("Profile sync failed, keeping local copy: {e}"),
        }
    }

    /// Local write first, then the remote merge.
    pub async fn save_profile(&self, profile: &Profile) {
        self.save_profile_local(profile).await;
        self.push_profile(profile).await;
    }

    /// Remote copy when reachable (refreshing the local cache), else the local
    /// cache.
    pub async fn get_profile(&self) -> Option<Profile> {
        if let Some(profile) = self.fetch_remote_profile().await {
            self.save_profile_local(&profile).await;
            return Some(profile);
        }

        match self.local.load_profile().await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Local profile unreadable: {e}");
                None
            }
        }
    }

    /// Local cache for read-modify-write. Defaults when nothing is stored yet,
    /// but an unreadable profile is an error so callers never overwrite it.
    pub async fn profile_for_update(&self) -> Result<Profile, StoreError> {
        Ok(self.local.load_profile().await?.unwrap_or_default())
    }

    /// Local cache only, defaults when nothing is stored yet.
    pub async fn cached_profile(&self) -> Profile {
        match self.local.load_profile().await {
            Ok(profile) => profile.unwrap_or_default(),
            Err(e) => {
                warn!("Local profile unreadable, using defaults: {e}");
                Profile::default()
            }
        }
    }

    async fn fetch_remote_profile(&self) -> Option<Profile> {
        let (remote, identity) = self.session()?;
        let path = format!("users/{}", identity.uid);
        let mut document = match remote.docs.get_document(&path).await {
            Ok(document) => document?,
            Err(e) => {
                warn!("Remote profile fetch failed, using local cache: {e}");
                return None;
            }
        };

        let value = document.remove("profile")?;
        Some(Profile::from_stored(value))
    }

    // Journal and check-ins

    pub async fn save_journal_entry(&self, entry: &JournalEntry) -> SaveOutcome {
        match self.to_fields(entry) {
            Some(fields) => self.append(OutboxCollection::Journal, fields).await,
            None => SaveOutcome::Skipped,
        }
    }

    pub async fn save_check_in(&self, check_in: &CheckIn) -> SaveOutcome {
        match self.to_fields(check_in) {
            Some(fields) => self.append(OutboxCollection::CheckIns, fields).await,
            None => SaveOutcome::Skipped,
        }
    }

    /// Newest first, at most `HISTORY_LIMIT`. Empty without a session.
    pub async fn get_journal_history(&self) -> Vec<StoredJournalEntry> {
        let Some((remote, identity)) = self.session() else {
            return Vec::new();
        };

        let collection = format!("users/{}/journal", identity.uid);
        let documents = match remote
            .docs
            .query_collection(&collection, "timestamp", Direction::Descending, HISTORY_LIMIT)
            .await
        {
            Ok(documents) => documents,
            Err(e) => {
                warn!("Journal history unavailable: {e}");
                return Vec::new();
            }
        };

        documents
            .into_iter()
            .filter_map(|document| {
                let mut fields = document.fields;
                fields.insert("id".to_string(), Value::String(document.id.clone()));
                match serde_json::from_value(Value::Object(fields)) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Skipping malformed journal entry {}: {e}", document.id);
                        None
                    }
                }
            })
            .collect()
    }

    fn to_fields<T: Serialize>(&self, record: &T) -> Option<Fields> {
        match serde_json::to_value(record) {
            Ok(Value::Object(mut fields)) => {
                fields.insert("savedAt".to_string(), json!(self.clock.now()));
                Some(fields)
            }
            Ok(_) => None,
            Err(e) => {
                error!("Record not serializable: {e}");
                None
            }
        }
    }

    async fn append(&self, collection: OutboxCollection, fields: Fields) -> SaveOutcome {
        let Some(remote) = self.remote.as_ref() else {
            return SaveOutcome::Skipped;
        };

        let Some(identity) = self.ensure_auth().await else {
            return self.park(collection, fields).await;
        };

        let path = format!("users/{}/{}", identity.uid, collection.subcollection());
        match remote.docs.add_document(&path, fields.clone()).await {
            Ok(id) => {
                debug!("Appended {path}/{id}");
                if self.options.outbox {
                    self.flush_outbox().await;
                }
                SaveOutcome::Remote { id }
            }
            Err(e) => {
                warn!("Remote append to {path} failed: {e}");
                self.park(collection, fields).await
            }
        }
    }

    async fn park(&self, collection: OutboxCollection, fields: Fields) -> SaveOutcome {
        if !self.options.outbox {
            return SaveOutcome::Skipped;
        }

        let _guard = self.outbox_lock.lock().await;
        let write = PendingWrite {
            collection,
            fields,
            queued_at: self.clock.now(),
        };
        match self.local.push_outbox(write).await {
            Ok(()) => SaveOutcome::Queued,
            Err(e) => {
                error!("Failed to queue write locally: {e}");
                SaveOutcome::Skipped
            }
        }
    }

    /// Delivers parked writes in order, stopping at the first failure. Returns
    /// the number delivered.
    pub async fn flush_outbox(&self) -> usize {
        let Some(remote) = self.remote.as_ref() else {
            return 0;
        };
        let _guard = self.outbox_lock.lock().await;

        let pending = match self.local.load_outbox().await {
            Ok(pending) if pending.is_empty() => return 0,
            Ok(pending) => pending,
            Err(e) => {
                warn!("Outbox unreadable: {e}");
                return 0;
            }
        };
        let Some(identity) = self.ensure_auth().await else {
            return 0;
        };

        let mut delivered = 0;
        for write in &pending {
            let path = format!("users/{}/{}", identity.uid, write.collection.subcollection());
            if let Err(e) = remote.docs.add_document(&path, write.fields.clone()).await {
                warn!("Outbox flush stopped at {path}: {e}");
                break;
            }
            delivered += 1;
        }

        if delivered > 0 {
            if let Err(e) = self.local.store_outbox(&pending[delivered..]).await {
                error!("Failed to update outbox after delivering {delivered}: {e}");
            }
            info!("Flushed {delivered} queued writes, {} remaining", pending.len() - delivered);
        }
        delivered
    }

    pub async fn pending_writes(&self) -> usize {
        self.local.load_outbox().await.map(|p| p.len()).unwrap_or(0)
    }

    // Feedback

    pub async fn save_feedback(&self, feedback: &Feedback) -> SaveOutcome {
        if let Err(e) = self.local.mark_rated().await {
            error!("Failed to record rated flag: {e}");
        }

        let Some(remote) = self.remote.as_ref() else {
            return SaveOutcome::Skipped;
        };

        let user_id = remote
            .auth
            .current_identity()
            .map(|identity| identity.uid)
            .unwrap_or_else(|| "anonymous".to_string());

        let mut fields = match serde_json::to_value(feedback) {
            Ok(Value::Object(fields)) => fields,
            _ => return SaveOutcome::Skipped,
        };
        fields.insert("userId".to_string(), Value::String(user_id));
        fields.insert("timestamp".to_string(), json!(self.clock.now().timestamp_millis()));
        fields.insert(
            "appVersion".to_string(),
            Value::String(self.options.app_version.clone()),
        );

        match remote.docs.add_document(FEEDBACK_COLLECTION, fields).await {
            Ok(id) => SaveOutcome::Remote { id },
            Err(e) => {
                warn!("Feedback not delivered: {e}");
                SaveOutcome::Skipped
            }
        }
    }

    pub async fn has_rated(&self) -> bool {
        self.local.has_rated().await.unwrap_or_else(|e| {
            warn!("Rated flag unreadable: {e}");
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{MemoryAuth, MemoryDocumentStore};
    use super::remote::{Document, DocumentStore, RemoteError};
    use super::*;
    use crate::clock::testing::FixedClock;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        local: Arc<LocalRepository>,
        docs: Arc<MemoryDocumentStore>,
        auth: Arc<MemoryAuth>,
        clock: Arc<FixedClock>,
        sync: SyncLayer,
    }

    fn fixture_with(options: SyncOptions) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let local = Arc::new(LocalRepository::new(store.clone()));
        let docs = Arc::new(MemoryDocumentStore::new());
        let auth = Arc::new(MemoryAuth::new());
        let clock = Arc::new(FixedClock::at(2026, 5, 2, 20));
        let remote = Remote {
            docs: docs.clone(),
            auth: auth.clone(),
        };
        let sync = SyncLayer::new(local.clone(), Some(remote), clock.clone(), options);
        Fixture {
            store,
            local,
            docs,
            auth,
            clock,
            sync,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(SyncOptions::default())
    }

    fn local_only() -> (Arc<LocalRepository>, SyncLayer) {
        let local = Arc::new(LocalRepository::new(Arc::new(MemoryStore::new())));
        let clock = Arc::new(FixedClock::at(2026, 5, 2, 20));
        let sync = SyncLayer::new(local.clone(), None, clock, SyncOptions::default());
        (local, sync)
    }

    fn entry(timestamp: i64, text: &str) -> JournalEntry {
        JournalEntry {
            timestamp,
            text: text.to_string(),
            mood: None,
            insight: None,
            tags: Vec::new(),
        }
    }

    /// Every operation completes without error and the profile written
    /// locally is the one read back; nothing reaches the journal.
    async fn run_offline_sequence(sync: &SyncLayer) {
        assert!(sync.ensure_auth().await.is_none());

        let profile = Profile {
            name: "offline".to_string(),
            xp: 120,
            ..Profile::default()
        };
        sync.save_profile(&profile).await;
        assert_eq!(sync.get_profile().await, Some(profile));

        assert_eq!(
            sync.save_journal_entry(&entry(1, "no signal")).await,
            SaveOutcome::Skipped
        );
        assert!(sync.get_journal_history().await.is_empty());
    }

    #[tokio::test]
    async fn test_graceful_degradation_sequence_local_only() {
        let (_, sync) = local_only();
        run_offline_sequence(&sync).await;
    }

    #[tokio::test]
    async fn test_graceful_degradation_sequence_auth_down() {
        let f = fixture();
        f.auth.set_unavailable(true);
        f.docs.set_unavailable(true);

        run_offline_sequence(&f.sync).await;
        assert_eq!(f.auth.sign_in_count(), 0);
        assert!(f.docs.documents("users").is_empty());
    }

    #[tokio::test]
    async fn test_ensure_auth_local_only_is_none() {
        let (_, sync) = local_only();
        assert!(sync.ensure_auth().await.is_none());
    }

    #[tokio::test]
    async fn test_ensure_auth_reuses_current_identity() {
        let f = fixture();
        let first = f.sync.ensure_auth().await.unwrap();
        let second = f.sync.ensure_auth().await.unwrap();
        assert_eq!(first, second);
        assert!(first.anonymous);
        assert_eq!(f.auth.sign_in_count(), 1);
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let f = fixture();
        let first = f.sync.ensure_auth().await.unwrap();
        f.auth.sign_out();

        assert_eq!(f.sync.resume_session().await, Some(first));
        assert_eq!(f.auth.sign_in_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_session_is_replaced() {
        let f = fixture();
        let first = f.sync.ensure_auth().await.unwrap();
        f.auth.sign_out();
        f.auth.forget_all();

        let second = f.sync.ensure_auth().await.unwrap();
        assert_ne!(first, second);
        assert_eq!(f.local.load_session().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_auth_failure_is_none() {
        let f = fixture();
        f.auth.set_unavailable(true);
        assert!(f.sync.ensure_auth().await.is_none());
    }

    #[tokio::test]
    async fn test_profile_saved_locally_when_remote_down() {
        let f = fixture();
        f.docs.set_unavailable(true);
        let profile = Profile {
            name: "Marco".to_string(),
            ..Profile::default()
        };

        f.sync.save_profile(&profile).await;
        assert_eq!(f.local.load_profile().await.unwrap(), Some(profile));
    }

    /// Document store that records whether the local cache already held the
    /// profile when the remote write arrived.
    struct OrderingDocs {
        local: Arc<LocalRepository>,
        local_first: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl DocumentStore for OrderingDocs {
        async fn get_document(&self, _path: &str) -> Result<Option<Fields>, RemoteError> {
            Ok(None)
        }

        async fn set_document(&self, _: &str, _: Fields, _: bool) -> Result<(), RemoteError> {
            let cached = self.local.load_profile().await.unwrap().is_some();
            self.local_first
                .store(cached, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        async fn add_document(&self, _: &str, _: Fields) -> Result<String, RemoteError> {
            Ok("x".to_string())
        }

        async fn query_collection(
            &self,
            _: &str,
            _: &str,
            _: Direction,
            _: usize,
        ) -> Result<Vec<Document>, RemoteError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_local_write_precedes_remote_write() {
        let local = Arc::new(LocalRepository::new(Arc::new(MemoryStore::new())));
        let docs = Arc::new(OrderingDocs {
            local: local.clone(),
            local_first: std::sync::atomic::AtomicBool::new(false),
        });
        let remote = Remote {
            docs: docs.clone(),
            auth: Arc::new(MemoryAuth::new()),
        };
        let clock = Arc::new(FixedClock::at(2026, 5, 2, 20));
        let sync = SyncLayer::new(local, Some(remote), clock, SyncOptions::default());

        sync.save_profile(&Profile::default()).await;
        assert!(docs.local_first.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_remote_profile_wins_and_refreshes_cache() {
        let f = fixture();
        let identity = f.sync.ensure_auth().await.unwrap();
        f.local
            .store_profile(&Profile {
                name: "local".to_string(),
                ..Profile::default()
            })
            .await
            .unwrap();

        let mut fields = Fields::new();
        fields.insert("profile".to_string(), json!({ "name": "remote", "xp": 120 }));
        f.docs
            .set_document(&format!("users/{}", identity.uid), fields, false)
            .await
            .unwrap();

        let profile = f.sync.get_profile().await.unwrap();
        assert_eq!(profile.name, "remote");
        assert_eq!(profile.xp, 120);
        assert!(profile.dark_mode);
        assert_eq!(f.local.load_profile().await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_get_profile_falls_back_to_local() {
        let f = fixture();
        f.sync.ensure_auth().await.unwrap();
        let cached = Profile {
            name: "cached".to_string(),
            ..Profile::default()
        };
        f.local.store_profile(&cached).await.unwrap();

        // No remote document yet.
        assert_eq!(f.sync.get_profile().await, Some(cached.clone()));

        f.docs.set_unavailable(true);
        assert_eq!(f.sync.get_profile().await, Some(cached));
    }

    #[tokio::test]
    async fn test_get_profile_without_session_skips_remote() {
        let f = fixture();
        assert!(f.sync.get_profile().await.is_none());
        assert_eq!(f.auth.sign_in_count(), 0);
    }

    #[tokio::test]
    async fn test_profile_push_merges_into_user_document() {
        let f = fixture();
        let identity = f.sync.ensure_auth().await.unwrap();
        let path = format!("users/{}", identity.uid);
        let mut seed = Fields::new();
        seed.insert("createdAt".to_string(), json!("2026-01-01"));
        f.docs.set_document(&path, seed, false).await.unwrap();

        f.sync.save_profile(&Profile::default()).await;

        let stored = f.docs.get_document(&path).await.unwrap().unwrap();
        assert_eq!(stored["createdAt"], json!("2026-01-01"));
        assert_eq!(stored["profile"]["checkInTime"], json!("20:00"));
    }

    #[tokio::test]
    async fn test_journal_history_newest_first_with_ids() {
        let f = fixture();
        for (ts, text) in [(2_000, "second"), (1_000, "first"), (3_000, "third")] {
            let outcome = f.sync.save_journal_entry(&entry(ts, text)).await;
            assert!(matches!(outcome, SaveOutcome::Remote { .. }));
        }

        let history = f.sync.get_journal_history().await;
        let texts: Vec<&str> = history.iter().map(|e| e.entry.text.as_str()).collect();
        assert_eq!(texts, vec!["third", "second", "first"]);
        assert!(history.iter().all(|e| !e.id.is_empty()));
        assert!(history.iter().all(|e| e.saved_at.is_some()));
    }

    #[tokio::test]
    async fn test_journal_history_capped() {
        let f = fixture();
        for ts in 0..(HISTORY_LIMIT as i64 + 5) {
            f.sync.save_journal_entry(&entry(ts, "x")).await;
        }
        let history = f.sync.get_journal_history().await;
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].entry.timestamp, HISTORY_LIMIT as i64 + 4);
    }

    #[tokio::test]
    async fn test_journal_history_empty_without_session() {
        let f = fixture();
        assert!(f.sync.get_journal_history().await.is_empty());
        let (_, sync) = local_only();
        assert!(sync.get_journal_history().await.is_empty());
    }

    #[tokio::test]
    async fn test_check_in_goes_to_user_subcollection() {
        let f = fixture();
        let identity = f.sync.ensure_auth().await.unwrap();
        let check_in = CheckIn {
            timestamp: 1,
            mood: 70,
            tags: vec!["calm".to_string()],
            note: None,
            activity: Some("walk".to_string()),
        };

        let outcome = f.sync.save_check_in(&check_in).await;
        assert!(matches!(outcome, SaveOutcome::Remote { .. }));
        let docs = f.docs.documents(&format!("users/{}/checkins", identity.uid));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["mood"], json!(70));
        assert!(docs[0].contains_key("savedAt"));
    }

    #[tokio::test]
    async fn test_unreachable_append_is_dropped_by_default() {
        let f = fixture();
        f.auth.set_unavailable(true);
        assert_eq!(f.sync.save_journal_entry(&entry(1, "lost")).await, SaveOutcome::Skipped);
        assert_eq!(f.sync.pending_writes().await, 0);
    }

    #[tokio::test]
    async fn test_outbox_queues_and_flushes_in_order() {
        let f = fixture_with(SyncOptions {
            outbox: true,
            ..SyncOptions::default()
        });
        f.auth.set_unavailable(true);
        assert_eq!(f.sync.save_journal_entry(&entry(1, "a")).await, SaveOutcome::Queued);
        f.clock.advance(Duration::minutes(1));
        assert_eq!(f.sync.save_journal_entry(&entry(2, "b")).await, SaveOutcome::Queued);
        assert_eq!(f.sync.pending_writes().await, 2);

        f.auth.set_unavailable(false);
        assert_eq!(f.sync.flush_outbox().await, 2);
        assert_eq!(f.sync.pending_writes().await, 0);

        let history = f.sync.get_journal_history().await;
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_outbox_keeps_undelivered_tail() {
        let f = fixture_with(SyncOptions {
            outbox: true,
            ..SyncOptions::default()
        });
        f.sync.ensure_auth().await.unwrap();
        f.docs.set_unavailable(true);
        f.sync.save_journal_entry(&entry(1, "a")).await;
        f.sync.save_check_in(&CheckIn {
            timestamp: 2,
            mood: 10,
            tags: Vec::new(),
            note: None,
            activity: None,
        })
        .await;

        assert_eq!(f.sync.flush_outbox().await, 0);
        assert_eq!(f.sync.pending_writes().await, 2);

        // A later successful write drains the queue.
        f.docs.set_unavailable(false);
        let outcome = f.sync.save_journal_entry(&entry(3, "c")).await;
        assert!(matches!(outcome, SaveOutcome::Remote { .. }));
        assert_eq!(f.sync.pending_writes().await, 0);
    }

    #[tokio::test]
    async fn test_feedback_sets_flag_even_offline() {
        let (_, sync) = local_only();
        assert!(!sync.has_rated().await);
        let outcome = sync
            .save_feedback(&Feedback {
                rating: 5,
                comment: None,
            })
            .await;
        assert_eq!(outcome, SaveOutcome::Skipped);
        assert!(sync.has_rated().await);
    }

    #[tokio::test]
    async fn test_feedback_records_user_and_version() {
        let f = fixture();
        f.sync
            .save_feedback(&Feedback {
                rating: 4,
                comment: Some("bien".to_string()),
            })
            .await;
        let identity = f.sync.ensure_auth().await.unwrap();
        f.sync
            .save_feedback(&Feedback {
                rating: 5,
                comment: None,
            })
            .await;

        let docs = f.docs.documents(FEEDBACK_COLLECTION);
        assert_eq!(docs.len(), 2);
        let users: Vec<&Value> = docs.iter().map(|d| &d["userId"]).collect();
        assert!(users.contains(&&json!("anonymous")));
        assert!(users.contains(&&json!(identity.uid)));
        assert!(docs.iter().all(|d| d["appVersion"] == json!(env!("CARGO_PKG_VERSION"))));
    }

    #[tokio::test]
    async fn test_local_store_outage_still_syncs_remote() {
        let f = fixture();
        f.store.set_unavailable(true);
        f.sync.save_profile(&Profile::default()).await;

        assert_eq!(f.sync.get_profile().await, Some(Profile::default()));
        assert!(!f.sync.has_rated().await);
    }
}

use std::sync::Arc;
use tokio::sync::RwLock;

use super::session::{SessionDraft, SessionRecord};
use super::subscribers::{SnapshotCallback, SnapshotSubscribers, SubscriptionId};

/// Canonical store for session records plus its snapshot subscribers.
///
/// Sessions and subscribers live behind one lock so every mutation and its
/// broadcast happen atomically: subscribers observe mutations in exactly the
/// order they were applied, one notification per mutation, each carrying the
/// full list. Reads hand out clones; internal state is never exposed.
pub struct SessionRegistry {
    state: Arc<RwLock<RegistryState>>,
}

struct RegistryState {
    sessions: Vec<SessionRecord>,
    next_serial: u64,
    subscribers: SnapshotSubscribers,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(RwLock::new(RegistryState {
                sessions: Vec::new(),
                next_serial: 1,
                subscribers: SnapshotSubscribers::new(),
            })),
        })
    }

    /// Get a copy of every session, in insertion order.
    pub async fn snapshot(&self) -> Vec<SessionRecord> {
        let state = self.state.read().await;
        state.sessions.clone()
    }

    /// Look up a single session by id.
    pub async fn get(&self, id: &str) -> Option<SessionRecord> {
        let state = self.state.read().await;
        state.sessions.iter().find(|s| s.id == id).cloned()
    }

    /// Check whether a session with this id exists.
    pub async fn exists(&self, id: &str) -> bool {
        let state = self.state.read().await;
        state.sessions.iter().any(|s| s.id == id)
    }

    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.sessions.len()
    }

    /// Create a session from a draft. The registry assigns the id; the
    /// stored record is returned.
    pub async fn create(&self, draft: SessionDraft) -> SessionRecord {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let id = format!("session-{:06}", state.next_serial);
        state.next_serial += 1;

        let record = draft.into_record(id);
        state.sessions.push(record.clone());

        tracing::info!(
            session_id = %record.id,
            title = %record.title,
            "Session created"
        );
        state.subscribers.notify(&state.sessions);

        record
    }

    /// Replace the session whose id matches `record.id` wholesale.
    ///
    /// Returns false without mutating or notifying when the id is unknown.
    pub async fn update(&self, record: SessionRecord) -> bool {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        match state.sessions.iter().position(|s| s.id == record.id) {
            Some(index) => {
                tracing::info!(session_id = %record.id, "Session updated");
                state.sessions[index] = record;
                state.subscribers.notify(&state.sessions);
                true
            }
            None => {
                tracing::debug!(session_id = %record.id, "Update ignored, unknown session");
                false
            }
        }
    }

    /// Remove a session by id. Returns whether anything was removed;
    /// subscribers are only notified when something was.
    pub async fn remove(&self, id: &str) -> bool {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let before = state.sessions.len();
        state.sessions.retain(|s| s.id != id);

        if state.sessions.len() < before {
            tracing::info!(session_id = %id, "Session removed");
            state.subscribers.notify(&state.sessions);
            true
        } else {
            tracing::debug!(session_id = %id, "Remove ignored, unknown session");
            false
        }
    }

    /// Register a callback fired with the full list after every mutation.
    ///
    /// The callback runs synchronously inside mutating calls while the
    /// registry lock is held: it must be fast and must not call back into
    /// the registry.
    pub async fn subscribe(&self, callback: SnapshotCallback) -> SubscriptionId {
        let mut state = self.state.write().await;
        state.subscribers.subscribe(callback)
    }

    /// Like [`subscribe`](Self::subscribe), but also delivers the current
    /// list to the new callback before any later mutation can. Live feeds
    /// use this so a freshly connected consumer can never observe a newer
    /// list followed by an older one.
    pub async fn subscribe_with_initial(&self, callback: SnapshotCallback) -> SubscriptionId {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let id = state.subscribers.subscribe(callback);
        state.subscribers.notify_one(id, &state.sessions);
        id
    }

    /// Drop a subscription. Unknown handles return false.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.write().await;
        state.subscribers.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::session::{Participant, ParticipantRole, SessionStatus};
    use chrono::Utc;
    use std::sync::Mutex;

    fn draft(title: &str, duration_minutes: u32) -> SessionDraft {
        SessionDraft {
            title: title.to_string(),
            description: format!("Practice discussion covering {}", title),
            status: SessionStatus::Upcoming,
            scheduled_at: Utc::now(),
            duration_minutes,
            participants: vec![
                Participant::new(
                    "user-1",
                    "Alex Johnson",
                    "alex@example.com",
                    ParticipantRole::Moderator,
                ),
                Participant::new(
                    "user-2",
                    "Jamie Smith",
                    "jamie@example.com",
                    ParticipantRole::Participant,
                ),
            ],
            moderator_id: "user-1".to_string(),
            evaluator_ids: vec![],
        }
    }

    /// Records every delivered snapshot for later inspection.
    fn recording_subscriber() -> (SnapshotCallback, Arc<Mutex<Vec<Vec<SessionRecord>>>>) {
        let seen: Arc<Mutex<Vec<Vec<SessionRecord>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: SnapshotCallback = Box::new(move |sessions| {
            sink.lock().unwrap().push(sessions.to_vec());
        });
        (callback, seen)
    }

    #[tokio::test]
    async fn test_create_assigns_unique_ids() {
        let registry = SessionRegistry::new();

        let a = registry.create(draft("Topic A", 30)).await;
        let b = registry.create(draft("Topic B", 45)).await;
        let c = registry.create(draft("Topic C", 60)).await;

        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_ne!(a.id, c.id);
    }

    #[tokio::test]
    async fn test_create_then_read_back() {
        let registry = SessionRegistry::new();

        let created = registry.create(draft("Team Retrospective", 30)).await;

        let all = registry.snapshot().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], created);

        let fetched = registry.get(&created.id).await;
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_noop() {
        let registry = SessionRegistry::new();
        let existing = registry.create(draft("Known Session", 30)).await;

        let mut phantom = existing.clone();
        phantom.id = "session-999999".to_string();
        phantom.title = "Phantom".to_string();

        assert!(!registry.update(phantom).await);

        let all = registry.snapshot().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], existing);
    }

    #[tokio::test]
    async fn test_update_replaces_wholesale() {
        let registry = SessionRegistry::new();
        let created = registry.create(draft("Interview Practice", 30)).await;

        let mut changed = created.clone();
        changed.title = "Interview Practice (rescheduled)".to_string();
        changed.status = SessionStatus::Active;
        changed.duration_minutes = 55;

        assert!(registry.update(changed.clone()).await);

        let fetched = registry.get(&created.id).await.unwrap();
        assert_eq!(fetched, changed);
    }

    #[tokio::test]
    async fn test_remove_present_id() {
        let registry = SessionRegistry::new();
        let keep = registry.create(draft("Keep Me", 30)).await;
        let drop = registry.create(draft("Drop Me", 45)).await;

        assert!(registry.remove(&drop.id).await);

        let all = registry.snapshot().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, keep.id);
        assert_eq!(registry.get(&drop.id).await, None);
    }

    #[tokio::test]
    async fn test_remove_absent_id_is_noop() {
        let registry = SessionRegistry::new();
        registry.create(draft("Only Session", 30)).await;

        assert!(!registry.remove("session-424242").await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_one_notification_per_mutation_in_order() {
        let registry = SessionRegistry::new();
        let (callback, seen) = recording_subscriber();
        registry.subscribe(callback).await;

        let first = registry.create(draft("First", 30)).await;
        let second = registry.create(draft("Second", 45)).await;

        let mut renamed = first.clone();
        renamed.title = "First (renamed)".to_string();
        registry.update(renamed.clone()).await;
        registry.remove(&second.id).await;

        let deliveries = seen.lock().unwrap();
        assert_eq!(deliveries.len(), 4);
        assert_eq!(deliveries[0], vec![first.clone()]);
        assert_eq!(deliveries[1], vec![first.clone(), second.clone()]);
        assert_eq!(deliveries[2], vec![renamed.clone(), second]);
        assert_eq!(deliveries[3], vec![renamed]);
    }

    #[tokio::test]
    async fn test_failed_mutations_do_not_notify() {
        let registry = SessionRegistry::new();
        let created = registry.create(draft("Solo", 30)).await;

        let (callback, seen) = recording_subscriber();
        registry.subscribe(callback).await;

        let mut phantom = created.clone();
        phantom.id = "session-777777".to_string();
        registry.update(phantom).await;
        registry.remove("session-888888").await;

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_silences_subscriber() {
        let registry = SessionRegistry::new();
        let (callback, seen) = recording_subscriber();
        let id = registry.subscribe(callback).await;

        registry.create(draft("Before", 30)).await;
        assert!(registry.unsubscribe(id).await);
        registry.create(draft("After", 45)).await;

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(!registry.unsubscribe(id).await);
    }

    #[tokio::test]
    async fn test_subscribe_with_initial_delivers_current_list_once() {
        let registry = SessionRegistry::new();
        let existing = registry.create(draft("Already Here", 30)).await;

        let (callback, seen) = recording_subscriber();
        registry.subscribe_with_initial(callback).await;

        {
            let deliveries = seen.lock().unwrap();
            assert_eq!(deliveries.len(), 1);
            assert_eq!(deliveries[0], vec![existing.clone()]);
        }

        registry.create(draft("Next", 45)).await;
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_defensive_copy() {
        let registry = SessionRegistry::new();
        let created = registry.create(draft("Immutable Outside", 30)).await;

        let mut copy = registry.snapshot().await;
        copy[0].title = "Mutated Locally".to_string();
        copy.clear();

        let fetched = registry.get(&created.id).await.unwrap();
        assert_eq!(fetched.title, "Immutable Outside");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_budget_review_lifecycle() {
        let registry = SessionRegistry::new();
        let (callback, seen) = recording_subscriber();
        registry.subscribe(callback).await;

        let created = registry.create(draft("Budget Review", 30)).await;
        let mut extended = created.clone();
        extended.duration_minutes = 45;
        assert!(registry.update(extended.clone()).await);
        assert!(registry.remove(&created.id).await);

        let deliveries = seen.lock().unwrap();
        assert_eq!(deliveries.len(), 3);
        assert_eq!(deliveries[0], vec![created.clone()]);
        assert_eq!(deliveries[1].len(), 1);
        assert_eq!(deliveries[1][0].id, created.id);
        assert_eq!(deliveries[1][0].duration_minutes, 45);
        assert_eq!(deliveries[2], Vec::<SessionRecord>::new());

        assert_eq!(registry.get(&created.id).await, None);
    }
}

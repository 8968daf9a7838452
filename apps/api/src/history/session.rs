//! Editor sessions: one `Editor` per session id, shared across handlers.
//!
//! A session has a single logical writer; every handler takes the registry
//! lock for the duration of one edit. The autosave task ticks all sessions on
//! a fixed interval and writes due drafts after releasing the lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::document::Document;
use crate::history::editor::{Editor, EditorSettings};
use crate::persistence::storage::{DraftStore, StorageError};

pub struct Session {
    pub editor: Editor,
    /// Remote record this session saves into, once it has one.
    pub resume_id: Option<Uuid>,
    last_active: Instant,
}

/// What a client sees of a session after every call.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub document: Document,
    pub can_undo: bool,
    pub can_redo: bool,
    pub resume_id: Option<Uuid>,
}

impl Session {
    pub fn new(editor: Editor, resume_id: Option<Uuid>) -> Self {
        Self {
            editor,
            resume_id,
            last_active: Instant::now(),
        }
    }

    pub fn snapshot(&self, session_id: Uuid) -> SessionSnapshot {
        SessionSnapshot {
            session_id,
            document: self.editor.document().clone(),
            can_undo: self.editor.can_undo(),
            can_redo: self.editor.can_redo(),
            resume_id: self.resume_id,
        }
    }
}

/// A draft whose autosave idle gap has elapsed.
#[derive(Debug)]
pub struct DueDraft {
    pub session_id: Uuid,
    pub document: Document,
    pub resume_id: Option<Uuid>,
}

/// A session taken out of the registry after sitting idle. Its history is
/// already flushed; it still needs a final draft.
pub struct IdleSession {
    pub session_id: Uuid,
    pub session: Session,
}

#[derive(Default)]
pub struct TickOutcome {
    pub drafts: Vec<DueDraft>,
    pub idle: Vec<IdleSession>,
}

#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, Session>>>,
    settings: EditorSettings,
}

impl SessionRegistry {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            settings,
        }
    }

    pub fn settings(&self) -> EditorSettings {
        self.settings
    }

    /// Registers a session, replacing any previous one with the same id.
    pub async fn insert(&self, session_id: Uuid, session: Session) {
        self.inner.lock().await.insert(session_id, session);
        info!("Opened editor session {session_id}");
    }

    pub async fn contains(&self, session_id: Uuid) -> bool {
        self.inner.lock().await.contains_key(&session_id)
    }

    /// Runs `f` against the session while holding the registry lock, and
    /// counts as activity. Returns `None` when the session does not exist.
    pub async fn with_session<R>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Option<R> {
        let mut sessions = self.inner.lock().await;
        sessions.get_mut(&session_id).map(|session| {
            session.last_active = Instant::now();
            f(session)
        })
    }

    pub async fn remove(&self, session_id: Uuid) -> Option<Session> {
        let removed = self.inner.lock().await.remove(&session_id);
        if removed.is_some() {
            info!("Closed editor session {session_id}");
        }
        removed
    }

    /// Flushes pending history and writes a final draft, then drops the
    /// session. A session whose draft cannot be written stays registered.
    /// Returns `false` when there is no such session.
    pub async fn close(
        &self,
        session_id: Uuid,
        drafts: &DraftStore,
    ) -> Result<bool, StorageError> {
        let final_draft = self
            .with_session(session_id, |s| {
                s.editor.flush();
                s.editor
                    .has_unsaved_draft()
                    .then(|| (s.editor.document().clone(), s.resume_id))
            })
            .await;

        let Some(final_draft) = final_draft else {
            return Ok(false);
        };
        if let Some((document, resume_id)) = final_draft {
            drafts.save(session_id, &document, resume_id).await?;
        }
        self.remove(session_id).await;
        Ok(true)
    }

    /// Commits due history records in every session and collects the drafts
    /// whose autosave deadline has passed. Sessions idle past the configured
    /// timeout are flushed and taken out of the registry.
    pub async fn tick(&self, now: Instant) -> TickOutcome {
        let mut sessions = self.inner.lock().await;
        let mut outcome = TickOutcome::default();
        let mut idle_ids = Vec::new();

        for (session_id, session) in sessions.iter_mut() {
            let idle_for = now.saturating_duration_since(session.last_active);
            if idle_for >= self.settings.idle_timeout {
                idle_ids.push(*session_id);
                continue;
            }
            let committed = session.editor.commit_due(now);
            if committed > 0 {
                debug!("Session {session_id}: committed {committed} history event(s)");
            }
            if let Some(document) = session.editor.take_draft_due(now) {
                outcome.drafts.push(DueDraft {
                    session_id: *session_id,
                    document,
                    resume_id: session.resume_id,
                });
            }
        }

        for session_id in idle_ids {
            if let Some(mut session) = sessions.remove(&session_id) {
                session.editor.flush();
                outcome.idle.push(IdleSession {
                    session_id,
                    session,
                });
            }
        }
        outcome
    }

    /// Puts an idle session back after its final draft failed. A session
    /// reopened under the same id in the meantime wins.
    async fn restore(&self, session_id: Uuid, mut session: Session) {
        session.last_active = Instant::now();
        self.inner
            .lock()
            .await
            .entry(session_id)
            .or_insert(session);
    }
}

/// Writes every due draft. Failures are logged; the next edit schedules a
/// fresh attempt.
pub async fn save_due_drafts(drafts: &DraftStore, due: Vec<DueDraft>) -> usize {
    let mut saved = 0;
    for draft in due {
        match drafts
            .save(draft.session_id, &draft.document, draft.resume_id)
            .await
        {
            Ok(_) => saved += 1,
            Err(e) => error!("Autosave failed for session {}: {e}", draft.session_id),
        }
    }
    saved
}

/// Writes a final draft for each idle session. Sessions whose draft cannot be
/// written go back into the registry. Returns how many were retired.
pub async fn retire_idle(
    registry: &SessionRegistry,
    drafts: &DraftStore,
    idle: Vec<IdleSession>,
) -> usize {
    let mut retired = 0;
    for IdleSession {
        session_id,
        session,
    } in idle
    {
        match drafts
            .save(session_id, session.editor.document(), session.resume_id)
            .await
        {
            Ok(_) => {
                info!("Evicted idle editor session {session_id}");
                retired += 1;
            }
            Err(e) => {
                error!("Final draft for idle session {session_id} failed, keeping it: {e}");
                registry.restore(session_id, session).await;
            }
        }
    }
    retired
}

/// Background loop: ticks the registry every `interval`, persists drafts and
/// retires idle sessions.
pub async fn run_autosave(registry: SessionRegistry, drafts: DraftStore, interval: Duration) {
    info!("Autosave loop started (interval {}ms)", interval.as_millis());
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let TickOutcome { drafts: due, idle } = registry.tick(Instant::now()).await;
        if !due.is_empty() {
            save_due_drafts(&drafts, due).await;
        }
        if !idle.is_empty() {
            retire_idle(&registry, &drafts, idle).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Edit;
    use crate::persistence::storage::memory::MemoryStorage;

    fn settings() -> EditorSettings {
        EditorSettings {
            history_debounce: Duration::from_millis(800),
            autosave_debounce: Duration::from_secs(2),
            idle_timeout: IDLE,
        }
    }

    const IDLE: Duration = Duration::from_secs(60);

    fn memory_drafts() -> (DraftStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::default());
        (DraftStore::new(storage.clone()), storage)
    }

    async fn type_name(registry: &SessionRegistry, id: Uuid, value: &str) {
        registry
            .with_session(id, |s| {
                s.editor.dispatch(
                    &Edit::UpdateName {
                        value: value.to_string(),
                    },
                    Instant::now(),
                );
            })
            .await;
    }

    async fn registry_with_session() -> (SessionRegistry, Uuid) {
        let registry = SessionRegistry::new(settings());
        let id = Uuid::new_v4();
        registry
            .insert(id, Session::new(Editor::seeded(settings()), None))
            .await;
        (registry, id)
    }

    #[tokio::test]
    async fn test_with_session_on_unknown_id_is_none() {
        let registry = SessionRegistry::new(settings());
        let result = registry.with_session(Uuid::new_v4(), |_| ()).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_reflects_live_document() {
        let (registry, id) = registry_with_session().await;
        let snapshot = registry
            .with_session(id, |s| {
                s.editor.dispatch(
                    &Edit::UpdateName {
                        value: "Ada".to_string(),
                    },
                    Instant::now(),
                );
                s.snapshot(id)
            })
            .await
            .unwrap();

        assert_eq!(snapshot.document.name, "Ada");
        assert!(snapshot.can_undo);
        assert!(!snapshot.can_redo);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_commits_history_then_saves_draft() {
        let (registry, id) = registry_with_session().await;
        let drafts = DraftStore::new(Arc::new(MemoryStorage::default()));
        registry
            .with_session(id, |s| {
                s.editor.dispatch(
                    &Edit::UpdateName {
                        value: "Grace".to_string(),
                    },
                    Instant::now(),
                );
            })
            .await;

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(registry.tick(Instant::now()).await.drafts.is_empty());
        let events = registry
            .with_session(id, |s| s.editor.history().len())
            .await
            .unwrap();
        assert_eq!(events, 2);

        tokio::time::advance(Duration::from_secs(1)).await;
        let due = registry.tick(Instant::now()).await.drafts;
        assert_eq!(due.len(), 1);
        assert_eq!(save_due_drafts(&drafts, due).await, 1);

        let stored = drafts.load(id).await.unwrap();
        assert_eq!(stored.current_state.name, "Grace");
    }

    #[tokio::test]
    async fn test_remove_drops_session() {
        let (registry, id) = registry_with_session().await;
        assert!(registry.contains(id).await);
        assert!(registry.remove(id).await.is_some());
        assert!(!registry.contains(id).await);
        assert!(registry.remove(id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_flushed_saved_and_evicted() {
        let (registry, id) = registry_with_session().await;
        let (drafts, _) = memory_drafts();
        type_name(&registry, id, "Ada").await;

        tokio::time::advance(IDLE).await;
        let outcome = registry.tick(Instant::now()).await;
        assert!(outcome.drafts.is_empty());
        assert_eq!(outcome.idle.len(), 1);
        assert_eq!(outcome.idle[0].session.editor.pending_edits(), 0);
        assert_eq!(outcome.idle[0].session.editor.history().len(), 2);
        assert!(!registry.contains(id).await);

        assert_eq!(retire_idle(&registry, &drafts, outcome.idle).await, 1);
        assert_eq!(drafts.load(id).await.unwrap().current_state.name, "Ada");
        assert!(!registry.contains(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_keeps_session_alive() {
        let (registry, id) = registry_with_session().await;
        tokio::time::advance(Duration::from_secs(40)).await;
        registry.with_session(id, |s| s.snapshot(id)).await;
        tokio::time::advance(Duration::from_secs(40)).await;

        assert!(registry.tick(Instant::now()).await.idle.is_empty());
        assert!(registry.contains(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_stays_when_final_draft_fails() {
        let (registry, id) = registry_with_session().await;
        let (drafts, storage) = memory_drafts();
        type_name(&registry, id, "Grace").await;
        storage.set_offline(true);

        tokio::time::advance(IDLE).await;
        let idle = registry.tick(Instant::now()).await.idle;
        assert_eq!(retire_idle(&registry, &drafts, idle).await, 0);

        let name = registry
            .with_session(id, |s| s.editor.document().name.clone())
            .await;
        assert_eq!(name.as_deref(), Some("Grace"));
        assert!(registry.tick(Instant::now()).await.idle.is_empty());
    }

    #[tokio::test]
    async fn test_close_writes_final_draft_then_removes() {
        let (registry, id) = registry_with_session().await;
        let (drafts, _) = memory_drafts();
        type_name(&registry, id, "Linus").await;

        assert!(registry.close(id, &drafts).await.unwrap());
        assert!(!registry.contains(id).await);
        assert_eq!(drafts.load(id).await.unwrap().current_state.name, "Linus");
        assert!(!registry.close(id, &drafts).await.unwrap());
    }

    #[tokio::test]
    async fn test_close_keeps_session_when_draft_write_fails() {
        let (registry, id) = registry_with_session().await;
        let (drafts, storage) = memory_drafts();
        type_name(&registry, id, "Linus").await;
        storage.set_offline(true);

        assert!(registry.close(id, &drafts).await.is_err());
        assert!(registry.contains(id).await);

        storage.set_offline(false);
        assert!(registry.close(id, &drafts).await.unwrap());
        assert_eq!(drafts.load(id).await.unwrap().current_state.name, "Linus");
    }
}

//! Editor dispatcher: the only place where edits meet the history log.
//!
//! Every edit is applied to the live document immediately. Field edits are
//! parked in the debounce table and recorded once typing pauses; structural
//! edits flush whatever is pending and are recorded right away. A burst is
//! recorded against the head of the log at commit time, never against the
//! document it was typed into, so overlapping bursts on different fields stay
//! separate undo steps.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::document::{apply, Document, Edit, FieldKey, IdGenerator};
use crate::history::debounce::{Coalesce, Debouncer};
use crate::history::log::HistoryLog;

#[derive(Debug, Clone, Copy)]
pub struct EditorSettings {
    /// Idle gap after which a burst of field edits becomes one history event.
    pub history_debounce: Duration,
    /// Idle gap after which the live document is written to draft storage.
    pub autosave_debounce: Duration,
    /// Sessions untouched for this long are written out and dropped.
    pub idle_timeout: Duration,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_debounce: Duration::from_millis(800),
            autosave_debounce: Duration::from_millis(2000),
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// The newest edit of a typing burst. Field edits set a value outright, so
/// replaying the last one reproduces the whole burst.
#[derive(Debug)]
struct PendingField {
    edit: Edit,
}

impl Coalesce for PendingField {
    fn coalesce(self, newer: Self) -> Self {
        newer
    }
}

#[derive(Debug)]
pub struct Editor {
    live: Document,
    history: HistoryLog,
    ids: IdGenerator,
    pending: Debouncer<FieldKey, PendingField>,
    settings: EditorSettings,
    draft_due: Option<Instant>,
}

impl Editor {
    /// Starts an editor on `initial`. The id generator is moved past every id
    /// already present in the document.
    pub fn new(initial: Document, mut ids: IdGenerator, settings: EditorSettings) -> Self {
        ids.advance_to(initial.next_free_counter());
        Self {
            live: initial.clone(),
            history: HistoryLog::new(initial),
            ids,
            pending: Debouncer::new(settings.history_debounce),
            settings,
            draft_due: None,
        }
    }

    pub fn seeded(settings: EditorSettings) -> Self {
        let mut ids = IdGenerator::new();
        let doc = Document::seeded(&mut ids);
        Self::new(doc, ids, settings)
    }

    /// The live document, including edits not yet committed to history.
    pub fn document(&self) -> &Document {
        &self.live
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || !self.pending.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.pending.is_empty() && self.history.can_redo()
    }

    pub fn dispatch(&mut self, edit: &Edit, now: Instant) -> &Document {
        let transition = apply(&self.live, edit, &mut self.ids);
        if transition.is_noop() && edit.field_key().is_none() {
            return &self.live;
        }
        self.live = transition.after.clone();

        match edit.field_key() {
            Some(key) => self
                .pending
                .schedule(key, PendingField { edit: edit.clone() }, now),
            None => {
                self.flush();
                self.history.record(transition);
            }
        }
        self.touch(now);
        &self.live
    }

    /// Records every field burst whose idle gap has elapsed. Returns how many
    /// events were added to the log.
    pub fn commit_due(&mut self, now: Instant) -> usize {
        let due = self.pending.take_due(now);
        self.record_all(due)
    }

    /// Records every pending field burst regardless of its deadline.
    pub fn flush(&mut self) -> usize {
        let pending = self.pending.drain();
        self.record_all(pending)
    }

    pub fn undo(&mut self, now: Instant) -> bool {
        self.flush();
        match self.history.undo() {
            Some(doc) => {
                self.live = doc.clone();
                self.touch(now);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self, now: Instant) -> bool {
        self.flush();
        match self.history.redo() {
            Some(doc) => {
                self.live = doc.clone();
                self.touch(now);
                true
            }
            None => false,
        }
    }

    /// Discards the document and its history and starts over from a seeded
    /// document, exactly as a new session would.
    pub fn reset(&mut self, now: Instant) {
        self.pending.drain();
        self.ids.reset();
        let doc = Document::seeded(&mut self.ids);
        self.live = doc.clone();
        self.history = HistoryLog::new(doc);
        self.touch(now);
    }

    /// Returns the live document when the autosave idle gap has elapsed, and
    /// clears the deadline.
    pub fn take_draft_due(&mut self, now: Instant) -> Option<Document> {
        match self.draft_due {
            Some(deadline) if deadline <= now => {
                self.draft_due = None;
                Some(self.live.clone())
            }
            _ => None,
        }
    }

    /// Field edits applied to the live document but not yet in history.
    pub fn pending_edits(&self) -> usize {
        self.pending.len()
    }

    pub fn has_unsaved_draft(&self) -> bool {
        self.draft_due.is_some()
    }

    fn touch(&mut self, now: Instant) {
        self.draft_due = Some(now + self.settings.autosave_debounce);
    }

    fn record_all(&mut self, bursts: Vec<(FieldKey, PendingField)>) -> usize {
        let mut recorded = 0;
        for (key, burst) in bursts {
            let transition = apply(self.history.current(), &burst.edit, &mut self.ids);
            if self.history.record(transition) {
                recorded += 1;
            } else {
                debug!(
                    "Dropped no-op history entry for {}/{}/{}",
                    key.scope, key.target, key.field
                );
            }
        }
        recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{BulletSection, ContactField, EntrySection, ExperienceField};
    use crate::document::EventKind;

    const DEBOUNCE: Duration = Duration::from_millis(800);

    fn editor() -> Editor {
        Editor::seeded(EditorSettings {
            history_debounce: DEBOUNCE,
            autosave_debounce: Duration::from_secs(2),
            ..Default::default()
        })
    }

    fn type_name(editor: &mut Editor, text: &str, start: Instant) {
        for (i, end) in text.char_indices().map(|(i, c)| (i, i + c.len_utf8())) {
            let at = start + Duration::from_millis(100 * i as u64);
            editor.dispatch(
                &Edit::UpdateName {
                    value: text[..end].to_string(),
                },
                at,
            );
        }
    }

    #[test]
    fn test_keystrokes_are_live_but_coalesce_into_one_event() {
        let t0 = Instant::now();
        let mut ed = editor();
        type_name(&mut ed, "Ada", t0);

        assert_eq!(ed.document().name, "Ada");
        assert_eq!(ed.history().len(), 1, "nothing recorded while typing");

        assert_eq!(ed.commit_due(t0 + Duration::from_millis(900)), 0);
        assert_eq!(ed.commit_due(t0 + Duration::from_millis(1000)), 1);
        assert_eq!(ed.history().len(), 2);
        assert_eq!(ed.history().events()[1].kind, EventKind::UpdateName);
        assert_eq!(ed.history().events()[1].before.name, "");
        assert_eq!(ed.history().current().name, "Ada");
    }

    #[test]
    fn test_undo_reverts_a_whole_typing_burst() {
        let t0 = Instant::now();
        let mut ed = editor();
        type_name(&mut ed, "Grace", t0);

        assert!(ed.can_undo());
        assert!(ed.undo(t0 + Duration::from_millis(600)));
        assert_eq!(ed.document().name, "");
        assert!(ed.redo(t0 + Duration::from_millis(700)));
        assert_eq!(ed.document().name, "Grace");
    }

    fn name(value: &str) -> Edit {
        Edit::UpdateName {
            value: value.to_string(),
        }
    }

    fn email(value: &str) -> Edit {
        Edit::UpdateContact {
            field: ContactField::Email,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_overlapping_bursts_on_two_fields_undo_one_at_a_time() {
        let t0 = Instant::now();
        let ms = |n: u64| t0 + Duration::from_millis(n);
        let mut ed = editor();

        ed.dispatch(&name("A"), ms(0));
        ed.dispatch(&email("e@x"), ms(100));
        ed.dispatch(&name("Ada"), ms(500));

        // The email burst goes quiet first and is recorded first.
        assert_eq!(ed.commit_due(ms(900)), 1);
        assert_eq!(ed.commit_due(ms(1300)), 1);
        assert_eq!(ed.history().current(), ed.document());

        let events = ed.history().events();
        assert_eq!(events[1].kind, EventKind::UpdateContact);
        assert_eq!(events[1].before.name, "");
        assert_eq!(events[1].after.name, "");
        assert_eq!(events[2].kind, EventKind::UpdateName);
        assert_eq!(events[2].before, events[1].after);

        assert!(ed.undo(ms(1400)));
        assert_eq!(ed.document().name, "");
        assert_eq!(ed.document().contact.email, "e@x");
        assert_eq!(ed.history().current(), ed.document());

        assert!(ed.undo(ms(1500)));
        assert_eq!(ed.document().name, "");
        assert_eq!(ed.document().contact.email, "");
        assert!(!ed.can_undo());
    }

    #[test]
    fn test_flushed_bursts_rebuild_the_live_document() {
        let t0 = Instant::now();
        let mut ed = editor();
        let exp_id = ed.document().sections.experience[0].id.clone();

        ed.dispatch(&name("Grace"), t0);
        ed.dispatch(
            &Edit::UpdateExperience {
                id: exp_id,
                field: ExperienceField::Organization,
                value: "Navy".to_string(),
            },
            t0 + Duration::from_millis(50),
        );
        ed.dispatch(&email("grace@navy.mil"), t0 + Duration::from_millis(60));
        ed.dispatch(&name("Grace Hopper"), t0 + Duration::from_millis(70));

        assert_eq!(ed.flush(), 3);
        assert_eq!(ed.history().current(), ed.document());
        for pair in ed.history().events().windows(2) {
            assert_eq!(pair[1].before, pair[0].after);
        }
    }

    #[test]
    fn test_burst_typed_back_to_original_records_nothing() {
        let t0 = Instant::now();
        let mut ed = editor();
        ed.dispatch(&name("x"), t0);
        ed.dispatch(&name(""), t0 + Duration::from_millis(100));
        assert_eq!(ed.commit_due(t0 + Duration::from_secs(1)), 0);
        assert_eq!(ed.history().len(), 1);
    }

    #[test]
    fn test_structural_edit_flushes_pending_fields_first() {
        let t0 = Instant::now();
        let mut ed = editor();
        let exp_id = ed.document().sections.experience[0].id.clone();

        ed.dispatch(
            &Edit::UpdateExperience {
                id: exp_id.clone(),
                field: ExperienceField::Title,
                value: "Engineer".to_string(),
            },
            t0,
        );
        ed.dispatch(
            &Edit::AddBullet {
                section: BulletSection::Experience,
                entry_id: exp_id,
            },
            t0 + Duration::from_millis(10),
        );

        let kinds: Vec<EventKind> = ed.history().events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Initial,
                EventKind::UpdateSection,
                EventKind::AddBullet
            ]
        );
        assert_eq!(ed.history().current(), ed.document());

        ed.undo(t0 + Duration::from_millis(20));
        assert_eq!(ed.document().sections.experience[0].bullets.len(), 3);
        assert_eq!(ed.document().sections.experience[0].title, "Engineer");
    }

    #[test]
    fn test_noop_structural_edit_records_nothing() {
        let t0 = Instant::now();
        let mut ed = editor();
        ed.dispatch(
            &Edit::DeleteEntry {
                section: crate::document::model::Section::Projects,
                id: "missing".to_string(),
            },
            t0,
        );
        assert_eq!(ed.history().len(), 1);
        assert!(!ed.has_unsaved_draft());
    }

    #[test]
    fn test_new_edit_after_undo_kills_redo() {
        let t0 = Instant::now();
        let mut ed = editor();
        ed.dispatch(
            &Edit::AddEntry {
                section: EntrySection::Education,
            },
            t0,
        );
        ed.undo(t0);
        assert!(ed.can_redo());
        ed.dispatch(&Edit::AddSkillCategory, t0);
        assert!(!ed.can_redo());
        assert!(!ed.redo(t0));
    }

    #[test]
    fn test_draft_due_after_idle_gap() {
        let t0 = Instant::now();
        let mut ed = editor();
        ed.dispatch(&Edit::AddSkillCategory, t0);
        assert!(ed.take_draft_due(t0 + Duration::from_secs(1)).is_none());

        let draft = ed.take_draft_due(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(draft.sections.skills.len(), 4);
        assert!(ed.take_draft_due(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_reset_matches_a_fresh_session() {
        let t0 = Instant::now();
        let mut ed = editor();
        ed.dispatch(&Edit::AddSkillCategory, t0);
        ed.dispatch(
            &Edit::UpdateName {
                value: "Ada".to_string(),
            },
            t0,
        );
        ed.reset(t0);

        assert_eq!(ed.history().len(), 1);
        assert!(!ed.can_undo());
        assert_eq!(ed.document(), editor().document());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_clock_drives_commit() {
        let mut ed = editor();
        ed.dispatch(
            &Edit::UpdateName {
                value: "Linus".to_string(),
            },
            Instant::now(),
        );
        tokio::time::advance(DEBOUNCE).await;
        assert_eq!(ed.commit_due(Instant::now()), 1);
    }
}

//! Linear undo/redo history over document snapshots.
//!
//! The log is an ordered list of events plus a cursor. Index 0 is a synthetic
//! `Initial` event; the cursor always points at the event whose `after`
//! snapshot is the current document.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::document::{Document, EventKind, Transition};

#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub before: Document,
    pub after: Document,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

/// Snapshot-free view of an event for clients.
#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    pub index: usize,
    pub kind: EventKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    events: Vec<Event>,
    cursor: usize,
    current: Document,
}

impl HistoryLog {
    pub fn new(initial: Document) -> Self {
        let event = Event {
            kind: EventKind::Initial,
            before: initial.clone(),
            after: initial.clone(),
            timestamp: Utc::now(),
            description: "Initial state".to_string(),
        };
        Self {
            events: vec![event],
            cursor: 0,
            current: initial,
        }
    }

    /// Appends a transition. Returns `false` (and changes nothing) when the
    /// transition does not change the document. Any undone events after the
    /// cursor are discarded.
    pub fn record(&mut self, transition: Transition) -> bool {
        if transition.is_noop() {
            return false;
        }
        self.events.truncate(self.cursor + 1);
        self.current = transition.after.clone();
        self.events.push(Event {
            kind: transition.kind,
            before: transition.before,
            after: transition.after,
            timestamp: Utc::now(),
            description: transition.description,
        });
        self.cursor = self.events.len() - 1;
        true
    }

    /// Steps back one event. The current document becomes the state right
    /// before the undone event.
    pub fn undo(&mut self) -> Option<&Document> {
        if self.cursor == 0 {
            return None;
        }
        self.current = self.events[self.cursor].before.clone();
        self.cursor -= 1;
        Some(&self.current)
    }

    pub fn redo(&mut self) -> Option<&Document> {
        if self.cursor + 1 >= self.events.len() {
            return None;
        }
        self.cursor += 1;
        self.current = self.events[self.cursor].after.clone();
        Some(&self.current)
    }

    pub fn current(&self) -> &Document {
        &self.current
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.len()
    }

    pub fn summaries(&self) -> Vec<EventSummary> {
        self.events()
            .iter()
            .enumerate()
            .map(|(index, e)| EventSummary {
                index,
                kind: e.kind,
                description: e.description.clone(),
                timestamp: e.timestamp,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{BulletSection, EntrySection, ExperienceField};
    use crate::document::{apply, Edit, IdGenerator};

    fn setup() -> (HistoryLog, IdGenerator) {
        let mut ids = IdGenerator::new();
        let doc = Document::seeded(&mut ids);
        (HistoryLog::new(doc), ids)
    }

    fn record_edit(log: &mut HistoryLog, ids: &mut IdGenerator, edit: Edit) -> bool {
        let t = apply(log.current(), &edit, ids);
        log.record(t)
    }

    fn rename(value: &str) -> Edit {
        Edit::UpdateName {
            value: value.to_string(),
        }
    }

    #[test]
    fn test_initial_state() {
        let (log, _) = setup();
        assert_eq!(log.len(), 1);
        assert_eq!(log.cursor(), 0);
        assert_eq!(log.events()[0].kind, EventKind::Initial);
        assert_eq!(log.events()[0].before, log.events()[0].after);
        assert!(!log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn test_undo_at_oldest_is_idempotent() {
        let (mut log, _) = setup();
        let before = log.current().clone();
        assert!(log.undo().is_none());
        assert!(log.undo().is_none());
        assert_eq!(log.cursor(), 0);
        assert_eq!(log.current(), &before);
    }

    #[test]
    fn test_redo_at_newest_is_idempotent() {
        let (mut log, mut ids) = setup();
        record_edit(&mut log, &mut ids, rename("A"));
        let current = log.current().clone();
        assert!(log.redo().is_none());
        assert!(log.redo().is_none());
        assert_eq!(log.cursor(), 1);
        assert_eq!(log.current(), &current);
    }

    #[test]
    fn test_noop_record_changes_nothing() {
        let (mut log, mut ids) = setup();
        record_edit(&mut log, &mut ids, rename("A"));
        assert!(!record_edit(&mut log, &mut ids, rename("A")));
        assert!(!record_edit(
            &mut log,
            &mut ids,
            Edit::DeleteEntry {
                section: crate::document::model::Section::Skills,
                id: "nope".to_string(),
            }
        ));
        assert_eq!(log.len(), 2);
        assert_eq!(log.cursor(), 1);
    }

    #[test]
    fn test_single_undo_steps_back_one_action() {
        let (mut log, mut ids) = setup();
        record_edit(&mut log, &mut ids, rename("A"));
        record_edit(&mut log, &mut ids, rename("AB"));

        assert_eq!(log.undo().map(|d| d.name.as_str()), Some("A"));
        assert_eq!(log.undo().map(|d| d.name.as_str()), Some(""));
    }

    #[test]
    fn test_n_mutations_then_n_undos_restores_original() {
        let (mut log, mut ids) = setup();
        let original = log.current().clone();
        let exp_id = original.sections.experience[0].id.clone();

        let edits = vec![
            rename("Ada"),
            Edit::AddEntry {
                section: EntrySection::Projects,
            },
            Edit::UpdateExperience {
                id: exp_id.clone(),
                field: ExperienceField::Organization,
                value: "Analytical Engines".to_string(),
            },
            Edit::AddBullet {
                section: BulletSection::Experience,
                entry_id: exp_id,
            },
            Edit::AddSkillCategory,
        ];
        let n = edits.len();
        for edit in edits {
            assert!(record_edit(&mut log, &mut ids, edit));
        }
        for _ in 0..n {
            assert!(log.undo().is_some());
        }
        assert_eq!(log.current(), &original);
        assert_eq!(log.cursor(), 0);
    }

    #[test]
    fn test_undo_then_redo_restores_post_mutation_document() {
        let (mut log, mut ids) = setup();
        record_edit(&mut log, &mut ids, rename("A"));
        record_edit(&mut log, &mut ids, Edit::AddSkillCategory);
        let after = log.current().clone();

        log.undo();
        assert_ne!(log.current(), &after);
        log.redo();
        assert_eq!(log.current(), &after);
    }

    #[test]
    fn test_new_record_after_undo_discards_redo_branch() {
        let (mut log, mut ids) = setup();
        record_edit(&mut log, &mut ids, rename("A"));
        record_edit(&mut log, &mut ids, rename("B"));
        record_edit(&mut log, &mut ids, rename("C"));
        log.undo();
        log.undo();
        assert_eq!(log.cursor(), 1);
        assert!(log.can_redo());

        record_edit(&mut log, &mut ids, rename("D"));
        assert_eq!(log.len(), 3);
        assert_eq!(log.cursor(), 2);
        assert!(!log.can_redo());
        assert!(log.redo().is_none());
        assert_eq!(log.current().name, "D");
    }

    #[test]
    fn test_add_bullet_then_undo_restores_bullet_count() {
        let (mut log, mut ids) = setup();
        let exp_id = log.current().sections.experience[0].id.clone();
        let count_before = log.current().sections.experience[0].bullets.len();

        record_edit(
            &mut log,
            &mut ids,
            Edit::AddBullet {
                section: BulletSection::Experience,
                entry_id: exp_id,
            },
        );
        assert_eq!(
            log.current().sections.experience[0].bullets.len(),
            count_before + 1
        );

        log.undo();
        assert_eq!(
            log.current().sections.experience[0].bullets.len(),
            count_before
        );
    }

    #[test]
    fn test_summaries_follow_events() {
        let (mut log, mut ids) = setup();
        record_edit(&mut log, &mut ids, Edit::AddSkillCategory);
        let summaries = log.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].index, 1);
        assert_eq!(summaries[1].kind, EventKind::AddSkillCategory);
    }
}

//! Edit commands and the transitions they produce.
//!
//! `apply` is the single pure entry point from an `Edit` to a `Transition`.
//! The transition carries both snapshots, so the history log never needs to
//! re-derive a document from the edit that produced it.

use serde::{Deserialize, Serialize};

use crate::document::ids::IdGenerator;
use crate::document::model::{
    BulletSection, ContactField, Document, EducationField, EntrySection, ExperienceField,
    ProjectField, Section, SkillField, TitleSlot,
};
use crate::document::mutations;

/// What kind of edit an event records. Descriptive only; undo/redo work from
/// the stored snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Initial,
    AddSection,
    DeleteSection,
    AddBullet,
    DeleteBullet,
    UpdateSection,
    UpdateBullet,
    UpdateName,
    UpdateContact,
    UpdateSectionTitle,
    AddSkillCategory,
    BatchUpdate,
}

/// One user edit, as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    UpdateName {
        value: String,
    },
    UpdateContact {
        field: ContactField,
        value: String,
    },
    UpdateSectionTitle {
        section: TitleSlot,
        value: String,
    },
    AddEntry {
        section: EntrySection,
    },
    DeleteEntry {
        section: Section,
        id: String,
    },
    UpdateEducation {
        id: String,
        field: EducationField,
        value: String,
    },
    UpdateExperience {
        id: String,
        field: ExperienceField,
        value: String,
    },
    UpdateProject {
        id: String,
        field: ProjectField,
        value: String,
    },
    UpdateSkill {
        id: String,
        field: SkillField,
        value: String,
    },
    AddBullet {
        section: BulletSection,
        entry_id: String,
    },
    DeleteBullet {
        section: BulletSection,
        entry_id: String,
        bullet_id: String,
    },
    UpdateBullet {
        section: BulletSection,
        entry_id: String,
        bullet_id: String,
        text: String,
    },
    AddSkillCategory,
    /// Swaps in a whole document, e.g. the result of a PDF import.
    Replace {
        document: Document,
        #[serde(default)]
        description: Option<String>,
    },
}

/// Identifies one logical text field. Keystrokes on the same key coalesce
/// into a single history event; different keys debounce independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldKey {
    pub scope: String,
    pub target: String,
    pub field: String,
}

impl FieldKey {
    fn new(scope: &str, target: &str, field: &str) -> Self {
        Self {
            scope: scope.to_string(),
            target: target.to_string(),
            field: field.to_string(),
        }
    }
}

impl Edit {
    /// Debounce key for field-level edits; `None` for structural edits, which
    /// are recorded immediately.
    pub fn field_key(&self) -> Option<FieldKey> {
        let key = match self {
            Edit::UpdateName { .. } => FieldKey::new("header", "", "name"),
            Edit::UpdateContact { field, .. } => FieldKey::new("contact", "", field.as_str()),
            Edit::UpdateSectionTitle { section, .. } => {
                FieldKey::new("titles", "", section.as_str())
            }
            Edit::UpdateEducation { id, field, .. } => {
                FieldKey::new("education", id, field.as_str())
            }
            Edit::UpdateExperience { id, field, .. } => {
                FieldKey::new("experience", id, field.as_str())
            }
            Edit::UpdateProject { id, field, .. } => FieldKey::new("projects", id, field.as_str()),
            Edit::UpdateSkill { id, field, .. } => FieldKey::new("skills", id, field.as_str()),
            Edit::UpdateBullet {
                section,
                entry_id,
                bullet_id,
                ..
            } => FieldKey::new(
                Section::from(*section).as_str(),
                &format!("{entry_id}/{bullet_id}"),
                "text",
            ),
            Edit::AddEntry { .. }
            | Edit::DeleteEntry { .. }
            | Edit::AddBullet { .. }
            | Edit::DeleteBullet { .. }
            | Edit::AddSkillCategory
            | Edit::Replace { .. } => return None,
        };
        Some(key)
    }
}

/// Descriptor of one document transition, ready to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub kind: EventKind,
    pub description: String,
    pub before: Document,
    pub after: Document,
}

impl Transition {
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// Applies `edit` to `doc` without touching it.
pub fn apply(doc: &Document, edit: &Edit, ids: &mut IdGenerator) -> Transition {
    let (kind, description, after) = match edit {
        Edit::UpdateName { value } => (
            EventKind::UpdateName,
            "Updated name".to_string(),
            mutations::update_name(doc, value),
        ),
        Edit::UpdateContact { field, value } => (
            EventKind::UpdateContact,
            format!("Updated contact {}", field.as_str()),
            mutations::update_contact(doc, *field, value),
        ),
        Edit::UpdateSectionTitle { section, value } => (
            EventKind::UpdateSectionTitle,
            format!("Renamed {} section", section.as_str()),
            mutations::update_section_title(doc, *section, value),
        ),
        Edit::AddEntry { section } => (
            EventKind::AddSection,
            format!("Added {} entry", Section::from(*section).as_str()),
            mutations::add_entry(doc, *section, ids),
        ),
        Edit::DeleteEntry { section, id } => (
            EventKind::DeleteSection,
            format!("Deleted {} entry {id}", section.as_str()),
            mutations::delete_entry(doc, *section, id),
        ),
        Edit::UpdateEducation { id, field, value } => (
            EventKind::UpdateSection,
            format!("Updated education {} on {id}", field.as_str()),
            mutations::update_education(doc, id, *field, value),
        ),
        Edit::UpdateExperience { id, field, value } => (
            EventKind::UpdateSection,
            format!("Updated experience {} on {id}", field.as_str()),
            mutations::update_experience(doc, id, *field, value),
        ),
        Edit::UpdateProject { id, field, value } => (
            EventKind::UpdateSection,
            format!("Updated project {} on {id}", field.as_str()),
            mutations::update_project(doc, id, *field, value),
        ),
        Edit::UpdateSkill { id, field, value } => (
            EventKind::UpdateSection,
            format!("Updated skill {} on {id}", field.as_str()),
            mutations::update_skill(doc, id, *field, value),
        ),
        Edit::AddBullet { section, entry_id } => (
            EventKind::AddBullet,
            format!("Added bullet to {entry_id}"),
            mutations::add_bullet(doc, *section, entry_id, ids),
        ),
        Edit::DeleteBullet {
            section,
            entry_id,
            bullet_id,
        } => (
            EventKind::DeleteBullet,
            format!("Deleted bullet {bullet_id} from {entry_id}"),
            mutations::delete_bullet(doc, *section, entry_id, bullet_id),
        ),
        Edit::UpdateBullet {
            section,
            entry_id,
            bullet_id,
            text,
        } => (
            EventKind::UpdateBullet,
            format!("Updated bullet {bullet_id} in {entry_id}"),
            mutations::update_bullet(doc, *section, entry_id, bullet_id, text),
        ),
        Edit::AddSkillCategory => (
            EventKind::AddSkillCategory,
            "Added skill category".to_string(),
            mutations::add_skill_category(doc, ids),
        ),
        Edit::Replace {
            document,
            description,
        } => {
            let mut replacement = document.clone();
            replacement.assign_missing_ids(ids);
            (
                EventKind::BatchUpdate,
                description
                    .clone()
                    .unwrap_or_else(|| "Replaced document".to_string()),
                replacement,
            )
        }
    };

    Transition {
        kind,
        description,
        before: doc.clone(),
        after,
    }
}

//! Pure document mutations.
//!
//! Each function takes the current document and returns a new one; the input
//! is never modified. Lists and entries off the edited path keep their `Arc`s,
//! so callers can detect untouched subtrees with `Arc::ptr_eq`.
//!
//! Entries and bullets are always addressed by id. An unknown id is logged and
//! the returned document is equal to the input.

use std::sync::Arc;

use tracing::error;

use crate::document::ids::IdGenerator;
use crate::document::model::{
    blank_bullet, blank_education, blank_experience, blank_project, blank_skill, Bullet,
    BulletSection, Bulleted, ContactField, Document, EducationField, EntryList, EntrySection,
    ExperienceField, Keyed, ProjectField, Section, SkillField, TitleSlot,
};

// ────────────────────────────────────────────────────────────────────────────
// List helpers
// ────────────────────────────────────────────────────────────────────────────

fn position<T: Keyed>(list: &[Arc<T>], id: &str) -> Option<usize> {
    list.iter().position(|item| item.id() == id)
}

fn remove_in<T: Keyed + Clone>(list: &mut EntryList<T>, id: &str) -> bool {
    match position(list.as_slice(), id) {
        Some(idx) => {
            Arc::make_mut(list).remove(idx);
            true
        }
        None => false,
    }
}

fn edit_in<T: Keyed + Clone>(list: &mut EntryList<T>, id: &str, f: impl FnOnce(&mut T)) -> bool {
    let Some(idx) = position(list.as_slice(), id) else {
        return false;
    };
    f(Arc::make_mut(&mut Arc::make_mut(list)[idx]));
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Missing {
    Entry,
    Bullet,
}

/// Runs `f` on the bullet list of entry `entry_id`. `f` reports whether it
/// found its target bullet.
fn edit_bullets<T, F>(list: &mut EntryList<T>, entry_id: &str, f: F) -> Result<(), Missing>
where
    T: Bulleted + Clone,
    F: FnOnce(&mut Vec<Arc<Bullet>>) -> bool,
{
    let idx = position(list.as_slice(), entry_id).ok_or(Missing::Entry)?;
    // Work on a copy of the bullets; a miss leaves the shared list untouched.
    let mut bullets = list[idx].bullets().to_vec();
    if !f(&mut bullets) {
        return Err(Missing::Bullet);
    }
    *Arc::make_mut(&mut Arc::make_mut(list)[idx]).bullets_mut() = bullets;
    Ok(())
}

fn with_bullets(
    doc: &mut Document,
    section: BulletSection,
    entry_id: &str,
    f: impl FnOnce(&mut Vec<Arc<Bullet>>) -> bool,
) -> Result<(), Missing> {
    match section {
        BulletSection::Experience => edit_bullets(&mut doc.sections.experience, entry_id, f),
        BulletSection::Projects => edit_bullets(&mut doc.sections.projects, entry_id, f),
    }
}

fn report_missing(op: &str, section: Section, entry_id: &str, missing: Missing, bullet_id: &str) {
    match missing {
        Missing::Entry => error!(
            "{op}: no {} entry with id '{entry_id}', document left unchanged",
            section.as_str()
        ),
        Missing::Bullet => error!(
            "{op}: no bullet '{bullet_id}' in {} entry '{entry_id}', document left unchanged",
            section.as_str()
        ),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Entry mutations
// ────────────────────────────────────────────────────────────────────────────

/// Appends a blank entry with a fresh id. Experience and project entries come
/// with three blank bullets.
pub fn add_entry(doc: &Document, section: EntrySection, ids: &mut IdGenerator) -> Document {
    let mut next = doc.clone();
    match section {
        EntrySection::Education => {
            Arc::make_mut(&mut next.sections.education).push(blank_education(ids))
        }
        EntrySection::Experience => {
            Arc::make_mut(&mut next.sections.experience).push(blank_experience(ids))
        }
        EntrySection::Projects => {
            Arc::make_mut(&mut next.sections.projects).push(blank_project(ids))
        }
    }
    next
}

pub fn delete_entry(doc: &Document, section: Section, id: &str) -> Document {
    let mut next = doc.clone();
    let removed = match section {
        Section::Education => remove_in(&mut next.sections.education, id),
        Section::Experience => remove_in(&mut next.sections.experience, id),
        Section::Projects => remove_in(&mut next.sections.projects, id),
        Section::Skills => remove_in(&mut next.sections.skills, id),
    };
    if !removed {
        report_missing("delete_entry", section, id, Missing::Entry, "");
    }
    next
}

pub fn add_skill_category(doc: &Document, ids: &mut IdGenerator) -> Document {
    let mut next = doc.clone();
    Arc::make_mut(&mut next.sections.skills).push(blank_skill(ids));
    next
}

pub fn update_education(doc: &Document, id: &str, field: EducationField, value: &str) -> Document {
    let mut next = doc.clone();
    if !edit_in(&mut next.sections.education, id, |e| {
        *field.slot(e) = value.to_string()
    }) {
        report_missing("update_education", Section::Education, id, Missing::Entry, "");
    }
    next
}

pub fn update_experience(
    doc: &Document,
    id: &str,
    field: ExperienceField,
    value: &str,
) -> Document {
    let mut next = doc.clone();
    if !edit_in(&mut next.sections.experience, id, |e| {
        *field.slot(e) = value.to_string()
    }) {
        report_missing("update_experience", Section::Experience, id, Missing::Entry, "");
    }
    next
}

pub fn update_project(doc: &Document, id: &str, field: ProjectField, value: &str) -> Document {
    let mut next = doc.clone();
    if !edit_in(&mut next.sections.projects, id, |e| {
        *field.slot(e) = value.to_string()
    }) {
        report_missing("update_project", Section::Projects, id, Missing::Entry, "");
    }
    next
}

pub fn update_skill(doc: &Document, id: &str, field: SkillField, value: &str) -> Document {
    let mut next = doc.clone();
    if !edit_in(&mut next.sections.skills, id, |e| {
        *field.slot(e) = value.to_string()
    }) {
        report_missing("update_skill", Section::Skills, id, Missing::Entry, "");
    }
    next
}

// ────────────────────────────────────────────────────────────────────────────
// Bullet mutations
// ────────────────────────────────────────────────────────────────────────────

pub fn add_bullet(
    doc: &Document,
    section: BulletSection,
    entry_id: &str,
    ids: &mut IdGenerator,
) -> Document {
    let mut next = doc.clone();
    if let Err(missing) = with_bullets(&mut next, section, entry_id, |bullets| {
        bullets.push(blank_bullet(ids, section));
        true
    }) {
        report_missing("add_bullet", section.into(), entry_id, missing, "");
    }
    next
}

/// Removing the last bullet is allowed and leaves an empty list.
pub fn delete_bullet(
    doc: &Document,
    section: BulletSection,
    entry_id: &str,
    bullet_id: &str,
) -> Document {
    let mut next = doc.clone();
    if let Err(missing) = with_bullets(&mut next, section, entry_id, |bullets| {
        match position(bullets.as_slice(), bullet_id) {
            Some(idx) => {
                bullets.remove(idx);
                true
            }
            None => false,
        }
    }) {
        report_missing("delete_bullet", section.into(), entry_id, missing, bullet_id);
    }
    next
}

pub fn update_bullet(
    doc: &Document,
    section: BulletSection,
    entry_id: &str,
    bullet_id: &str,
    text: &str,
) -> Document {
    let mut next = doc.clone();
    if let Err(missing) = with_bullets(&mut next, section, entry_id, |bullets| {
        match position(bullets.as_slice(), bullet_id) {
            Some(idx) => {
                Arc::make_mut(&mut bullets[idx]).text = text.to_string();
                true
            }
            None => false,
        }
    }) {
        report_missing("update_bullet", section.into(), entry_id, missing, bullet_id);
    }
    next
}

// ────────────────────────────────────────────────────────────────────────────
// Header mutations
// ────────────────────────────────────────────────────────────────────────────

pub fn update_name(doc: &Document, value: &str) -> Document {
    let mut next = doc.clone();
    next.name = value.to_string();
    next
}

pub fn update_contact(doc: &Document, field: ContactField, value: &str) -> Document {
    let mut next = doc.clone();
    *field.slot(Arc::make_mut(&mut next.contact)) = value.to_string();
    next
}

pub fn update_section_title(doc: &Document, slot: TitleSlot, value: &str) -> Document {
    let mut next = doc.clone();
    *slot.slot(Arc::make_mut(&mut next.sections.titles)) = value.to_string();
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Document, IdGenerator) {
        let mut ids = IdGenerator::new();
        let doc = Document::seeded(&mut ids);
        (doc, ids)
    }

    #[test]
    fn test_add_experience_entry_has_three_blank_bullets() {
        let (doc, mut ids) = seeded();
        let next = add_entry(&doc, EntrySection::Experience, &mut ids);

        assert_eq!(doc.sections.experience.len(), 1, "input must not change");
        assert_eq!(next.sections.experience.len(), 2);
        let added = &next.sections.experience[1];
        assert_eq!(added.bullets.len(), 3);
        assert!(added.bullets.iter().all(|b| b.text.is_empty()));
        assert_ne!(added.id, next.sections.experience[0].id);
    }

    #[test]
    fn test_add_education_entry_shares_other_sections() {
        let (doc, mut ids) = seeded();
        let next = add_entry(&doc, EntrySection::Education, &mut ids);

        assert_eq!(next.sections.education.len(), 2);
        assert!(Arc::ptr_eq(&doc.sections.experience, &next.sections.experience));
        assert!(Arc::ptr_eq(&doc.sections.skills, &next.sections.skills));
        assert!(Arc::ptr_eq(&doc.contact, &next.contact));
    }

    #[test]
    fn test_delete_entry_by_id() {
        let (doc, mut ids) = seeded();
        let doc = add_entry(&doc, EntrySection::Projects, &mut ids);
        let victim = doc.sections.projects[0].id.clone();

        let next = delete_entry(&doc, Section::Projects, &victim);
        assert_eq!(next.sections.projects.len(), 1);
        assert_ne!(next.sections.projects[0].id, victim);
        assert!(Arc::ptr_eq(&doc.sections.projects[1], &next.sections.projects[0]));
    }

    #[test]
    fn test_delete_unknown_entry_is_noop() {
        let (doc, _) = seeded();
        let next = delete_entry(&doc, Section::Experience, "does-not-exist");
        assert_eq!(next, doc);
    }

    #[test]
    fn test_delete_skill_category() {
        let (doc, _) = seeded();
        let id = doc.sections.skills[1].id.clone();
        let next = delete_entry(&doc, Section::Skills, &id);
        assert_eq!(next.sections.skills.len(), 2);
        assert!(next.sections.skills.iter().all(|s| s.id != id));
    }

    #[test]
    fn test_add_bullet_to_entry() {
        let (doc, mut ids) = seeded();
        let entry_id = doc.sections.experience[0].id.clone();
        let next = add_bullet(&doc, BulletSection::Experience, &entry_id, &mut ids);

        assert_eq!(next.sections.experience[0].bullets.len(), 4);
        assert_eq!(doc.sections.experience[0].bullets.len(), 3);
        assert!(Arc::ptr_eq(
            &doc.sections.experience[0].bullets[0],
            &next.sections.experience[0].bullets[0]
        ));
    }

    #[test]
    fn test_add_bullet_to_unknown_entry_does_not_consume_id() {
        let (doc, mut ids) = seeded();
        let before = ids.clone();
        let next = add_bullet(&doc, BulletSection::Projects, "nope", &mut ids);
        assert_eq!(next, doc);
        assert_eq!(ids, before);
    }

    #[test]
    fn test_delete_every_bullet_leaves_empty_list() {
        let (mut doc, _) = seeded();
        let entry_id = doc.sections.projects[0].id.clone();
        let bullet_ids: Vec<String> = doc.sections.projects[0]
            .bullets
            .iter()
            .map(|b| b.id.clone())
            .collect();
        for bullet_id in &bullet_ids {
            doc = delete_bullet(&doc, BulletSection::Projects, &entry_id, bullet_id);
        }
        assert!(doc.sections.projects[0].bullets.is_empty());
    }

    #[test]
    fn test_delete_unknown_bullet_is_noop() {
        let (doc, _) = seeded();
        let entry_id = doc.sections.experience[0].id.clone();
        let next = delete_bullet(&doc, BulletSection::Experience, &entry_id, "ghost");
        assert_eq!(next, doc);
        assert!(Arc::ptr_eq(&doc.sections.experience, &next.sections.experience));
    }

    #[test]
    fn test_update_field_preserves_untouched_references() {
        let (doc, mut ids) = seeded();
        let doc = add_entry(&doc, EntrySection::Experience, &mut ids);
        let target = doc.sections.experience[0].id.clone();

        let next = update_experience(&doc, &target, ExperienceField::Title, "Staff Engineer");

        assert_eq!(next.sections.experience[0].title, "Staff Engineer");
        assert_eq!(doc.sections.experience[0].title, "");
        assert!(Arc::ptr_eq(&doc.sections.experience[1], &next.sections.experience[1]));
        assert!(Arc::ptr_eq(
            &doc.sections.experience[0].bullets[0],
            &next.sections.experience[0].bullets[0]
        ));
        assert!(Arc::ptr_eq(&doc.sections.education, &next.sections.education));
        assert!(Arc::ptr_eq(&doc.sections.titles, &next.sections.titles));
    }

    #[test]
    fn test_update_bullet_text() {
        let (doc, _) = seeded();
        let entry = &doc.sections.projects[0];
        let (entry_id, bullet_id) = (entry.id.clone(), entry.bullets[2].id.clone());

        let next = update_bullet(
            &doc,
            BulletSection::Projects,
            &entry_id,
            &bullet_id,
            "Cut build times by 40%",
        );
        assert_eq!(next.sections.projects[0].bullets[2].text, "Cut build times by 40%");
        assert!(Arc::ptr_eq(
            &doc.sections.projects[0].bullets[0],
            &next.sections.projects[0].bullets[0]
        ));
    }

    #[test]
    fn test_update_other_sections() {
        let (doc, _) = seeded();
        let edu = doc.sections.education[0].id.clone();
        let skill = doc.sections.skills[0].id.clone();
        let proj = doc.sections.projects[0].id.clone();

        let next = update_education(&doc, &edu, EducationField::School, "MIT");
        let next = update_skill(&next, &skill, SkillField::Skills, "Rust, Go");
        let next = update_project(&next, &proj, ProjectField::Tech, "axum");
        let next = update_name(&next, "Grace Hopper");
        let next = update_contact(&next, ContactField::Email, "grace@example.com");
        let next = update_section_title(&next, TitleSlot::Additional, "Skills");

        assert_eq!(next.sections.education[0].school, "MIT");
        assert_eq!(next.sections.skills[0].skills, "Rust, Go");
        assert_eq!(next.sections.projects[0].tech, "axum");
        assert_eq!(next.name, "Grace Hopper");
        assert_eq!(next.contact.email, "grace@example.com");
        assert_eq!(next.sections.titles.additional, "Skills");
        assert_eq!(next.sections.titles.education, "Education");
    }

    #[test]
    fn test_update_unknown_entry_is_noop() {
        let (doc, _) = seeded();
        let next = update_skill(&doc, "missing", SkillField::Category, "Tools");
        assert_eq!(next, doc);
    }

    #[test]
    fn test_add_skill_category() {
        let (doc, mut ids) = seeded();
        let next = add_skill_category(&doc, &mut ids);
        assert_eq!(next.sections.skills.len(), 4);
        assert!(next.sections.skills[3].category.is_empty());
    }
}

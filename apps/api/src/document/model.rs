//! Resume document model.
//!
//! Every list and entry is reference-counted so that a mutation can hand back
//! a new `Document` that shares all untouched subtrees with its input.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::ids::{counter_of, IdGenerator};

/// Number of blank bullets seeded into every new experience/project entry.
pub const SEEDED_BULLETS: usize = 3;
/// Number of blank skill categories in a seeded document.
pub const SEEDED_SKILL_CATEGORIES: usize = 3;

pub type EntryList<T> = Arc<Vec<Arc<T>>>;

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub name: String,
    pub contact: Arc<Contact>,
    pub sections: Sections,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub phone: String,
    pub email: String,
    pub website: String,
    pub linkedin: String,
    pub github: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sections {
    pub education: EntryList<EducationEntry>,
    pub experience: EntryList<ExperienceEntry>,
    pub projects: EntryList<ProjectEntry>,
    pub skills: EntryList<SkillEntry>,
    pub titles: Arc<SectionTitles>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionTitles {
    pub education: String,
    pub experience: String,
    pub projects: String,
    pub additional: String,
}

impl Default for SectionTitles {
    fn default() -> Self {
        Self {
            education: "Education".to_string(),
            experience: "Experience".to_string(),
            projects: "Projects".to_string(),
            additional: "Technical Skills".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub id: String,
    pub school: String,
    pub degree: String,
    pub location: String,
    pub dates: String,
    pub category: String,
    pub skills: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub id: String,
    pub title: String,
    pub organization: String,
    pub location: String,
    pub dates: String,
    pub bullets: Vec<Arc<Bullet>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    pub tech: String,
    pub dates: String,
    pub bullets: Vec<Arc<Bullet>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bullet {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillEntry {
    pub id: String,
    pub category: String,
    pub skills: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Addressing
// ────────────────────────────────────────────────────────────────────────────

/// Any of the four entry lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Education,
    Experience,
    Projects,
    Skills,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Education => "education",
            Section::Experience => "experience",
            Section::Projects => "projects",
            Section::Skills => "skills",
        }
    }

    /// Id prefix used for entries created in this section.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Section::Education => "edu",
            Section::Experience => "exp",
            Section::Projects => "proj",
            Section::Skills => "skill",
        }
    }
}

/// Sections that grow through "add entry". Skills grow through
/// `add_skill_category` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySection {
    Education,
    Experience,
    Projects,
}

impl From<EntrySection> for Section {
    fn from(section: EntrySection) -> Self {
        match section {
            EntrySection::Education => Section::Education,
            EntrySection::Experience => Section::Experience,
            EntrySection::Projects => Section::Projects,
        }
    }
}

/// Sections whose entries carry bullets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulletSection {
    Experience,
    Projects,
}

impl From<BulletSection> for Section {
    fn from(section: BulletSection) -> Self {
        match section {
            BulletSection::Experience => Section::Experience,
            BulletSection::Projects => Section::Projects,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSlot {
    Education,
    Experience,
    Projects,
    Additional,
}

impl TitleSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            TitleSlot::Education => "education",
            TitleSlot::Experience => "experience",
            TitleSlot::Projects => "projects",
            TitleSlot::Additional => "additional",
        }
    }

    pub fn slot(self, titles: &mut SectionTitles) -> &mut String {
        match self {
            TitleSlot::Education => &mut titles.education,
            TitleSlot::Experience => &mut titles.experience,
            TitleSlot::Projects => &mut titles.projects,
            TitleSlot::Additional => &mut titles.additional,
        }
    }
}

/// Declares a field selector enum: its wire name and the `String` it targets.
macro_rules! field_enum {
    ($name:ident for $target:ty { $($variant:ident => $field:ident),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($field)),+
                }
            }

            pub fn slot(self, target: &mut $target) -> &mut String {
                match self {
                    $($name::$variant => &mut target.$field),+
                }
            }
        }
    };
}

field_enum!(ContactField for Contact {
    Phone => phone,
    Email => email,
    Website => website,
    Linkedin => linkedin,
    Github => github,
});

field_enum!(EducationField for EducationEntry {
    School => school,
    Degree => degree,
    Location => location,
    Dates => dates,
    Category => category,
    Skills => skills,
});

field_enum!(ExperienceField for ExperienceEntry {
    Title => title,
    Organization => organization,
    Location => location,
    Dates => dates,
});

field_enum!(ProjectField for ProjectEntry {
    Name => name,
    Tech => tech,
    Dates => dates,
});

field_enum!(SkillField for SkillEntry {
    Category => category,
    Skills => skills,
});

// ────────────────────────────────────────────────────────────────────────────
// Entry traits
// ────────────────────────────────────────────────────────────────────────────

/// A list item addressed by its stable id.
pub trait Keyed {
    fn id(&self) -> &str;
    fn id_mut(&mut self) -> &mut String;
    /// True when every user-visible field is empty or whitespace.
    fn is_blank(&self) -> bool;
}

/// An entry that owns a bullet list.
pub trait Bulleted: Keyed {
    fn bullets(&self) -> &[Arc<Bullet>];
    fn bullets_mut(&mut self) -> &mut Vec<Arc<Bullet>>;
}

fn all_blank(fields: &[&str]) -> bool {
    fields.iter().all(|f| f.trim().is_empty())
}

impl Keyed for Bullet {
    fn id(&self) -> &str {
        &self.id
    }
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl Keyed for EducationEntry {
    fn id(&self) -> &str {
        &self.id
    }
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
    fn is_blank(&self) -> bool {
        all_blank(&[
            &self.school,
            &self.degree,
            &self.location,
            &self.dates,
            &self.category,
            &self.skills,
        ])
    }
}

impl Keyed for ExperienceEntry {
    fn id(&self) -> &str {
        &self.id
    }
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
    fn is_blank(&self) -> bool {
        all_blank(&[&self.title, &self.organization, &self.location, &self.dates])
            && self.bullets.iter().all(|b| b.is_blank())
    }
}

impl Bulleted for ExperienceEntry {
    fn bullets(&self) -> &[Arc<Bullet>] {
        &self.bullets
    }
    fn bullets_mut(&mut self) -> &mut Vec<Arc<Bullet>> {
        &mut self.bullets
    }
}

impl Keyed for ProjectEntry {
    fn id(&self) -> &str {
        &self.id
    }
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
    fn is_blank(&self) -> bool {
        all_blank(&[&self.name, &self.tech, &self.dates])
            && self.bullets.iter().all(|b| b.is_blank())
    }
}

impl Bulleted for ProjectEntry {
    fn bullets(&self) -> &[Arc<Bullet>] {
        &self.bullets
    }
    fn bullets_mut(&mut self) -> &mut Vec<Arc<Bullet>> {
        &mut self.bullets
    }
}

impl Keyed for SkillEntry {
    fn id(&self) -> &str {
        &self.id
    }
    fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }
    fn is_blank(&self) -> bool {
        all_blank(&[&self.category, &self.skills])
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Construction
// ────────────────────────────────────────────────────────────────────────────

pub fn blank_bullet(ids: &mut IdGenerator, section: BulletSection) -> Arc<Bullet> {
    Arc::new(Bullet {
        id: ids.next(Section::from(section).id_prefix(), "bullet"),
        text: String::new(),
    })
}

pub fn seeded_bullets(ids: &mut IdGenerator, section: BulletSection) -> Vec<Arc<Bullet>> {
    (0..SEEDED_BULLETS)
        .map(|_| blank_bullet(ids, section))
        .collect()
}

pub fn blank_education(ids: &mut IdGenerator) -> Arc<EducationEntry> {
    Arc::new(EducationEntry {
        id: ids.next(Section::Education.id_prefix(), "entry"),
        ..Default::default()
    })
}

pub fn blank_experience(ids: &mut IdGenerator) -> Arc<ExperienceEntry> {
    let id = ids.next(Section::Experience.id_prefix(), "entry");
    Arc::new(ExperienceEntry {
        id,
        bullets: seeded_bullets(ids, BulletSection::Experience),
        ..Default::default()
    })
}

pub fn blank_project(ids: &mut IdGenerator) -> Arc<ProjectEntry> {
    let id = ids.next(Section::Projects.id_prefix(), "entry");
    Arc::new(ProjectEntry {
        id,
        bullets: seeded_bullets(ids, BulletSection::Projects),
        ..Default::default()
    })
}

pub fn blank_skill(ids: &mut IdGenerator) -> Arc<SkillEntry> {
    Arc::new(SkillEntry {
        id: ids.next(Section::Skills.id_prefix(), "entry"),
        ..Default::default()
    })
}

impl Document {
    /// The document a fresh editor starts from, and the fallback for a failed
    /// import: one blank entry per section, three blank skill categories.
    pub fn seeded(ids: &mut IdGenerator) -> Self {
        let education = vec![blank_education(ids)];
        let experience = vec![blank_experience(ids)];
        let projects = vec![blank_project(ids)];
        let skills = (0..SEEDED_SKILL_CATEGORIES)
            .map(|_| blank_skill(ids))
            .collect();

        Self {
            name: String::new(),
            contact: Arc::new(Contact::default()),
            sections: Sections {
                education: Arc::new(education),
                experience: Arc::new(experience),
                projects: Arc::new(projects),
                skills: Arc::new(skills),
                titles: Arc::new(SectionTitles::default()),
            },
        }
    }

    /// Gives a fresh id to every entry and bullet whose id is empty or already
    /// used earlier in the document. The first holder of an id keeps it, and
    /// entries that needed no change keep their `Arc`s. The generator is first
    /// moved past every id the document already contains.
    pub fn assign_missing_ids(&mut self, ids: &mut IdGenerator) {
        ids.advance_to(self.next_free_counter());
        let mut seen = HashSet::new();
        let s = &mut self.sections;
        fill_ids(&mut s.education, Section::Education, ids, &mut seen);
        fill_ids(&mut s.experience, Section::Experience, ids, &mut seen);
        fill_ids(&mut s.projects, Section::Projects, ids, &mut seen);
        fill_ids(&mut s.skills, Section::Skills, ids, &mut seen);
    }
}

impl Document {
    /// Smallest counter value that cannot clash with any id in this document.
    pub fn next_free_counter(&self) -> u64 {
        let s = &self.sections;
        let bullets = s
            .experience
            .iter()
            .flat_map(|e| e.bullets.iter())
            .chain(s.projects.iter().flat_map(|p| p.bullets.iter()))
            .map(|b| b.id.as_str());
        s.education
            .iter()
            .map(|e| e.id.as_str())
            .chain(s.experience.iter().map(|e| e.id.as_str()))
            .chain(s.projects.iter().map(|e| e.id.as_str()))
            .chain(s.skills.iter().map(|e| e.id.as_str()))
            .chain(bullets)
            .filter_map(counter_of)
            .map(|n| n + 1)
            .max()
            .unwrap_or(0)
    }
}

trait BulletsOf {
    fn bullet_slice(&self) -> &[Arc<Bullet>];
    fn bullet_slice_mut(&mut self) -> &mut [Arc<Bullet>];
}

impl BulletsOf for EducationEntry {
    fn bullet_slice(&self) -> &[Arc<Bullet>] {
        &[]
    }
    fn bullet_slice_mut(&mut self) -> &mut [Arc<Bullet>] {
        &mut []
    }
}

impl BulletsOf for SkillEntry {
    fn bullet_slice(&self) -> &[Arc<Bullet>] {
        &[]
    }
    fn bullet_slice_mut(&mut self) -> &mut [Arc<Bullet>] {
        &mut []
    }
}

impl BulletsOf for ExperienceEntry {
    fn bullet_slice(&self) -> &[Arc<Bullet>] {
        &self.bullets
    }
    fn bullet_slice_mut(&mut self) -> &mut [Arc<Bullet>] {
        &mut self.bullets
    }
}

impl BulletsOf for ProjectEntry {
    fn bullet_slice(&self) -> &[Arc<Bullet>] {
        &self.bullets
    }
    fn bullet_slice_mut(&mut self) -> &mut [Arc<Bullet>] {
        &mut self.bullets
    }
}

fn entry_ids<T: Keyed + BulletsOf>(entry: &T) -> impl Iterator<Item = &str> + '_ {
    std::iter::once(entry.id()).chain(entry.bullet_slice().iter().map(|b| b.id.as_str()))
}

fn claim(seen: &mut HashSet<String>, id: &str) -> bool {
    !id.is_empty() && seen.insert(id.to_string())
}

/// Claims every id, or none of them if any is empty or taken.
fn claim_all<'a>(
    seen: &mut HashSet<String>,
    candidates: impl IntoIterator<Item = &'a str>,
) -> bool {
    let mut claimed = Vec::new();
    for id in candidates {
        if !claim(seen, id) {
            for id in &claimed {
                seen.remove(id);
            }
            return false;
        }
        claimed.push(id.to_string());
    }
    true
}

fn fresh_id(
    prefix: &str,
    salt: &str,
    ids: &mut IdGenerator,
    seen: &mut HashSet<String>,
) -> String {
    let id = ids.next(prefix, salt);
    seen.insert(id.clone());
    id
}

fn fill_ids<T>(
    list: &mut EntryList<T>,
    section: Section,
    ids: &mut IdGenerator,
    seen: &mut HashSet<String>,
) where
    T: Keyed + BulletsOf + Clone,
{
    if claim_all(seen, list.iter().flat_map(|e| entry_ids(e.as_ref()))) {
        return;
    }
    let prefix = section.id_prefix();
    for entry in Arc::make_mut(list).iter_mut() {
        if claim_all(seen, entry_ids(entry.as_ref())) {
            continue;
        }
        let entry = Arc::make_mut(entry);
        if !claim(seen, entry.id()) {
            *entry.id_mut() = fresh_id(prefix, "entry", ids, seen);
        }
        for bullet in entry.bullet_slice_mut() {
            if !claim(seen, &bullet.id) {
                Arc::make_mut(bullet).id = fresh_id(prefix, "bullet", ids, seen);
            }
        }
    }
}

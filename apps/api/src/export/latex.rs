//! Document → LaTeX source.
//!
//! Every user-supplied string passes through `escape_latex` before it is
//! interpolated, including the empty strings used for blank fields. Link
//! targets go through `escape_url` instead. Sections
//! with nothing to show are left out entirely so the output never contains an
//! empty section header.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::model::{
    Bullet, Contact, Document, EducationEntry, ExperienceEntry, Keyed, ProjectEntry, SkillEntry,
};
use crate::export::template::PREAMBLE;

/// Escapes the ten LaTeX special characters in a single pass, so replacement
/// text is never escaped twice.
pub fn escape_latex(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    for c in input.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Options
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionVisibility {
    pub education: bool,
    pub experience: bool,
    pub projects: bool,
    pub skills: bool,
}

impl Default for SectionVisibility {
    fn default() -> Self {
        Self {
            education: true,
            experience: true,
            projects: true,
            skills: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactVisibility {
    pub phone: bool,
    pub email: bool,
    pub website: bool,
    pub linkedin: bool,
    pub github: bool,
}

impl Default for ContactVisibility {
    fn default() -> Self {
        Self {
            phone: true,
            email: true,
            website: true,
            linkedin: true,
            github: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub sections: SectionVisibility,
    pub contact: ContactVisibility,
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

pub fn render_latex(doc: &Document, options: &ExportOptions) -> String {
    let mut out = String::with_capacity(PREAMBLE.len() + 4096);
    out.push_str(PREAMBLE);
    out.push_str("\\begin{document}\n\n");

    render_heading(&mut out, &doc.name, &doc.contact, &options.contact);

    let titles = &doc.sections.titles;
    if options.sections.education {
        render_education(&mut out, &titles.education, &doc.sections.education);
    }
    if options.sections.experience {
        render_experience(&mut out, &titles.experience, &doc.sections.experience);
    }
    if options.sections.projects {
        render_projects(&mut out, &titles.projects, &doc.sections.projects);
    }
    if options.sections.skills {
        render_skills(&mut out, &titles.additional, &doc.sections.skills);
    }

    out.push_str("\\end{document}\n");
    out
}

fn visible<T: Keyed>(entries: &[Arc<T>]) -> Vec<&T> {
    entries
        .iter()
        .map(|e| e.as_ref())
        .filter(|e| !e.is_blank())
        .collect()
}

fn render_heading(out: &mut String, name: &str, contact: &Contact, show: &ContactVisibility) {
    let mut items: Vec<String> = Vec::new();
    if show.phone && !contact.phone.trim().is_empty() {
        items.push(format!("\\small {}", escape_latex(&contact.phone)));
    }
    if show.email && !contact.email.trim().is_empty() {
        let email = contact.email.trim();
        items.push(format!(
            "\\href{{mailto:{}}}{{\\underline{{{}}}}}",
            escape_url(email),
            escape_latex(email)
        ));
    }
    for (enabled, value) in [
        (show.website, &contact.website),
        (show.linkedin, &contact.linkedin),
        (show.github, &contact.github),
    ] {
        if enabled && !value.trim().is_empty() {
            items.push(link(value));
        }
    }

    out.push_str("\\begin{center}\n");
    out.push_str(&format!(
        "    \\textbf{{\\Huge \\scshape {}}} \\\\ \\vspace{{1pt}}\n",
        escape_latex(name)
    ));
    if !items.is_empty() {
        out.push_str(&format!("    {}\n", items.join(" $|$ ")));
    }
    out.push_str("\\end{center}\n\n");
}

/// Links need a scheme; the visible text is shown without one.
fn link(value: &str) -> String {
    let value = value.trim();
    let shown = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .unwrap_or(value);
    let target = if shown.len() == value.len() {
        format!("https://{value}")
    } else {
        value.to_string()
    };
    format!(
        "\\href{{{}}}{{\\underline{{{}}}}}",
        escape_url(&target),
        escape_latex(shown)
    )
}

/// Escapes an `\href` target. hyperref reads the target almost verbatim, so
/// only `#` and `%` take a backslash; characters that would break the
/// argument are percent-encoded instead.
fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            '#' | '%' => {
                out.push('\\');
                out.push(c);
            }
            '\\' => out.push_str(r"\%5C"),
            '{' => out.push_str(r"\%7B"),
            '}' => out.push_str(r"\%7D"),
            c if c.is_whitespace() => out.push_str(r"\%20"),
            _ => out.push(c),
        }
    }
    out
}

fn section_header(out: &mut String, title: &str) {
    out.push_str(&format!("\\section{{{}}}\n", escape_latex(title)));
}

fn render_bullets(out: &mut String, bullets: &[Arc<Bullet>]) {
    let texts: Vec<&str> = bullets
        .iter()
        .filter(|b| !b.is_blank())
        .map(|b| b.text.as_str())
        .collect();
    if texts.is_empty() {
        return;
    }
    out.push_str("      \\resumeItemListStart\n");
    for text in texts {
        out.push_str(&format!("        \\resumeItem{{{}}}\n", escape_latex(text)));
    }
    out.push_str("      \\resumeItemListEnd\n");
}

fn render_education(out: &mut String, title: &str, entries: &[Arc<EducationEntry>]) {
    let entries = visible(entries);
    if entries.is_empty() {
        return;
    }
    section_header(out, title);
    out.push_str("  \\resumeSubHeadingListStart\n");
    for e in entries {
        out.push_str(&format!(
            "    \\resumeSubheading\n      {{{}}}{{{}}}\n      {{{}}}{{{}}}\n",
            escape_latex(&e.school),
            escape_latex(&e.location),
            escape_latex(&e.degree),
            escape_latex(&e.dates),
        ));
        if !e.skills.trim().is_empty() {
            let label = if e.category.trim().is_empty() {
                "Relevant Coursework"
            } else {
                e.category.as_str()
            };
            out.push_str("      \\resumeItemListStart\n");
            out.push_str(&format!(
                "        \\resumeItem{{\\textbf{{{}}}: {}}}\n",
                escape_latex(label),
                escape_latex(&e.skills)
            ));
            out.push_str("      \\resumeItemListEnd\n");
        }
    }
    out.push_str("  \\resumeSubHeadingListEnd\n\n");
}

fn render_experience(out: &mut String, title: &str, entries: &[Arc<ExperienceEntry>]) {
    let entries = visible(entries);
    if entries.is_empty() {
        return;
    }
    section_header(out, title);
    out.push_str("  \\resumeSubHeadingListStart\n");
    for e in entries {
        out.push_str(&format!(
            "    \\resumeSubheading\n      {{{}}}{{{}}}\n      {{{}}}{{{}}}\n",
            escape_latex(&e.title),
            escape_latex(&e.dates),
            escape_latex(&e.organization),
            escape_latex(&e.location),
        ));
        render_bullets(out, &e.bullets);
    }
    out.push_str("  \\resumeSubHeadingListEnd\n\n");
}

fn render_projects(out: &mut String, title: &str, entries: &[Arc<ProjectEntry>]) {
    let entries = visible(entries);
    if entries.is_empty() {
        return;
    }
    section_header(out, title);
    out.push_str("  \\resumeSubHeadingListStart\n");
    for p in entries {
        let tech = if p.tech.trim().is_empty() {
            String::new()
        } else {
            format!(" $|$ \\emph{{{}}}", escape_latex(&p.tech))
        };
        out.push_str(&format!(
            "    \\resumeProjectHeading\n      {{\\textbf{{{}}}{tech}}}{{{}}}\n",
            escape_latex(&p.name),
            escape_latex(&p.dates),
        ));
        render_bullets(out, &p.bullets);
    }
    out.push_str("  \\resumeSubHeadingListEnd\n\n");
}

fn render_skills(out: &mut String, title: &str, entries: &[Arc<SkillEntry>]) {
    let entries = visible(entries);
    if entries.is_empty() {
        return;
    }
    section_header(out, title);
    out.push_str(" \\begin{itemize}[leftmargin=0.15in, label={}]\n    \\small{\\item{\n");
    let lines: Vec<String> = entries
        .iter()
        .map(|s| {
            format!(
                "     \\textbf{{{}}}{{: {}}}",
                escape_latex(&s.category),
                escape_latex(&s.skills)
            )
        })
        .collect();
    out.push_str(&lines.join(" \\\\\n"));
    out.push_str("\n    }}\n \\end{itemize}\n\n");
}

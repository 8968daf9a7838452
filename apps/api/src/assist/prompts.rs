use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_FABRICATION_INSTRUCTION};

/// Extracted PDF text beyond this many characters is not sent to the model.
pub const MAX_IMPORT_CHARS: usize = 20_000;

pub fn rewrite_system() -> String {
    format!(
        "{JSON_ONLY_SYSTEM} You are an experienced technical resume editor. \
         You rewrite single resume bullet points to be concise, specific and \
         led by a strong action verb."
    )
}

pub fn build_rewrite_prompt(bullet: &str, job_description: Option<&str>) -> String {
    let target = match job_description.map(str::trim).filter(|jd| !jd.is_empty()) {
        Some(jd) => format!(
            "Tailor the wording toward this job description where the facts allow:\n\
             <job_description>\n{jd}\n</job_description>\n\n"
        ),
        None => String::new(),
    };

    format!(
        r#"Rewrite the following resume bullet point.

<bullet>
{bullet}
</bullet>

{target}Rules:
- One sentence, at most 30 words.
- Keep every number and technology that appears in the original.
- No first-person pronouns, no trailing period.

{NO_FABRICATION_INSTRUCTION}

Return JSON exactly in this shape:
{{"bullet": "<rewritten bullet>"}}"#
    )
}

pub fn import_system() -> String {
    format!(
        "{JSON_ONLY_SYSTEM} You convert the plain text of a resume into a \
         structured JSON document."
    )
}

pub fn build_import_prompt(resume_text: &str) -> String {
    let text: String = resume_text.chars().take(MAX_IMPORT_CHARS).collect();
    format!(
        r#"Convert this resume text into JSON.

<resume_text>
{text}
</resume_text>

Return JSON exactly in this shape (every value is a string; use "" when unknown):
{{
  "name": "",
  "contact": {{"phone": "", "email": "", "website": "", "linkedin": "", "github": ""}},
  "sections": {{
    "education": [{{"school": "", "degree": "", "location": "", "dates": "", "category": "Relevant Coursework", "skills": ""}}],
    "experience": [{{"title": "", "organization": "", "location": "", "dates": "", "bullets": [{{"text": ""}}]}}],
    "projects": [{{"name": "", "tech": "", "dates": "", "bullets": [{{"text": ""}}]}}],
    "skills": [{{"category": "", "skills": ""}}]
  }}
}}

- Keep entries in the order they appear in the text.
- "skills" inside a skills entry is one comma-separated string.
- Omit "id" fields.

{NO_FABRICATION_INSTRUCTION}"#
    )
}

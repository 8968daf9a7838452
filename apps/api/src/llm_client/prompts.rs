// Shared prompt fragments. Each service that calls the model keeps its own
// prompts.rs next to it; only cross-cutting pieces live here.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every prompt that works from the user's own resume text.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    CRITICAL: Use only facts present in the text you are given. \
    Do NOT invent employers, dates, degrees, metrics or technologies. \
    If a detail is missing, leave the field as an empty string.";

// AI assist: bullet rewriting and PDF import through the LLM client.

pub mod handlers;
pub mod import;
pub mod prompts;
pub mod rewrite;

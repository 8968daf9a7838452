// Persistence bridge: drafts in the key-value store, saved resumes in Postgres.

pub mod handlers;
pub mod repository;
pub mod storage;

pub use storage::{DraftStore, RedisStorage};

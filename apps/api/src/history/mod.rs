// Undo/redo history for editor sessions.
//
// `log` holds the snapshot timeline, `debounce` coalesces field edits,
// `editor` ties the two to a live document and `session` shares editors
// between request handlers.

pub mod debounce;
pub mod editor;
pub mod handlers;
pub mod log;
pub mod session;

pub use editor::{Editor, EditorSettings};
pub use session::SessionRegistry;

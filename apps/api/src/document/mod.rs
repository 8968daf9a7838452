// Resume document: model, deterministic ids, pure mutations and edit commands.
// Nothing in here performs I/O; every function is a value-in, value-out transform.

pub mod edit;
pub mod ids;
pub mod model;
pub mod mutations;

pub use edit::{apply, Edit, EventKind, FieldKey, Transition};
pub use ids::IdGenerator;
pub use model::Document;

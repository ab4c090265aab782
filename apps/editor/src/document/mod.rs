// Document Store and its path-addressed mutation engine.
// The engine is pure (Value in, Value out); the store owns the document and revisions.

pub mod edit;
pub mod engine;
pub mod path;
pub mod store;

pub use edit::{Edit, EditOutcome};
pub use engine::{IdSource, TimestampIds};
pub use store::DocumentStore;

#[cfg(test)]
pub use engine::SequentialIds;

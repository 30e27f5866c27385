//! `db` crate — in-memory workflow storage.
//!
//! spec.md treats persistent workflow storage as an external collaborator,
//! scoped down to a key/value store interface; this crate is that
//! interface, not a database layer.

pub mod error;
pub mod models;
pub mod store;

pub use error::DbError;
pub use models::StoredWorkflow;
pub use store::{InMemoryWorkflowStore, WorkflowStore};

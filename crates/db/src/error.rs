//! Typed error type for the db crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("workflow not found")]
    NotFound,

    #[error("workflow '{0}' already exists")]
    DuplicateId(uuid::Uuid),
}

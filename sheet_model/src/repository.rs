use std::fmt;

use async_trait::async_trait;

use crate::ids::{SheetId, VersionId};
use crate::sheet::Sheet;

/// External collaborator: the relational store (out of scope for this core,
/// see `spec.md` §1) consumed only through this interface.
#[async_trait]
pub trait GraphRepository: Send + Sync {
    async fn fetch_sheet(&self, id: SheetId) -> Result<Sheet, RepositoryError>;

    async fn fetch_version(&self, id: VersionId) -> Result<Sheet, RepositoryError>;
}

#[derive(Debug)]
pub enum RepositoryError {
    NotFound(String),
    Backend(String),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::NotFound(what) => write!(f, "not found: {what}"),
            RepositoryError::Backend(msg) => write!(f, "repository error: {msg}"),
        }
    }
}

impl std::error::Error for RepositoryError {}

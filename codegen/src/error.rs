use std::fmt;

use sheet_model::{RepositoryError, SheetId};

#[derive(Debug)]
pub enum CodegenError {
    Repository(RepositoryError),
    Cycle(SheetId),
    MissingNestedSheet { node_label: String },
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::Repository(e) => write!(f, "{e}"),
            CodegenError::Cycle(id) => write!(f, "sheet {id} is part of a nested-sheet cycle"),
            CodegenError::MissingNestedSheet { node_label } => {
                write!(f, "sheet node \"{node_label}\" does not reference a sheet")
            }
        }
    }
}

impl std::error::Error for CodegenError {}

impl From<RepositoryError> for CodegenError {
    fn from(e: RepositoryError) -> Self {
        CodegenError::Repository(e)
    }
}

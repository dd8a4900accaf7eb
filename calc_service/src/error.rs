use std::fmt;

use codegen::CodegenError;
use sheet_model::RepositoryError;
use worker_pool::PoolError;

#[derive(Debug)]
pub enum CalcServiceError {
    Repository(RepositoryError),
    Codegen(CodegenError),
    Pool(PoolError),
}

impl fmt::Display for CalcServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcServiceError::Repository(e) => write!(f, "{e}"),
            CalcServiceError::Codegen(e) => write!(f, "{e}"),
            CalcServiceError::Pool(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CalcServiceError {}

impl From<RepositoryError> for CalcServiceError {
    fn from(e: RepositoryError) -> Self {
        CalcServiceError::Repository(e)
    }
}

impl From<CodegenError> for CalcServiceError {
    fn from(e: CodegenError) -> Self {
        CalcServiceError::Codegen(e)
    }
}

impl From<PoolError> for CalcServiceError {
    fn from(e: PoolError) -> Self {
        CalcServiceError::Pool(e)
    }
}

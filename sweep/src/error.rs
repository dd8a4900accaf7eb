use std::fmt;

use codegen::CodegenError;
use sheet_model::RepositoryError;
use worker_pool::PoolError;

#[derive(Debug)]
pub enum SweepError {
    Repository(RepositoryError),
    Codegen(CodegenError),
    Pool(PoolError),
    InvalidAxis(String),
    TooManySteps { requested: usize, cap: usize },
    UnknownNode(String),
    TimedOut,
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::Repository(e) => write!(f, "{e}"),
            SweepError::Codegen(e) => write!(f, "{e}"),
            SweepError::Pool(e) => write!(f, "{e}"),
            SweepError::InvalidAxis(msg) => write!(f, "{msg}"),
            SweepError::TooManySteps { requested, cap } => {
                write!(f, "sweep requested {requested} steps, exceeding the cap of {cap}")
            }
            SweepError::UnknownNode(label) => write!(f, "no such node: {label}"),
            SweepError::TimedOut => write!(f, "sweep execution timed out"),
        }
    }
}

impl std::error::Error for SweepError {}

impl From<RepositoryError> for SweepError {
    fn from(e: RepositoryError) -> Self {
        SweepError::Repository(e)
    }
}

impl From<CodegenError> for SweepError {
    fn from(e: CodegenError) -> Self {
        SweepError::Codegen(e)
    }
}

impl From<PoolError> for SweepError {
    fn from(e: PoolError) -> Self {
        SweepError::Pool(e)
    }
}

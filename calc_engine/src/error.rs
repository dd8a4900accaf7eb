use std::fmt;

use calc_service::CalcServiceError;
use codegen::CodegenError;

#[derive(Debug)]
pub enum EngineError {
    Calculate(CalcServiceError),
    Emit(CodegenError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Calculate(e) => write!(f, "{e}"),
            EngineError::Emit(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<CalcServiceError> for EngineError {
    fn from(e: CalcServiceError) -> Self {
        EngineError::Calculate(e)
    }
}

impl From<CodegenError> for EngineError {
    fn from(e: CodegenError) -> Self {
        EngineError::Emit(e)
    }
}

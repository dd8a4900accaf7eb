use std::fmt;

/// Errors raised while compiling (parsing + binding) an emitted script, prior
/// to evaluating any individual node. Per-node failures during evaluation
/// never surface this type; they become a `NodeResult::hard_fail` instead
/// (see `spec.md` §4.1, §7).
#[derive(Debug)]
pub enum SandboxError {
    Parse(String),
    Globals(String),
    Cycle(String),
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxError::Parse(msg) => write!(f, "script did not parse: {msg}"),
            SandboxError::Globals(msg) => write!(f, "failed to build sandbox globals: {msg}"),
            SandboxError::Cycle(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SandboxError {}

use std::fmt;

#[derive(Debug)]
pub enum PoolError {
    Spawn(String),
    Io(String),
    Timeout,
    Protocol(String),
    Worker(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Spawn(msg) => write!(f, "failed to spawn worker: {msg}"),
            PoolError::Io(msg) => write!(f, "worker I/O error: {msg}"),
            PoolError::Timeout => write!(f, "Execution timed out"),
            PoolError::Protocol(msg) => write!(f, "malformed worker response: {msg}"),
            PoolError::Worker(msg) => write!(f, "worker reported an error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

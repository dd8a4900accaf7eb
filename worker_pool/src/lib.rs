//! A fixed pool of persistent `worker_process` children, round-robin
//! dispatched. See `spec.md` §9 "Global worker pool" and `SPEC_FULL.md` §9.

mod config;
mod error;
mod pool;
mod worker;

pub use config::Config;
pub use error::PoolError;
pub use pool::WorkerPool;

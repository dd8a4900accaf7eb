//! The wire protocol spoken between `worker_pool` and a `worker_process`
//! child. Kept as a library so both sides share one definition of `Request`
//! and `Response` instead of two copies that could drift apart.

pub mod protocol;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the global worker pool, read once at process start. See
/// `SPEC_FULL.md` §9 "Global worker pool".
#[derive(Clone, Debug)]
pub struct Config {
    /// `WORKER_COUNT`: the fixed, fair share of workers. Default 5.
    pub worker_count: usize,
    /// `WORKER_BINARY`: path to the `worker_process` executable.
    pub worker_binary: PathBuf,
    /// `WORKER_TIMEOUT_SECS`: per-request timeout before the worker is
    /// killed and respawned. Default 30s; `sweep` scales this up per batch.
    pub request_timeout: Duration,
    /// `WORKER_EXTRA_IMPORTS`: comma-separated names added to the restricted
    /// evaluator's import allow-list, beyond the built-in namespaces.
    pub extra_allowed_imports: Vec<String>,
    /// `WORKER_EXTRA_PRELOADS`: comma-separated Starlark source files to
    /// evaluate into every worker's globals before it serves any request.
    pub extra_preloads: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: 5,
            worker_binary: PathBuf::from("worker_process"),
            request_timeout: Duration::from_secs(30),
            extra_allowed_imports: Vec::new(),
            extra_preloads: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            worker_count: env_parsed("WORKER_COUNT").unwrap_or(default.worker_count),
            worker_binary: env::var("WORKER_BINARY")
                .map(PathBuf::from)
                .unwrap_or(default.worker_binary),
            request_timeout: env_parsed::<u64>("WORKER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.request_timeout),
            extra_allowed_imports: env_list("WORKER_EXTRA_IMPORTS"),
            extra_preloads: env_list("WORKER_EXTRA_PRELOADS"),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .ok()
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_used_without_env_vars() {
        let config = Config {
            worker_count: 5,
            ..Config::default()
        };
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.extra_allowed_imports.is_empty());
    }

    #[test]
    fn env_list_splits_and_trims() {
        std::env::set_var("WORKER_POOL_TEST_LIST", " a, b ,c");
        assert_eq!(env_list("WORKER_POOL_TEST_LIST"), vec!["a", "b", "c"]);
        std::env::remove_var("WORKER_POOL_TEST_LIST");
    }
}

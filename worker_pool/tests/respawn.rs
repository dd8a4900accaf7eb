//! Spawns the real `worker_process` binary and drives it through a
//! timeout, confirming the pool kills and respawns the slot rather than
//! wedging it, per `SPEC_FULL.md` §9's "timeout -> respawn -> next call
//! succeeds" commitment.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use sandbox_runtime::{CompiledUnit, NodeKind, RegistryEntry};
use serde_json::json;
use sheet_model::{Connection, NodeId};
use worker_pool::{Config, PoolError, WorkerPool};

/// `CARGO_BIN_EXE_<name>` only covers binaries owned by the package under
/// test; `worker_process` is a sibling workspace member, so its executable
/// is located the way test binaries found their own targets before that
/// env var existed: every target in a workspace lands under the same
/// `target/<profile>/` directory, one level above `deps/`.
fn worker_process_binary() -> PathBuf {
    let mut path = std::env::current_exe().expect("test binary has a path");
    path.pop();
    if path.file_name().and_then(|n| n.to_str()) == Some("deps") {
        path.pop();
    }
    path.push(if cfg!(windows) { "worker_process.exe" } else { "worker_process" });
    path
}

fn trivial_unit() -> CompiledUnit {
    let constant_id = NodeId::random();
    let output_id = NodeId::random();
    CompiledUnit {
        script: String::new(),
        entries: vec![
            RegistryEntry {
                node_id: constant_id,
                label: "A".to_string(),
                kind: NodeKind::Constant {
                    value: json!(7),
                    min: None,
                    max: None,
                    options: vec![],
                },
            },
            RegistryEntry {
                node_id: output_id,
                label: "Result".to_string(),
                kind: NodeKind::Output,
            },
        ],
        connections: vec![Connection {
            source_id: constant_id,
            source_port: "value".to_string(),
            target_id: output_id,
            target_port: "value".to_string(),
        }],
    }
}

#[tokio::test]
async fn timed_out_worker_is_respawned_and_serves_the_next_call() {
    let config = Config {
        worker_count: 1,
        worker_binary: worker_process_binary(),
        ..Config::default()
    };
    let pool = WorkerPool::new(config);
    let unit = trivial_unit();
    let overrides = BTreeMap::new();

    let timed_out = pool.execute(&unit, &overrides, Some(Duration::from_nanos(1))).await;
    assert!(matches!(timed_out, Err(PoolError::Timeout)));

    let outcome = pool
        .execute(&unit, &overrides, Some(Duration::from_secs(10)))
        .await
        .expect("the pool should have respawned the slot for this call");

    assert_eq!(
        outcome.public_outputs.get("Result").and_then(|r| r.value.clone()),
        Some(json!(7))
    );
}

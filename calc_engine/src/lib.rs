//! Top-level facade wiring the three operations the core exposes
//! (`Calculate`, `Sweep`, `EmitScript`) behind one process-wide worker pool.
//! See `spec.md` §1/§9 "Global worker pool": lazily initialized on first use,
//! shared by every request.

mod error;

use std::collections::BTreeMap;

use calc_service::CalculateResponse;
use serde_json::Value as JsonValue;
use sheet_model::{GraphRepository, SheetRef};
use sweep::{SweepRequest, SweepResponse};
use worker_pool::{Config, WorkerPool};

pub use error::EngineError;

/// Holds the one pool of worker processes a host process shares across every
/// `Calculate`/`Sweep`/`EmitScript` call. The repository is passed in per
/// call rather than stored here: it is an external collaborator the core
/// only ever borrows (`spec.md` §1).
pub struct Engine {
    pool: WorkerPool,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            pool: WorkerPool::new(config),
        }
    }

    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    pub async fn calculate(
        &self,
        repository: &dyn GraphRepository,
        sheet_ref: SheetRef,
        inputs: &BTreeMap<String, JsonValue>,
    ) -> Result<CalculateResponse, EngineError> {
        calc_service::calculate(repository, &self.pool, sheet_ref, inputs)
            .await
            .map_err(EngineError::from)
    }

    pub async fn sweep(
        &self,
        repository: &dyn GraphRepository,
        sheet_ref: SheetRef,
        request: &SweepRequest,
    ) -> SweepResponse {
        sweep::sweep(repository, &self.pool, sheet_ref, request).await
    }

    pub async fn emit_script(
        &self,
        repository: &dyn GraphRepository,
        sheet_ref: SheetRef,
    ) -> Result<String, EngineError> {
        codegen::emit_script(repository, sheet_ref)
            .await
            .map_err(EngineError::from)
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_model::testing::InMemoryRepository;
    use sheet_model::{Sheet, SheetId};

    #[tokio::test]
    async fn engine_exposes_the_configured_worker_count() {
        let engine = Engine::new(Config {
            worker_count: 3,
            ..Config::default()
        });
        assert_eq!(engine.worker_count(), 3);
    }

    #[tokio::test]
    async fn emit_script_surfaces_repository_errors() {
        let engine = Engine::new(Config {
            worker_count: 1,
            ..Config::default()
        });
        let repo = InMemoryRepository::new().with_sheet(Sheet {
            id: SheetId::random(),
            name: "Other".into(),
            nodes: vec![],
            connections: vec![],
            default_version_id: None,
        });
        let missing = SheetRef::root(SheetId::random());
        let result = engine.emit_script(&repo, missing).await;
        assert!(result.is_err());
    }
}

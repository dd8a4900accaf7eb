//! An in-memory `GraphRepository` for tests. Not part of the public API used
//! by production wiring; enabled under `test-support` so downstream crates
//! can depend on it for their own test fixtures without pulling in a real
//! store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::ids::{SheetId, VersionId};
use crate::repository::{GraphRepository, RepositoryError};
use crate::sheet::Sheet;

#[derive(Default)]
pub struct InMemoryRepository {
    sheets: Mutex<HashMap<SheetId, Sheet>>,
    versions: Mutex<HashMap<VersionId, Sheet>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(self, sheet: Sheet) -> Self {
        self.sheets.lock().insert(sheet.id, sheet);
        self
    }

    pub fn with_version(self, version_id: VersionId, sheet: Sheet) -> Self {
        self.versions.lock().insert(version_id, sheet);
        self
    }
}

#[async_trait]
impl GraphRepository for InMemoryRepository {
    async fn fetch_sheet(&self, id: SheetId) -> Result<Sheet, RepositoryError> {
        self.sheets
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("sheet {id}")))
    }

    async fn fetch_version(&self, id: VersionId) -> Result<Sheet, RepositoryError> {
        self.versions
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("version {id}")))
    }
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::filter::Filter;

/// Field holding the generated identity of every record
pub const ID_FIELD: &str = "id";

/// Everything the datasource holds; also the on-disk snapshot format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    /// Last id handed out per model
    #[serde(default)]
    ids: BTreeMap<String, u64>,
    #[serde(default)]
    models: BTreeMap<String, BTreeMap<u64, Value>>,
}

/// Named in-memory store of JSON records grouped by model name.
///
/// Ids are generated per model, start at 1, and are never reused. When a file
/// is configured every mutation rewrites the snapshot at that path.
#[derive(Debug)]
pub struct MemoryDataSource {
    name: String,
    file: Option<PathBuf>,
    state: RwLock<Snapshot>,
}

impl MemoryDataSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: None,
            state: RwLock::new(Snapshot::default()),
        }
    }

    /// Persist the store to `path` after every mutation
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Replace the in-memory state with the snapshot file, if one exists
    pub async fn load(&self) -> Result<(), StoreError> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(datasource = %self.name, path = %path.display(), "no snapshot found, starting empty");
                return Ok(());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.clone(),
                    source,
                })
            }
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        let records: usize = snapshot.models.values().map(BTreeMap::len).sum();
        *self.state.write().await = snapshot;

        tracing::info!(datasource = %self.name, records, "snapshot loaded");
        Ok(())
    }

    /// Write the current state to the snapshot file, if one is configured
    pub async fn flush(&self) -> Result<(), StoreError> {
        let state = self.state.read().await;
        self.persist(&state).await
    }

    /// Store `record` under a fresh id and return it with the id set
    pub async fn insert(&self, model: &str, record: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = record else {
            return Err(StoreError::InvalidRecord {
                model: model.to_string(),
                reason: "record must be a JSON object".to_string(),
            });
        };

        let (id, record) = self
            .commit(|state| {
                let id = {
                    let last = state.ids.entry(model.to_string()).or_insert(0);
                    *last += 1;
                    *last
                };
                fields.insert(ID_FIELD.to_string(), Value::from(id));
                let record = Value::Object(fields);
                state
                    .models
                    .entry(model.to_string())
                    .or_default()
                    .insert(id, record.clone());
                Ok((id, record))
            })
            .await?;

        tracing::debug!(datasource = %self.name, model, id, "record inserted");
        Ok(record)
    }

    pub async fn find(&self, model: &str, filter: &Filter) -> Vec<Value> {
        let state = self.state.read().await;
        let records = state
            .models
            .get(model)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        filter.apply(records)
    }

    pub async fn find_by_id(&self, model: &str, id: u64) -> Result<Value, StoreError> {
        let state = self.state.read().await;
        state
            .models
            .get(model)
            .and_then(|rows| rows.get(&id))
            .cloned()
            .ok_or_else(|| not_found(model, id))
    }

    pub async fn count(&self, model: &str) -> u64 {
        let state = self.state.read().await;
        state.models.get(model).map_or(0, |rows| rows.len() as u64)
    }

    /// Shallow-merge `patch` into the stored record. The id cannot change.
    pub async fn update_by_id(
        &self,
        model: &str,
        id: u64,
        patch: Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let updated = self
            .commit(|state| {
                let record = state
                    .models
                    .get_mut(model)
                    .and_then(|rows| rows.get_mut(&id))
                    .ok_or_else(|| not_found(model, id))?;

                if let Value::Object(fields) = record {
                    for (key, value) in patch {
                        if key != ID_FIELD {
                            fields.insert(key, value);
                        }
                    }
                }
                Ok(record.clone())
            })
            .await?;

        tracing::debug!(datasource = %self.name, model, id, "record updated");
        Ok(updated)
    }

    pub async fn delete_by_id(&self, model: &str, id: u64) -> Result<(), StoreError> {
        self.commit(|state| {
            state
                .models
                .get_mut(model)
                .and_then(|rows| rows.remove(&id))
                .map(|_| ())
                .ok_or_else(|| not_found(model, id))
        })
        .await?;

        tracing::debug!(datasource = %self.name, model, id, "record deleted");
        Ok(())
    }

    /// Apply `change` under the write lock. With a snapshot file the change is
    /// staged on a copy and only becomes visible once the file is written.
    async fn commit<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Snapshot) -> Result<T, StoreError> + Send,
        T: Send,
    {
        let mut state = self.state.write().await;
        if self.file.is_none() {
            return change(&mut state);
        }

        let mut staged = state.clone();
        let output = change(&mut staged)?;
        self.persist(&staged).await?;
        *state = staged;
        Ok(output)
    }

    /// Write `state` next to the snapshot, then rename it into place
    async fn persist(&self, state: &Snapshot) -> Result<(), StoreError> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let bytes = serde_json::to_vec_pretty(state)?;
        let staging = staging_path(path);
        tokio::fs::write(&staging, bytes).await.map_err(io_error)?;
        if let Err(source) = tokio::fs::rename(&staging, path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_error(source));
        }
        Ok(())
    }
}

/// `<snapshot>.tmp` in the same directory, so the rename stays on one filesystem
fn staging_path(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    PathBuf::from(staging)
}

fn not_found(model: &str, id: u64) -> StoreError {
    StoreError::NotFound {
        model: model.to_string(),
        id,
    }
}

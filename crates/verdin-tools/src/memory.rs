//! In-process memory store and its tool handler.
//!
//! Memory is the one capability the engine itself reads (to resolve the
//! `MEMORIES` variable), so the store ships here; all other handlers are
//! external collaborators behind `ToolHandler`.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::RwLock;

use verdin_core::error::{Result, VerdinError};
use verdin_core::traits::{MemorySource, ToolHandler};
use verdin_core::types::ToolOutput;

/// Ordered list of memory strings.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<String>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub async fn list(&self) -> Vec<String> {
        self.entries.read().await.clone()
    }

    pub async fn add(&self, text: String) {
        self.entries.write().await.push(text);
    }

    /// Remove the entry at `index`. Returns false when out of range.
    pub async fn delete(&self, index: usize) -> bool {
        let mut entries = self.entries.write().await;
        if index < entries.len() {
            entries.remove(index);
            true
        } else {
            false
        }
    }
}

impl MemorySource for MemoryStore {
    fn list(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move { Ok(MemoryStore::list(self).await) })
    }
}

#[derive(Deserialize)]
struct CreateMemoryInput {
    text: String,
}

#[derive(Deserialize)]
struct DeleteMemoryInput {
    index: usize,
}

/// Tool handler over a shared `MemoryStore`.
pub struct MemoryHandler {
    store: Arc<MemoryStore>,
}

impl MemoryHandler {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

impl ToolHandler for MemoryHandler {
    fn name(&self) -> &str {
        "memory"
    }

    fn call(
        &self,
        operation: &str,
        arguments: serde_json::Value,
    ) -> BoxFuture<'_, Result<ToolOutput>> {
        let operation = operation.to_string();
        Box::pin(async move {
            match operation.as_str() {
                "list_memories" => {
                    let entries = self.store.list().await;
                    Ok(ToolOutput::success(serde_json::to_string(&entries)?))
                }
                "create_memory" => {
                    let input: CreateMemoryInput = serde_json::from_value(arguments)
                        .map_err(|e| VerdinError::ToolExecution {
                            tool: "memory".into(),
                            message: e.to_string(),
                        })?;
                    self.store.add(input.text).await;
                    Ok(ToolOutput::success("{\"created\":true}"))
                }
                "delete_memory" => {
                    let input: DeleteMemoryInput = serde_json::from_value(arguments)
                        .map_err(|e| VerdinError::ToolExecution {
                            tool: "memory".into(),
                            message: e.to_string(),
                        })?;
                    if self.store.delete(input.index).await {
                        Ok(ToolOutput::success("{\"deleted\":true}"))
                    } else {
                        Ok(ToolOutput::error(format!(
                            "No memory at index {}",
                            input.index
                        )))
                    }
                }
                other => Err(VerdinError::OperationNotFound {
                    tool: "memory".into(),
                    operation: other.to_string(),
                }),
            }
        })
    }
}

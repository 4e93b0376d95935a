use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::Repository;
use crate::entity::{Entity, EntityId};
use crate::error::{PoError, Result};

/// Process-local repository. Identities start at 1 and are never reused,
/// so key order equals insertion order.
pub struct MemoryRepository<T> {
    inner: RwLock<Inner<T>>,
}

struct Inner<T> {
    last_id: EntityId,
    rows: BTreeMap<EntityId, T>,
}

impl<T: Entity> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                last_id: 0,
                rows: BTreeMap::new(),
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<T: Entity> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn create(&self, mut entity: T) -> Result<T> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = inner.last_id;
        entity.set_id(id);
        inner.rows.insert(id, entity.clone());
        debug!(kind = T::KIND, id, "created");
        Ok(entity)
    }

    async fn get_by_id(&self, id: EntityId) -> Result<Option<T>> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn get_all(&self, offset: usize, limit: usize) -> Result<Vec<T>> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update(&self, entity: T) -> Result<T> {
        let mut inner = self.inner.write().await;
        let id = entity.id();
        match inner.rows.get_mut(&id) {
            Some(slot) => {
                *slot = entity.clone();
                debug!(kind = T::KIND, id, "updated");
                Ok(entity)
            }
            None => Err(PoError::not_found(T::KIND, id)),
        }
    }

    async fn delete(&self, id: EntityId) -> Result<bool> {
        let removed = self.inner.write().await.rows.remove(&id).is_some();
        if removed {
            debug!(kind = T::KIND, id, "deleted");
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

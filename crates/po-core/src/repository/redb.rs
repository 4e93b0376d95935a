//! Persistent repositories backed by a single redb file.
//!
//! # Table design
//!
//! Each entity type owns one table named after [`Entity::TABLE`]:
//! ```text
//! key:   id (u64)
//! value: JSON-encoded record
//! ```
//!
//! Identities come from the `sequences` table (`table name → last issued id`),
//! bumped inside the same write transaction as the insert, so an id is never
//! handed out twice even after the record holding it is deleted. Because ids
//! only grow, key order equals insertion order and `get_all` is a plain range
//! scan.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use super::Repository;
use crate::entity::{BacklogItem, Entity, EntityId, Feedback, Sprint, Stakeholder, UserStory};
use crate::error::{PoError, Result};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

/// Key: entity table name. Value: last identity issued for that table.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

fn table<T: Entity>() -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(T::TABLE)
}

fn storage<E: std::fmt::Display>(e: E) -> PoError {
    PoError::Storage(e.to_string())
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

/// An open redb database holding every entity table.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database at `path`.
    ///
    /// Creates all entity tables and the sequence table if they don't exist
    /// yet, so read transactions never see a missing table.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path).map_err(storage)?;
        let wt = db.begin_write().map_err(storage)?;
        wt.open_table(SEQUENCES).map_err(storage)?;
        wt.open_table(table::<UserStory>()).map_err(storage)?;
        wt.open_table(table::<Sprint>()).map_err(storage)?;
        wt.open_table(table::<BacklogItem>()).map_err(storage)?;
        wt.open_table(table::<Stakeholder>()).map_err(storage)?;
        wt.open_table(table::<Feedback>()).map_err(storage)?;
        wt.commit().map_err(storage)?;
        debug!(path = %path.display(), "opened redb store");
        Ok(Self { db: Arc::new(db) })
    }

    pub fn repository<T: Entity>(&self) -> RedbRepository<T> {
        RedbRepository {
            db: Arc::clone(&self.db),
            _entity: PhantomData,
        }
    }
}

// ---------------------------------------------------------------------------
// RedbRepository
// ---------------------------------------------------------------------------

/// Repository for one entity type inside a [`RedbStore`].
pub struct RedbRepository<T> {
    db: Arc<Database>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> RedbRepository<T> {
    fn decode(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(storage)
    }

    /// Run `f` against the database on tokio's blocking pool.
    async fn blocking<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Database) -> Result<R> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(storage)?
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for RedbRepository<T> {
    async fn create(&self, mut entity: T) -> Result<T> {
        let entity = self
            .blocking(move |db| {
                let wt = db.begin_write().map_err(storage)?;
                {
                    let mut seq = wt.open_table(SEQUENCES).map_err(storage)?;
                    let last = seq
                        .get(T::TABLE)
                        .map_err(storage)?
                        .map(|g| g.value())
                        .unwrap_or(0);
                    let id = last + 1;
                    seq.insert(T::TABLE, id).map_err(storage)?;

                    entity.set_id(id);
                    let value = serde_json::to_vec(&entity).map_err(storage)?;
                    let mut rows = wt.open_table(table::<T>()).map_err(storage)?;
                    rows.insert(id, value.as_slice()).map_err(storage)?;
                }
                wt.commit().map_err(storage)?;
                Ok(entity)
            })
            .await?;
        debug!(kind = T::KIND, id = entity.id(), "created");
        Ok(entity)
    }

    async fn get_by_id(&self, id: EntityId) -> Result<Option<T>> {
        self.blocking(move |db| {
            let rt = db.begin_read().map_err(storage)?;
            let rows = rt.open_table(table::<T>()).map_err(storage)?;
            match rows.get(id).map_err(storage)? {
                Some(guard) => Ok(Some(Self::decode(guard.value())?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn get_all(&self, offset: usize, limit: usize) -> Result<Vec<T>> {
        self.blocking(move |db| {
            let rt = db.begin_read().map_err(storage)?;
            let rows = rt.open_table(table::<T>()).map_err(storage)?;

            let mut result = Vec::new();
            for entry in rows.iter().map_err(storage)?.skip(offset).take(limit) {
                let (_, v) = entry.map_err(storage)?;
                result.push(Self::decode(v.value())?);
            }
            Ok(result)
        })
        .await
    }

    async fn update(&self, entity: T) -> Result<T> {
        let id = entity.id();
        let value = serde_json::to_vec(&entity).map_err(storage)?;
        self.blocking(move |db| {
            let wt = db.begin_write().map_err(storage)?;
            {
                let mut rows = wt.open_table(table::<T>()).map_err(storage)?;
                let exists = rows.get(id).map_err(storage)?.is_some();
                if !exists {
                    return Err(PoError::not_found(T::KIND, id));
                }
                rows.insert(id, value.as_slice()).map_err(storage)?;
            }
            wt.commit().map_err(storage)
        })
        .await?;
        debug!(kind = T::KIND, id, "updated");
        Ok(entity)
    }

    async fn delete(&self, id: EntityId) -> Result<bool> {
        let removed = self
            .blocking(move |db| {
                let wt = db.begin_write().map_err(storage)?;
                let removed = {
                    let mut rows = wt.open_table(table::<T>()).map_err(storage)?;
                    let removed = rows.remove(id).map_err(storage)?.is_some();
                    removed
                };
                wt.commit().map_err(storage)?;
                Ok(removed)
            })
            .await?;
        if removed {
            debug!(kind = T::KIND, id, "deleted");
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::StoryStatus;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, RedbStore) {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("po.redb")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn create_then_get_roundtrips_record() {
        let (_dir, store) = open_tmp();
        let repo = store.repository::<UserStory>();
        let mut story = UserStory::new("Login", "As a user I can log in");
        story.acceptance_criteria = vec!["valid creds".into(), "bad creds".into()];
        let created = repo.create(story).await.unwrap();
        assert_eq!(created.id, 1);

        let loaded = repo.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.acceptance_criteria.len(), 2);
    }

    #[tokio::test]
    async fn ids_are_independent_per_table() {
        let (_dir, store) = open_tmp();
        let stories = store.repository::<UserStory>();
        let people = store.repository::<Stakeholder>();
        stories.create(UserStory::new("a", "a")).await.unwrap();
        stories.create(UserStory::new("b", "b")).await.unwrap();
        let p = people.create(Stakeholder::new("Ada", "CTO", "ada@x")).await.unwrap();
        assert_eq!(p.id, 1);
    }

    #[tokio::test]
    async fn deleted_last_id_is_not_reissued() {
        let (_dir, store) = open_tmp();
        let repo = store.repository::<UserStory>();
        let a = repo.create(UserStory::new("a", "a")).await.unwrap();
        assert!(repo.delete(a.id).await.unwrap());
        assert!(!repo.delete(a.id).await.unwrap());
        let b = repo.create(UserStory::new("b", "b")).await.unwrap();
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn update_persists_and_missing_is_not_found() {
        let (_dir, store) = open_tmp();
        let repo = store.repository::<UserStory>();
        let mut a = repo.create(UserStory::new("a", "a")).await.unwrap();
        a.status = StoryStatus::InProgress;
        repo.update(a.clone()).await.unwrap();
        assert_eq!(
            repo.get_by_id(a.id).await.unwrap().unwrap().status,
            StoryStatus::InProgress
        );

        let mut ghost = UserStory::new("g", "g");
        ghost.id = 99;
        let err = repo.update(ghost).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(repo.get_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_all_is_insertion_ordered_and_paged() {
        let (_dir, store) = open_tmp();
        let repo = store.repository::<UserStory>();
        for t in ["a", "b", "c"] {
            repo.create(UserStory::new(t, t)).await.unwrap();
        }
        let titles: Vec<_> = repo
            .get_all(0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(repo.get_all(2, 10).await.unwrap().len(), 1);
        assert_eq!(repo.get_all(0, 2).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_get_distinct_ids() {
        let (_dir, store) = open_tmp();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = store.repository::<UserStory>();
                tokio::spawn(async move {
                    let title = format!("story {i}");
                    repo.create(UserStory::new(&title, &title)).await.unwrap().id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());
        let repo = store.repository::<UserStory>();
        assert_eq!(repo.get_all(0, 100).await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("po.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store
                .repository::<UserStory>()
                .create(UserStory::new("kept", "kept"))
                .await
                .unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        let repo = store.repository::<UserStory>();
        assert_eq!(repo.get_by_id(1).await.unwrap().unwrap().title, "kept");
        let next = repo.create(UserStory::new("next", "next")).await.unwrap();
        assert_eq!(next.id, 2);
    }
}

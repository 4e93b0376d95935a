//! Storage contracts for the entity model.
//!
//! One generic CRUD contract covers all five entity types. Each call is a
//! single atomic storage operation; concurrent writers to the same record
//! resolve last-write-wins.
//!
//! Two backends are provided:
//! - [`MemoryRepository`]: process-local, for tests and `memory://` storage.
//! - [`RedbStore`]: a redb file with one table per entity.

pub mod memory;
pub mod redb;

use std::sync::Arc;

use async_trait::async_trait;

use crate::entity::{BacklogItem, Entity, EntityId, Feedback, Sprint, Stakeholder, UserStory};
use crate::error::{PoError, Result};
use crate::types::SprintStatus;

pub use self::memory::MemoryRepository;
pub use self::redb::{RedbRepository, RedbStore};

/// Page size used when a caller needs every record.
pub const PAGE_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Persist a new record, assigning it a fresh identity. Any identity on
    /// the incoming record is ignored.
    async fn create(&self, entity: T) -> Result<T>;

    async fn get_by_id(&self, id: EntityId) -> Result<Option<T>>;

    /// Records in insertion order, skipping `offset` and returning at most `limit`.
    async fn get_all(&self, offset: usize, limit: usize) -> Result<Vec<T>>;

    /// Replace an existing record. Fails with `NotFound` when the identity
    /// does not exist.
    async fn update(&self, entity: T) -> Result<T>;

    /// Remove a record. Returns `false` if it was already absent.
    async fn delete(&self, id: EntityId) -> Result<bool>;
}

/// Like `get_by_id`, but an absent record is a `NotFound` error.
pub async fn require<T, R>(repo: &R, id: EntityId) -> Result<T>
where
    T: Entity,
    R: Repository<T> + ?Sized,
{
    repo.get_by_id(id)
        .await?
        .ok_or_else(|| PoError::not_found(T::KIND, id))
}

/// Page through `get_all` until the repository is exhausted.
pub async fn collect_all<T, R>(repo: &R) -> Result<Vec<T>>
where
    T: Entity,
    R: Repository<T> + ?Sized,
{
    let mut out = Vec::new();
    loop {
        let page = repo.get_all(out.len(), PAGE_SIZE).await?;
        let done = page.len() < PAGE_SIZE;
        out.extend(page);
        if done {
            return Ok(out);
        }
    }
}

/// The first sprint whose status is `ACTIVE`, if any.
pub async fn active_sprint<R>(repo: &R) -> Result<Option<Sprint>>
where
    R: Repository<Sprint> + ?Sized,
{
    Ok(collect_all::<Sprint, R>(repo)
        .await?
        .into_iter()
        .find(|s| s.status == SprintStatus::Active))
}

/// All feedback left by one stakeholder, oldest first.
pub async fn feedback_for_stakeholder<R>(repo: &R, stakeholder_id: EntityId) -> Result<Vec<Feedback>>
where
    R: Repository<Feedback> + ?Sized,
{
    Ok(collect_all::<Feedback, R>(repo)
        .await?
        .into_iter()
        .filter(|f| f.stakeholder_id == stakeholder_id)
        .collect())
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// The full set of repositories a workflow needs.
#[derive(Clone)]
pub struct Repositories {
    pub stories: Arc<dyn Repository<UserStory>>,
    pub sprints: Arc<dyn Repository<Sprint>>,
    pub backlog: Arc<dyn Repository<BacklogItem>>,
    pub stakeholders: Arc<dyn Repository<Stakeholder>>,
    pub feedback: Arc<dyn Repository<Feedback>>,
}

impl Repositories {
    /// Fresh, empty in-memory repositories.
    pub fn in_memory() -> Self {
        Self {
            stories: Arc::new(MemoryRepository::<UserStory>::new()),
            sprints: Arc::new(MemoryRepository::<Sprint>::new()),
            backlog: Arc::new(MemoryRepository::<BacklogItem>::new()),
            stakeholders: Arc::new(MemoryRepository::<Stakeholder>::new()),
            feedback: Arc::new(MemoryRepository::<Feedback>::new()),
        }
    }

    /// Repositories backed by tables in one redb store.
    pub fn redb(store: &RedbStore) -> Self {
        Self {
            stories: Arc::new(store.repository::<UserStory>()),
            sprints: Arc::new(store.repository::<Sprint>()),
            backlog: Arc::new(store.repository::<BacklogItem>()),
            stakeholders: Arc::new(store.repository::<Stakeholder>()),
            feedback: Arc::new(store.repository::<Feedback>()),
        }
    }
}

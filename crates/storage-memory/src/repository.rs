// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use futures_util::{FutureExt, future::BoxFuture};
use ghlink_data_model::{BountyRecord, LinkRequest};
use ghlink_storage::{
    BoxRepository, BoxRepositoryFactory, MapErr, Repository, RepositoryAccess, RepositoryError,
    RepositoryFactory, RepositoryTransaction, bounty::BountyRepository,
    github_link::GithubLinkRepository,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use ulid::Ulid;

use crate::{
    MemoryError, bounty::MemoryBountyRepository, github_link::MemoryGithubLinkRepository,
};

#[derive(Debug, Default, Clone)]
pub(crate) struct Tables {
    pub(crate) github_links: BTreeMap<Ulid, LinkRequest>,
    pub(crate) bounties: BTreeMap<Ulid, BountyRecord>,
}

/// An implementation of the [`RepositoryFactory`] trait keeping everything in
/// memory
#[derive(Clone, Default)]
pub struct MemoryRepositoryFactory {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryRepositoryFactory {
    /// Create a new, empty [`MemoryRepositoryFactory`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Box the factory
    #[must_use]
    pub fn boxed(self) -> BoxRepositoryFactory {
        Arc::new(self)
    }

    /// Start a new unit of work, waiting for the current one to finish
    pub async fn begin(&self) -> MemoryRepository {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        MemoryRepository { guard, working }
    }
}

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    async fn create(&self) -> Result<BoxRepository, RepositoryError> {
        Ok(self.begin().await.boxed())
    }
}

/// An implementation of the [`Repository`] trait working on a copy of the
/// in-memory tables
pub struct MemoryRepository {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

impl MemoryRepository {
    /// Transform the repository into a type-erased [`BoxRepository`]
    #[must_use]
    pub fn boxed(self) -> BoxRepository {
        Box::new(MapErr::new(self, RepositoryError::from_error))
    }
}

impl Repository<MemoryError> for MemoryRepository {}

impl RepositoryTransaction for MemoryRepository {
    type Error = MemoryError;

    fn save(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        let Self { mut guard, working } = *self;
        *guard = working;
        tracing::debug!(
            github_links = guard.github_links.len(),
            bounties = guard.bounties.len(),
            "Saved in-memory tables"
        );
        futures_util::future::ok(()).boxed()
    }

    fn cancel(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        tracing::debug!("Discarded in-memory changes");
        futures_util::future::ok(()).boxed()
    }
}

impl RepositoryAccess for MemoryRepository {
    type Error = MemoryError;

    fn github_link<'c>(
        &'c mut self,
    ) -> Box<dyn GithubLinkRepository<Error = Self::Error> + 'c> {
        Box::new(MemoryGithubLinkRepository::new(&mut self.working))
    }

    fn bounty<'c>(&'c mut self) -> Box<dyn BountyRepository<Error = Self::Error> + 'c> {
        Box::new(MemoryBountyRepository::new(&mut self.working))
    }
}

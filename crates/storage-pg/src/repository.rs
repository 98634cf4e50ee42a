// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{FutureExt, TryFutureExt, future::BoxFuture};
use ghlink_storage::{
    BoxRepository, BoxRepositoryFactory, MapErr, Repository, RepositoryAccess, RepositoryError,
    RepositoryFactory, RepositoryTransaction, bounty::BountyRepository,
    github_link::GithubLinkRepository,
};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::Instrument;

use crate::{DatabaseError, bounty::PgBountyRepository, github_link::PgGithubLinkRepository};

/// Hands out one [`PgRepository`] per request, each in its own transaction
#[derive(Clone)]
pub struct PgRepositoryFactory {
    pool: PgPool,
}

impl PgRepositoryFactory {
    /// Create a factory drawing connections from the given pool
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Share the factory as a [`BoxRepositoryFactory`]
    #[must_use]
    pub fn boxed(self) -> BoxRepositoryFactory {
        Arc::new(self)
    }
}

#[async_trait]
impl RepositoryFactory for PgRepositoryFactory {
    #[tracing::instrument(name = "db.repository.create", skip_all, err)]
    async fn create(&self) -> Result<BoxRepository, RepositoryError> {
        let repo = PgRepository::from_pool(&self.pool)
            .await
            .map_err(RepositoryError::from_error)?;

        Ok(repo.boxed())
    }
}

/// A [`Repository`] running everything in a single PostgreSQL transaction
///
/// Nothing is visible to other repositories until [`RepositoryTransaction::save`]
/// commits it. Dropping the repository rolls the transaction back.
pub struct PgRepository {
    txn: Transaction<'static, Postgres>,
}

impl PgRepository {
    /// Start a new transaction on a connection from the pool
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] if no connection could be acquired, or if
    /// the transaction could not be started
    pub async fn from_pool(pool: &PgPool) -> Result<Self, DatabaseError> {
        let txn = pool.begin().await?;
        Ok(Self { txn })
    }

    /// Erase the error type, turning it into a [`BoxRepository`]
    #[must_use]
    pub fn boxed(self) -> BoxRepository {
        Box::new(MapErr::new(self, RepositoryError::from_error))
    }
}

impl Repository<DatabaseError> for PgRepository {}

impl RepositoryTransaction for PgRepository {
    type Error = DatabaseError;

    fn save(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        self.txn
            .commit()
            .map_err(DatabaseError::from)
            .instrument(tracing::info_span!("db.save"))
            .boxed()
    }

    fn cancel(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        self.txn
            .rollback()
            .map_err(DatabaseError::from)
            .instrument(tracing::info_span!("db.cancel"))
            .boxed()
    }
}

impl RepositoryAccess for PgRepository {
    type Error = DatabaseError;

    fn github_link<'c>(
        &'c mut self,
    ) -> Box<dyn GithubLinkRepository<Error = Self::Error> + 'c> {
        Box::new(PgGithubLinkRepository::new(&mut self.txn))
    }

    fn bounty<'c>(&'c mut self) -> Box<dyn BountyRepository<Error = Self::Error> + 'c> {
        Box::new(PgBountyRepository::new(&mut self.txn))
    }
}

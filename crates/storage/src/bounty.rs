// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Repository to interact with [`BountyRecord`]s

use async_trait::async_trait;
use ghlink_data_model::{BountyRecord, Clock};
use rand_core::RngCore;
use ulid::Ulid;

use crate::repository_impl;

/// A [`BountyRepository`] helps interacting with [`BountyRecord`]s saved in
/// the storage backend
#[async_trait]
pub trait BountyRepository: Send + Sync {
    /// The error type returned by the repository
    type Error;

    /// Lookup a [`BountyRecord`] by its ID
    ///
    /// Returns `None` if no [`BountyRecord`] was found
    ///
    /// # Parameters
    ///
    /// * `id`: The ID of the [`BountyRecord`] to lookup
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn lookup(&mut self, id: Ulid) -> Result<Option<BountyRecord>, Self::Error>;

    /// Create a new [`BountyRecord`] for a GitHub username, not attributed to
    /// any user yet
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator to use
    /// * `clock`: The clock used to generate timestamps
    /// * `username`: The GitHub username the bounty is for
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        username: String,
    ) -> Result<BountyRecord, Self::Error>;

    /// List the [`BountyRecord`]s of a GitHub username, oldest first
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn list_for_username(&mut self, username: &str)
    -> Result<Vec<BountyRecord>, Self::Error>;

    /// Attribute every [`BountyRecord`] of a GitHub username to a user
    ///
    /// Returns the number of [`BountyRecord`]s updated
    ///
    /// # Parameters
    ///
    /// * `username`: The GitHub username
    /// * `github_user_id`: The internal identifier of the user who owns the
    ///   GitHub account
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn set_github_user_for_username(
        &mut self,
        username: &str,
        github_user_id: &str,
    ) -> Result<usize, Self::Error>;
}

repository_impl!(BountyRepository:
    async fn lookup(&mut self, id: Ulid) -> Result<Option<BountyRecord>, Self::Error>;

    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        username: String,
    ) -> Result<BountyRecord, Self::Error>;

    async fn list_for_username(&mut self, username: &str)
    -> Result<Vec<BountyRecord>, Self::Error>;

    async fn set_github_user_for_username(
        &mut self,
        username: &str,
        github_user_id: &str,
    ) -> Result<usize, Self::Error>;
);

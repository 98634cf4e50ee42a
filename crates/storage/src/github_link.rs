// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Repository to interact with [`LinkRequest`]s

use async_trait::async_trait;
use ghlink_data_model::{Clock, LinkProfile, LinkRequest};
use rand_core::RngCore;
use ulid::Ulid;

use crate::repository_impl;

/// A [`GithubLinkRepository`] helps interacting with [`LinkRequest`]s saved in
/// the storage backend
///
/// A user has at most one [`LinkRequest`], and a GitHub username is claimed
/// by at most one [`LinkRequest`].
#[async_trait]
pub trait GithubLinkRepository: Send + Sync {
    /// The error type returned by the repository
    type Error;

    /// Lookup a [`LinkRequest`] by its ID
    ///
    /// Returns `None` if no [`LinkRequest`] was found
    ///
    /// # Parameters
    ///
    /// * `id`: The ID of the [`LinkRequest`] to lookup
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn lookup(&mut self, id: Ulid) -> Result<Option<LinkRequest>, Self::Error>;

    /// Find the [`LinkRequest`] of a user, pending or not
    ///
    /// Returns `None` if the user never registered a GitHub username
    ///
    /// # Parameters
    ///
    /// * `user_id`: The internal identifier of the user
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn find_by_user_id(&mut self, user_id: &str)
    -> Result<Option<LinkRequest>, Self::Error>;

    /// Find the pending [`LinkRequest`] claiming a GitHub username
    ///
    /// Returns `None` if no pending [`LinkRequest`] claims this username,
    /// including when the username is claimed by an already confirmed link
    ///
    /// # Parameters
    ///
    /// * `username`: The GitHub username
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn find_pending_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<LinkRequest>, Self::Error>;

    /// Register a pending [`LinkRequest`] for a user
    ///
    /// If the user already has a pending [`LinkRequest`], its username is
    /// replaced. Otherwise a new pending [`LinkRequest`] is created.
    ///
    /// Returns the pending [`LinkRequest`]
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator to use
    /// * `clock`: The clock used to generate timestamps
    /// * `user_id`: The internal identifier of the user
    /// * `username`: The claimed GitHub username
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails, which
    /// includes the case where the username is already claimed by another
    /// user, and the case where the user already has a confirmed link
    async fn upsert_pending(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user_id: String,
        username: String,
    ) -> Result<LinkRequest, Self::Error>;

    /// Confirm a pending [`LinkRequest`], replacing its profile
    ///
    /// The update only happens if the link is still pending in the storage
    /// backend. Returns `None` if it was confirmed in the meantime, the
    /// confirmed [`LinkRequest`] otherwise.
    ///
    /// # Parameters
    ///
    /// * `clock`: The clock used to generate timestamps
    /// * `link`: The pending [`LinkRequest`] to confirm
    /// * `profile`: The profile to store on the link
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying repository fails
    async fn confirm(
        &mut self,
        clock: &dyn Clock,
        link: LinkRequest,
        profile: LinkProfile,
    ) -> Result<Option<LinkRequest>, Self::Error>;
}

repository_impl!(GithubLinkRepository:
    async fn lookup(&mut self, id: Ulid) -> Result<Option<LinkRequest>, Self::Error>;

    async fn find_by_user_id(&mut self, user_id: &str)
    -> Result<Option<LinkRequest>, Self::Error>;

    async fn find_pending_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<LinkRequest>, Self::Error>;

    async fn upsert_pending(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user_id: String,
        username: String,
    ) -> Result<LinkRequest, Self::Error>;

    async fn confirm(
        &mut self,
        clock: &dyn Clock,
        link: LinkRequest,
        profile: LinkProfile,
    ) -> Result<Option<LinkRequest>, Self::Error>;
);

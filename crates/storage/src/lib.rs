// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Storage traits for GitHub link requests and bounties
//!
//! Each kind of record has its own repository trait, in [`github_link`] and
//! [`bounty`]. A backend exposes all of them through [`RepositoryAccess`],
//! and handlers only ever see a [`BoxRepository`], which hides the backend
//! and its error type behind [`RepositoryError`].
//!
//! A [`BoxRepository`] is one unit of work. Its writes become visible to other
//! units at once on [`RepositoryTransaction::save`], and are dropped by
//! [`RepositoryTransaction::cancel`] or when the repository goes out of scope.
//! [`RepositoryFactory::create`] opens a new one.
//!
//! Two backends exist: `ghlink-storage-pg` on PostgreSQL and
//! `ghlink-storage-memory` for development and tests. Adding a method means
//! declaring it on the trait, listing it in the trait's `repository_impl!`
//! invocation so that boxed and error-mapped repositories forward it, then
//! implementing it in both backends.
//!
//! Conventions shared by every repository:
//!
//!   - lookups return `Ok(None)` when nothing matches, errors are reserved for
//!     the backend failing
//!   - timestamps come from a [`Clock`](ghlink_data_model::Clock) argument and
//!     IDs from an RNG argument, never from the ambient environment
//!   - methods take `&mut self`, so a repository runs one query at a time

#![deny(clippy::future_not_send, missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub(crate) mod repository;
mod utils;

pub mod bounty;
pub mod github_link;

pub use self::{
    repository::{
        BoxRepository, BoxRepositoryFactory, Repository, RepositoryAccess, RepositoryError,
        RepositoryFactory, RepositoryTransaction,
    },
    utils::MapErr,
};

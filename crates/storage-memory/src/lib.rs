// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! An in-memory implementation of the storage interface
//!
//! All the data lives in a single set of tables behind an async mutex. A
//! [`MemoryRepository`] holds that mutex for its whole lifetime and works on
//! a copy of the tables, which replaces the shared tables when the repository
//! is saved. Units of work are therefore fully serialized, which is fine for
//! tests and local development but not meant for production traffic.
//!
//! The unique constraints of the PostgreSQL schema are enforced, and reported
//! as [`MemoryError::UniqueViolation`].

#![deny(clippy::future_not_send, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use thiserror::Error;

mod bounty;
mod github_link;
mod repository;

#[cfg(test)]
mod tests;

pub use self::repository::{MemoryRepository, MemoryRepositoryFactory};

/// Errors returned by the in-memory repositories
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    /// A write would have broken a unique constraint
    #[error("duplicate value for unique column {table}.{column}")]
    UniqueViolation {
        /// The table which was written to
        table: &'static str,
        /// The column holding the duplicate value
        column: &'static str,
    },

    /// The user already has a confirmed link, which can't be replaced
    #[error("user {user_id} already has a confirmed GitHub link")]
    AlreadyLinked {
        /// The internal identifier of the user
        user_id: String,
    },
}

// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! An implementation of the storage interface for a PostgreSQL database
//!
//! This crate provides a [`PgRepository`], which implements the
//! [`ghlink_storage::Repository`] trait. Each [`PgRepository`] wraps a single
//! database transaction.
//!
//! # Queries
//!
//! Queries are either plain SQL strings, or built with [`sea_query`] when
//! they share a projection with other queries. The table and column
//! identifiers used by [`sea_query`] live in the `iden` module.
//!
//! Every repository method is instrumented with a span, and records the SQL
//! statement it runs with [`ExecuteExt::traced`].
//!
//! # Migrations
//!
//! Migrations live in the `migrations` directory and are embedded in the
//! binary through [`MIGRATOR`]. They are applied on startup by the server, or
//! explicitly with the `database migrate` command.

#![deny(clippy::future_not_send, missing_docs)]
#![allow(clippy::module_name_repetitions)]

use sqlx::migrate::Migrator;

pub mod bounty;
mod errors;
pub mod github_link;
pub(crate) mod iden;
pub(crate) mod repository;
pub(crate) mod tracing;


pub use self::{
    errors::{DatabaseError, DatabaseInconsistencyError},
    repository::{PgRepository, PgRepositoryFactory},
    tracing::ExecuteExt,
};

/// Embedded migrations, allowing them to run on startup
pub static MIGRATOR: Migrator = sqlx::migrate!();

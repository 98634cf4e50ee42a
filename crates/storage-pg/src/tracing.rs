// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use opentelemetry_semantic_conventions::attribute::DB_QUERY_TEXT;

/// Attach the SQL of a query to the current span, as `db.query.text`
///
/// The repository methods open their span with an empty `db.query.text` field
/// and call this on the query they build before running it.
pub trait ExecuteExt<'q, DB>: Sized {
    /// Record the SQL of this query on the current span
    #[must_use]
    fn traced(self) -> Self;
}

impl<'q, DB, T> ExecuteExt<'q, DB> for T
where
    T: sqlx::Execute<'q, DB>,
    DB: sqlx::Database,
{
    fn traced(self) -> Self {
        tracing::Span::current().record(DB_QUERY_TEXT, self.sql());
        self
    }
}

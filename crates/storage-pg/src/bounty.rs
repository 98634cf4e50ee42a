// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! A module containing the PostgreSQL implementation of the
//! [`BountyRepository`]

use async_trait::async_trait;
use ghlink_data_model::{BountyRecord, Clock};
use ghlink_storage::bounty::BountyRepository;
use rand::RngCore;
use sea_query::{Expr, Order, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use sqlx::PgConnection;
use ulid::Ulid;
use uuid::Uuid;

use crate::{DatabaseError, iden::Bounties, tracing::ExecuteExt};

/// An implementation of [`BountyRepository`] for a PostgreSQL connection
pub struct PgBountyRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgBountyRepository<'c> {
    /// Create a new [`PgBountyRepository`] from an active PostgreSQL
    /// connection
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct BountyLookup {
    bounty_id: Uuid,
    username: String,
    github_user_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<BountyLookup> for BountyRecord {
    fn from(value: BountyLookup) -> Self {
        Self {
            id: value.bounty_id.into(),
            username: value.username,
            github_user_id: value.github_user_id,
            created_at: value.created_at,
        }
    }
}

#[async_trait]
impl BountyRepository for PgBountyRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.bounty.lookup",
        skip_all,
        fields(
            db.query.text,
            bounty.id = %id,
        ),
        err,
    )]
    async fn lookup(&mut self, id: Ulid) -> Result<Option<BountyRecord>, Self::Error> {
        let res: Option<BountyLookup> = sqlx::query_as(
            r#"
                SELECT bounty_id
                     , username
                     , github_user_id
                     , created_at
                FROM bounties
                WHERE bounty_id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .traced()
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(res.map(BountyRecord::from))
    }

    #[tracing::instrument(
        name = "db.bounty.add",
        skip_all,
        fields(
            db.query.text,
            bounty.id,
            bounty.username = username,
        ),
        err,
    )]
    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        username: String,
    ) -> Result<BountyRecord, Self::Error> {
        let created_at = clock.now();
        let id = Ulid::from_datetime_with_source(created_at.into(), rng);
        tracing::Span::current().record("bounty.id", tracing::field::display(id));

        sqlx::query(
            r#"
                INSERT INTO bounties (bounty_id, username, created_at)
                VALUES ($1, $2, $3)
            "#,
        )
        .bind(Uuid::from(id))
        .bind(&username)
        .bind(created_at)
        .traced()
        .execute(&mut *self.conn)
        .await?;

        Ok(BountyRecord {
            id,
            username,
            github_user_id: None,
            created_at,
        })
    }

    #[tracing::instrument(
        name = "db.bounty.list_for_username",
        skip_all,
        fields(
            db.query.text,
            bounty.username = username,
        ),
        err,
    )]
    async fn list_for_username(
        &mut self,
        username: &str,
    ) -> Result<Vec<BountyRecord>, Self::Error> {
        let (sql, arguments) = Query::select()
            .columns([
                (Bounties::Table, Bounties::BountyId),
                (Bounties::Table, Bounties::Username),
                (Bounties::Table, Bounties::GithubUserId),
                (Bounties::Table, Bounties::CreatedAt),
            ])
            .from(Bounties::Table)
            .and_where(Expr::col((Bounties::Table, Bounties::Username)).eq(username))
            .order_by((Bounties::Table, Bounties::BountyId), Order::Asc)
            .build_sqlx(PostgresQueryBuilder);

        let res: Vec<BountyLookup> = sqlx::query_as_with(&sql, arguments)
            .traced()
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(res.into_iter().map(BountyRecord::from).collect())
    }

    #[tracing::instrument(
        name = "db.bounty.set_github_user_for_username",
        skip_all,
        fields(
            db.query.text,
            db.response.returned_rows,
            bounty.username = username,
            bounty.github_user_id = github_user_id,
        ),
        err,
    )]
    async fn set_github_user_for_username(
        &mut self,
        username: &str,
        github_user_id: &str,
    ) -> Result<usize, Self::Error> {
        let (sql, arguments) = Query::update()
            .table(Bounties::Table)
            .value(Bounties::GithubUserId, github_user_id)
            .and_where(Expr::col((Bounties::Table, Bounties::Username)).eq(username))
            .build_sqlx(PostgresQueryBuilder);

        let res = sqlx::query_with(&sql, arguments)
            .traced()
            .execute(&mut *self.conn)
            .await?;

        let affected = res.rows_affected();
        tracing::Span::current().record("db.response.returned_rows", affected);

        affected
            .try_into()
            .map_err(DatabaseError::to_invalid_operation)
    }
}

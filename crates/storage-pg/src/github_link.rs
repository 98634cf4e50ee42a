// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! A module containing the PostgreSQL implementation of the
//! [`GithubLinkRepository`]

use async_trait::async_trait;
use ghlink_data_model::{Clock, LinkProfile, LinkRequest, LinkState};
use ghlink_storage::github_link::GithubLinkRepository;
use rand::RngCore;
use sea_query::{Expr, PostgresQueryBuilder, Query, SelectStatement};
use sea_query_binder::SqlxBinder;
use sqlx::PgConnection;
use ulid::Ulid;
use uuid::Uuid;

use crate::{DatabaseError, DatabaseInconsistencyError, iden::GithubLinks, tracing::ExecuteExt};

/// An implementation of [`GithubLinkRepository`] for a PostgreSQL connection
pub struct PgGithubLinkRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgGithubLinkRepository<'c> {
    /// Create a new [`PgGithubLinkRepository`] from an active PostgreSQL
    /// connection
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

mod priv_ {
    // The enum_def macro generates a public enum, which we don't want, because it
    // triggers the missing docs warning
    #![allow(missing_docs)]

    use chrono::{DateTime, Utc};
    use sea_query::enum_def;
    use uuid::Uuid;

    #[derive(Debug, Clone, sqlx::FromRow)]
    #[enum_def]
    pub(super) struct LinkLookup {
        pub(super) github_link_id: Uuid,
        pub(super) user_id: String,
        pub(super) username: String,
        pub(super) is_linked: bool,
        pub(super) email: Option<String>,
        pub(super) public_name: Option<String>,
        pub(super) image: Option<String>,
        pub(super) created_at: DateTime<Utc>,
        pub(super) linked_at: Option<DateTime<Utc>>,
    }
}

use priv_::{LinkLookup, LinkLookupIden};

impl TryFrom<LinkLookup> for LinkRequest {
    type Error = DatabaseInconsistencyError;

    fn try_from(value: LinkLookup) -> Result<Self, Self::Error> {
        let id = value.github_link_id.into();
        let state = match (value.is_linked, value.linked_at) {
            (false, None) => LinkState::Pending,
            (true, Some(linked_at)) => LinkState::Linked { linked_at },
            _ => {
                return Err(DatabaseInconsistencyError::on("github_links")
                    .column("linked_at")
                    .row(id));
            }
        };

        Ok(LinkRequest {
            id,
            user_id: value.user_id,
            username: value.username,
            state,
            profile: LinkProfile {
                email: value.email,
                public_name: value.public_name,
                image: value.image,
            },
            created_at: value.created_at,
        })
    }
}

/// The projection shared by all the queries returning a [`LinkRequest`]
fn select_links() -> SelectStatement {
    Query::select()
        .expr_as(
            Expr::col((GithubLinks::Table, GithubLinks::GithubLinkId)),
            LinkLookupIden::GithubLinkId,
        )
        .expr_as(
            Expr::col((GithubLinks::Table, GithubLinks::UserId)),
            LinkLookupIden::UserId,
        )
        .expr_as(
            Expr::col((GithubLinks::Table, GithubLinks::Username)),
            LinkLookupIden::Username,
        )
        .expr_as(
            Expr::col((GithubLinks::Table, GithubLinks::IsLinked)),
            LinkLookupIden::IsLinked,
        )
        .expr_as(
            Expr::col((GithubLinks::Table, GithubLinks::Email)),
            LinkLookupIden::Email,
        )
        .expr_as(
            Expr::col((GithubLinks::Table, GithubLinks::PublicName)),
            LinkLookupIden::PublicName,
        )
        .expr_as(
            Expr::col((GithubLinks::Table, GithubLinks::Image)),
            LinkLookupIden::Image,
        )
        .expr_as(
            Expr::col((GithubLinks::Table, GithubLinks::CreatedAt)),
            LinkLookupIden::CreatedAt,
        )
        .expr_as(
            Expr::col((GithubLinks::Table, GithubLinks::LinkedAt)),
            LinkLookupIden::LinkedAt,
        )
        .from(GithubLinks::Table)
        .to_owned()
}

#[async_trait]
impl GithubLinkRepository for PgGithubLinkRepository<'_> {
    type Error = DatabaseError;

    #[tracing::instrument(
        name = "db.github_link.lookup",
        skip_all,
        fields(
            db.query.text,
            github_link.id = %id,
        ),
        err,
    )]
    async fn lookup(&mut self, id: Ulid) -> Result<Option<LinkRequest>, Self::Error> {
        let (sql, arguments) = select_links()
            .and_where(Expr::col((GithubLinks::Table, GithubLinks::GithubLinkId)).eq(Uuid::from(id)))
            .build_sqlx(PostgresQueryBuilder);

        let res: Option<LinkLookup> = sqlx::query_as_with(&sql, arguments)
            .traced()
            .fetch_optional(&mut *self.conn)
            .await?;

        let Some(res) = res else { return Ok(None) };

        Ok(Some(res.try_into()?))
    }

    #[tracing::instrument(
        name = "db.github_link.find_by_user_id",
        skip_all,
        fields(
            db.query.text,
            github_link.user_id = user_id,
        ),
        err,
    )]
    async fn find_by_user_id(
        &mut self,
        user_id: &str,
    ) -> Result<Option<LinkRequest>, Self::Error> {
        let (sql, arguments) = select_links()
            .and_where(Expr::col((GithubLinks::Table, GithubLinks::UserId)).eq(user_id))
            .build_sqlx(PostgresQueryBuilder);

        let res: Option<LinkLookup> = sqlx::query_as_with(&sql, arguments)
            .traced()
            .fetch_optional(&mut *self.conn)
            .await?;

        let Some(res) = res else { return Ok(None) };

        Ok(Some(res.try_into()?))
    }

    #[tracing::instrument(
        name = "db.github_link.find_pending_by_username",
        skip_all,
        fields(
            db.query.text,
            github_link.username = username,
        ),
        err,
    )]
    async fn find_pending_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<LinkRequest>, Self::Error> {
        let (sql, arguments) = select_links()
            .and_where(Expr::col((GithubLinks::Table, GithubLinks::Username)).eq(username))
            .and_where(Expr::col((GithubLinks::Table, GithubLinks::IsLinked)).eq(false))
            .build_sqlx(PostgresQueryBuilder);

        let res: Option<LinkLookup> = sqlx::query_as_with(&sql, arguments)
            .traced()
            .fetch_optional(&mut *self.conn)
            .await?;

        let Some(res) = res else { return Ok(None) };

        Ok(Some(res.try_into()?))
    }

    #[tracing::instrument(
        name = "db.github_link.upsert_pending",
        skip_all,
        fields(
            db.query.text,
            github_link.id,
            github_link.user_id = user_id,
            github_link.username = username,
        ),
        err,
    )]
    async fn upsert_pending(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        user_id: String,
        username: String,
    ) -> Result<LinkRequest, Self::Error> {
        let created_at = clock.now();
        let id = Ulid::from_datetime_with_source(created_at.into(), rng);

        // A confirmed link for this user makes the conflict clause skip the
        // update, in which case no row is returned
        let res: Option<LinkLookup> = sqlx::query_as(
            r#"
                INSERT INTO github_links
                    (github_link_id, user_id, username, is_linked, created_at)
                VALUES ($1, $2, $3, FALSE, $4)
                ON CONFLICT (user_id) DO UPDATE
                    SET username = EXCLUDED.username
                    WHERE github_links.is_linked = FALSE
                RETURNING github_link_id
                        , user_id
                        , username
                        , is_linked
                        , email
                        , public_name
                        , image
                        , created_at
                        , linked_at
            "#,
        )
        .bind(Uuid::from(id))
        .bind(&user_id)
        .bind(&username)
        .bind(created_at)
        .traced()
        .fetch_optional(&mut *self.conn)
        .await?;

        let Some(res) = res else {
            return Err(DatabaseError::RowsAffected {
                expected: 1,
                actual: 0,
            });
        };

        let link = LinkRequest::try_from(res)?;
        tracing::Span::current().record("github_link.id", tracing::field::display(link.id));

        Ok(link)
    }

    #[tracing::instrument(
        name = "db.github_link.confirm",
        skip_all,
        fields(
            db.query.text,
            github_link.id = %link.id,
            github_link.username = link.username,
        ),
        err,
    )]
    async fn confirm(
        &mut self,
        clock: &dyn Clock,
        link: LinkRequest,
        profile: LinkProfile,
    ) -> Result<Option<LinkRequest>, Self::Error> {
        let linked_at = clock.now();
        let res = sqlx::query(
            r#"
                UPDATE github_links
                SET is_linked = TRUE
                  , linked_at = $2
                  , email = $3
                  , public_name = $4
                  , image = $5
                WHERE github_link_id = $1
                  AND is_linked = FALSE
            "#,
        )
        .bind(Uuid::from(link.id))
        .bind(linked_at)
        .bind(profile.email.as_deref())
        .bind(profile.public_name.as_deref())
        .bind(profile.image.as_deref())
        .traced()
        .execute(&mut *self.conn)
        .await?;

        if res.rows_affected() == 0 {
            return Ok(None);
        }

        DatabaseError::ensure_affected_rows(&res, 1)?;

        let link = link
            .confirm(linked_at, profile)
            .map_err(DatabaseError::to_invalid_operation)?;

        Ok(Some(link))
    }
}

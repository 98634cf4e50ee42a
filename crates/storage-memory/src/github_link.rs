// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use ghlink_data_model::{Clock, LinkProfile, LinkRequest, LinkState};
use ghlink_storage::github_link::GithubLinkRepository;
use rand::RngCore;
use ulid::Ulid;

use crate::{MemoryError, repository::Tables};

pub(crate) struct MemoryGithubLinkRepository<'c> {
    tables: &'c mut Tables,
}

impl<'c> MemoryGithubLinkRepository<'c> {
    pub(crate) fn new(tables: &'c mut Tables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl GithubLinkRepository for MemoryGithubLinkRepository<'_> {
    type Error = MemoryError;

    async fn lookup(&mut self, id: Ulid) -> Result<Option<LinkRequest>, Self::Error> {
        Ok(self.tables.github_links.get(&id).cloned())
    }

    async fn find_by_user_id(
        &mut self,
        user_id: &str,
    ) -> Result<Option<LinkRequest>, Self::Error> {
        Ok(self
            .tables
            .github_links
            .values()
            .find(|link| link.user_id == user_id)
            .cloned())
    }

    async fn find_pending_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<LinkRequest>, Self::Error> {
        Ok(self
            .tables
            .github_links
            .values()
            .find(|link| link.username == username && link.is_pending())
            .cloned())
    }

    #[tracing::instrument(
        name = "memory.github_link.upsert_pending",
        skip_all,
        fields(
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
        let claimed_by_other = self
            .tables
            .github_links
            .values()
            .any(|link| link.username == username && link.user_id != user_id);
        if claimed_by_other {
            return Err(MemoryError::UniqueViolation {
                table: "github_links",
                column: "username",
            });
        }

        let existing = self
            .tables
            .github_links
            .values()
            .find(|link| link.user_id == user_id)
            .cloned();

        let link = match existing {
            Some(link) if link.is_linked() => return Err(MemoryError::AlreadyLinked { user_id }),
            Some(link) => LinkRequest { username, ..link },
            None => {
                let created_at = clock.now();
                LinkRequest {
                    id: Ulid::from_datetime_with_source(created_at.into(), rng),
                    user_id,
                    username,
                    state: LinkState::Pending,
                    profile: LinkProfile::default(),
                    created_at,
                }
            }
        };

        self.tables.github_links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn confirm(
        &mut self,
        clock: &dyn Clock,
        link: LinkRequest,
        profile: LinkProfile,
    ) -> Result<Option<LinkRequest>, Self::Error> {
        let Some(stored) = self.tables.github_links.get_mut(&link.id) else {
            return Ok(None);
        };

        // Confirming from the stored copy makes this a compare-and-swap on the
        // pending state
        let Ok(confirmed) = stored.clone().confirm(clock.now(), profile) else {
            return Ok(None);
        };

        *stored = confirmed.clone();
        Ok(Some(confirmed))
    }
}

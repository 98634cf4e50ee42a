// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use ghlink_data_model::{BountyRecord, Clock};
use ghlink_storage::bounty::BountyRepository;
use rand::RngCore;
use ulid::Ulid;

use crate::{MemoryError, repository::Tables};

pub(crate) struct MemoryBountyRepository<'c> {
    tables: &'c mut Tables,
}

impl<'c> MemoryBountyRepository<'c> {
    pub(crate) fn new(tables: &'c mut Tables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BountyRepository for MemoryBountyRepository<'_> {
    type Error = MemoryError;

    async fn lookup(&mut self, id: Ulid) -> Result<Option<BountyRecord>, Self::Error> {
        Ok(self.tables.bounties.get(&id).cloned())
    }

    async fn add(
        &mut self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
        username: String,
    ) -> Result<BountyRecord, Self::Error> {
        let created_at = clock.now();
        let bounty = BountyRecord {
            id: Ulid::from_datetime_with_source(created_at.into(), rng),
            username,
            github_user_id: None,
            created_at,
        };

        self.tables.bounties.insert(bounty.id, bounty.clone());
        Ok(bounty)
    }

    async fn list_for_username(
        &mut self,
        username: &str,
    ) -> Result<Vec<BountyRecord>, Self::Error> {
        Ok(self
            .tables
            .bounties
            .values()
            .filter(|bounty| bounty.username == username)
            .cloned()
            .collect())
    }

    #[tracing::instrument(
        name = "memory.bounty.set_github_user_for_username",
        skip_all,
        fields(bounty.username = username),
        err,
    )]
    async fn set_github_user_for_username(
        &mut self,
        username: &str,
        github_user_id: &str,
    ) -> Result<usize, Self::Error> {
        let mut updated = 0;
        for bounty in self
            .tables
            .bounties
            .values_mut()
            .filter(|bounty| bounty.username == username)
        {
            bounty.github_user_id = Some(github_user_id.to_owned());
            updated += 1;
        }

        Ok(updated)
    }
}

// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Table and column identifiers used by [`sea_query`]

#[derive(sea_query::Iden)]
pub enum GithubLinks {
    Table,
    GithubLinkId,
    UserId,
    Username,
    IsLinked,
    Email,
    PublicName,
    Image,
    CreatedAt,
    LinkedAt,
}

#[derive(sea_query::Iden)]
pub enum Bounties {
    Table,
    BountyId,
    Username,
    GithubUserId,
    CreatedAt,
}

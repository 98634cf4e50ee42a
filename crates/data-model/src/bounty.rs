// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ulid::Ulid;

/// A bounty, attached to a GitHub username
///
/// The `github_user_id` is only known once the GitHub account behind
/// `username` was linked to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BountyRecord {
    pub id: Ulid,
    pub username: String,
    pub github_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BountyRecord {
    /// Returns `true` if the bounty was attributed to a linked user.
    #[must_use]
    pub fn is_attributed(&self) -> bool {
        self.github_user_id.is_some()
    }
}

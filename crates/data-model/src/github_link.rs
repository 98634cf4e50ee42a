// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use ulid::Ulid;

use crate::InvalidTransitionError;

/// The state of a [`LinkRequest`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkState {
    /// The link was registered but not confirmed yet
    #[default]
    Pending,

    /// The link was confirmed
    Linked {
        /// When the link was confirmed
        linked_at: DateTime<Utc>,
    },
}

impl LinkState {
    /// Returns `true` if the link is still waiting for a confirmation.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` if the link was confirmed.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Linked { .. })
    }

    /// Returns the time the link was confirmed, if it was.
    #[must_use]
    pub fn linked_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending => None,
            Self::Linked { linked_at } => Some(*linked_at),
        }
    }

    /// Transitions the state from [`LinkState::Pending`] to
    /// [`LinkState::Linked`].
    ///
    /// # Errors
    ///
    /// Returns an error if the link was already confirmed.
    pub fn confirm(self, linked_at: DateTime<Utc>) -> Result<Self, InvalidTransitionError> {
        match self {
            Self::Pending => Ok(Self::Linked { linked_at }),
            Self::Linked { .. } => Err(InvalidTransitionError),
        }
    }
}

/// Public profile information supplied when confirming a link.
///
/// All the fields are replaced at once when a link is confirmed: a missing
/// value clears whatever was stored before.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkProfile {
    pub email: Option<String>,
    pub public_name: Option<String>,
    pub image: Option<String>,
}

/// A claim that a user owns a GitHub account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRequest {
    pub id: Ulid,
    pub user_id: String,
    pub username: String,
    pub state: LinkState,
    pub profile: LinkProfile,
    pub created_at: DateTime<Utc>,
}

impl std::ops::Deref for LinkRequest {
    type Target = LinkState;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl LinkRequest {
    /// Mark the link as confirmed, replacing the stored profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the link was already confirmed.
    pub fn confirm(
        mut self,
        linked_at: DateTime<Utc>,
        profile: LinkProfile,
    ) -> Result<Self, InvalidTransitionError> {
        self.state = self.state.confirm(linked_at)?;
        self.profile = profile;
        Ok(self)
    }

    #[doc(hidden)]
    #[must_use]
    pub fn samples(now: DateTime<Utc>, rng: &mut impl Rng) -> Vec<Self> {
        vec![
            Self {
                id: Ulid::from_datetime_with_source(now.into(), rng),
                user_id: "u1".to_owned(),
                username: "octocat".to_owned(),
                state: LinkState::Pending,
                profile: LinkProfile::default(),
                created_at: now,
            },
            Self {
                id: Ulid::from_datetime_with_source(now.into(), rng),
                user_id: "u2".to_owned(),
                username: "hubot".to_owned(),
                state: LinkState::Linked { linked_at: now },
                profile: LinkProfile {
                    email: Some("hubot@example.com".to_owned()),
                    public_name: Some("Hubot".to_owned()),
                    image: None,
                },
                created_at: now,
            },
        ]
    }
}

/// Error returned when a user-supplied identifier is not acceptable
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is empty")]
    Empty { field: &'static str },
}

fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }

    Ok(())
}

/// Check that a GitHub username can be stored
///
/// # Errors
///
/// Returns an error if the username is empty or only made of whitespace
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    validate_identifier("username", username)
}

/// Check that an internal user identifier can be stored
///
/// # Errors
///
/// Returns an error if the identifier is empty or only made of whitespace
pub fn validate_user_id(user_id: &str) -> Result<(), ValidationError> {
    validate_identifier("userId", user_id)
}

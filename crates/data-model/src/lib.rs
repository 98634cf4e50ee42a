// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![allow(clippy::module_name_repetitions)]

use thiserror::Error;

pub(crate) mod bounty;
pub mod clock;
pub(crate) mod github_link;

/// Error when an invalid state transition is attempted.
#[derive(Debug, Error)]
#[error("invalid state transition")]
pub struct InvalidTransitionError;

pub use ulid::Ulid;

/// The random number generator handed to operations creating records
pub type BoxRng = Box<dyn rand_chacha::rand_core::CryptoRngCore + Send>;

pub use self::{
    bounty::BountyRecord,
    clock::{BoxClock, Clock, SystemClock},
    github_link::{
        LinkProfile, LinkRequest, LinkState, ValidationError, validate_user_id, validate_username,
    },
};

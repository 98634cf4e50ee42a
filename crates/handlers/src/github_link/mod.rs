// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Two-step linking of a user account to a GitHub username
//!
//! A `POST` records a pending claim of a GitHub username for a user. A `PUT`
//! then confirms the pending claim for that username, and attributes every
//! bounty already filed against the username to the user.

pub mod confirm;
pub mod register;

#[cfg(test)]
mod tests;

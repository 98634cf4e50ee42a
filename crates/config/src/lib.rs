// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Configuration of the GitHub link service
//!
//! The configuration is layered with [`figment`]: YAML files first, then
//! `GHLINK_`-prefixed environment variables. Each section knows where it lives
//! and how to validate itself through [`ConfigurationSection`].

#![deny(missing_docs, rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]
// derive(JsonSchema) uses &str.to_string()
#![allow(clippy::str_to_string)]

pub(crate) mod schema;
mod sections;
pub(crate) mod util;

pub use self::{
    sections::*,
    util::{ConfigurationSection, ConfigurationSectionExt},
};

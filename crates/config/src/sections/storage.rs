// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigurationSection;

/// Where link requests and bounties are stored
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// PostgreSQL, configured by the `database` section
    #[default]
    Postgres,

    /// In-process storage, lost on restart. Only meant for local development
    Memory,
}

/// Configuration related to the storage backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StorageConfig {
    /// Which storage backend to use
    #[serde(default)]
    pub backend: StorageBackend,
}

impl StorageConfig {
    /// Returns true if all fields are at their default values
    pub(crate) fn is_default(&self) -> bool {
        self.backend == StorageBackend::default()
    }
}

impl ConfigurationSection for StorageConfig {
    const PATH: Option<&'static str> = Some("storage");
}

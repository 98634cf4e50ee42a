// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod database;
mod http;
mod session;
mod storage;
mod telemetry;

pub use self::{
    database::DatabaseConfig,
    http::{
        BindConfig as HttpBindConfig, HttpConfig, ListenerConfig as HttpListenerConfig,
        Resource as HttpResource,
    },
    session::{SessionConfig, SessionKind, StaticToken},
    storage::{StorageBackend, StorageConfig},
    telemetry::{Propagator, SentryConfig, TelemetryConfig, TracingConfig, TracingExporterKind},
};
use crate::util::ConfigurationSection;

/// Application configuration root
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RootConfig {
    /// Configuration of the HTTP server
    #[serde(default)]
    pub http: HttpConfig,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Configuration related to the authentication of callers
    #[serde(default)]
    pub session: SessionConfig,

    /// Configuration related to the storage backend
    #[serde(default, skip_serializing_if = "StorageConfig::is_default")]
    pub storage: StorageConfig,

    /// Configuration related to sending monitoring data
    #[serde(default, skip_serializing_if = "TelemetryConfig::is_default")]
    pub telemetry: TelemetryConfig,
}

impl ConfigurationSection for RootConfig {
    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.http.validate(figment)?;
        self.database.validate(figment)?;
        self.session.validate(figment)?;
        self.storage.validate(figment)?;
        self.telemetry.validate(figment)?;

        Ok(())
    }
}

impl RootConfig {
    /// Generate a new configuration with the default values
    #[must_use]
    pub fn generate() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Configuration used in tests
    #[must_use]
    pub fn test() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            session: SessionConfig {
                kind: SessionKind::Static,
                ..SessionConfig::default()
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
            },
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Partial configuration actually used by the server
#[allow(missing_docs)]
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl ConfigurationSection for AppConfig {
    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.http.validate(figment)?;
        self.database.validate(figment)?;
        self.session.validate(figment)?;
        self.storage.validate(figment)?;

        Ok(())
    }
}

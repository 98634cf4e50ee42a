// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};
use serde_with::{DurationSeconds, serde_as, skip_serializing_none};
use url::Url;

use super::ConfigurationSection;

fn default_endpoint() -> Url {
    "http://localhost:3000/api/auth/session".parse().unwrap()
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_cookie_name() -> String {
    "next-auth.session-token".to_owned()
}

/// How callers are authenticated
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Ask the session provider about the credentials carried by each request
    #[default]
    Remote,

    /// Accept a fixed list of tokens. Only meant for local development
    Static,
}

/// A session token accepted by the `static` session kind
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StaticToken {
    /// The token, sent either as a bearer token or in the session cookie
    pub token: String,

    /// The internal ID of the user this token authenticates
    pub user_id: String,

    /// The display name of the user
    pub name: Option<String>,

    /// The email address of the user
    pub email: Option<String>,
}

/// Configuration related to the authentication of callers
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionConfig {
    /// How callers are authenticated
    #[serde(default)]
    pub kind: SessionKind,

    /// The session endpoint of the session provider
    #[serde(default = "default_endpoint")]
    pub endpoint: Url,

    /// How long to wait for the session provider to answer, in seconds
    #[schemars(with = "u64")]
    #[serde(default = "default_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,

    /// Name of the cookie holding the session token
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Tokens accepted by the `static` session kind
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_tokens: Vec<StaticToken>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            kind: SessionKind::default(),
            endpoint: default_endpoint(),
            timeout: default_timeout(),
            cookie_name: default_cookie_name(),
            static_tokens: Vec::new(),
        }
    }
}

impl ConfigurationSection for SessionConfig {
    const PATH: Option<&'static str> = Some("session");

    fn validate(
        &self,
        _figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        if self.kind == SessionKind::Remote && !self.static_tokens.is_empty() {
            return Err(figment::error::Error::custom(
                "static_tokens are only used with the `static` session kind",
            )
            .with_path("static_tokens")
            .into());
        }

        if self.timeout.is_zero() {
            return Err(figment::error::Error::custom("timeout must not be zero")
                .with_path("timeout")
                .into());
        }

        Ok(())
    }
}

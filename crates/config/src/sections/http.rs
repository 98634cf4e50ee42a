// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use figment::error::Error as FigmentError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};

use super::ConfigurationSection;

fn http_address_example_1() -> &'static str {
    "[::1]:8080"
}
fn http_address_example_2() -> &'static str {
    "0.0.0.0:8080"
}

fn http_listener_prefix_example() -> &'static str {
    "/ghlink"
}

/// Configuration of a single address to bind to
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
#[serde(untagged)]
pub enum BindConfig {
    /// Listen on the specified host and port
    Listen {
        /// Host on which to listen.
        ///
        /// Defaults to listening on all addresses
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[schemars(with = "Option<crate::schema::Hostname>")]
        host: Option<String>,

        /// Port on which to listen.
        port: u16,
    },

    /// Listen on the specified address
    Address {
        /// Host and port on which to listen
        #[schemars(
            example = "http_address_example_1",
            example = "http_address_example_2"
        )]
        address: String,
    },
}

/// HTTP resources to mount
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum Resource {
    /// Healthcheck endpoint (`/health`)
    Health,

    /// GitHub account linking API (`/api/github`)
    Link,
}

/// Configuration of a listener
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
pub struct ListenerConfig {
    /// A unique name for this listener which will be shown in traces and in
    /// metrics labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// List of resources to mount
    pub resources: Vec<Resource>,

    /// HTTP prefix to mount the resources on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(example = "http_listener_prefix_example")]
    pub prefix: Option<String>,

    /// List of sockets to bind
    pub binds: Vec<BindConfig>,
}

/// Configuration related to the web server
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone)]
pub struct HttpConfig {
    /// List of listeners to run
    #[serde(default)]
    pub listeners: Vec<ListenerConfig>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listeners: vec![
                ListenerConfig {
                    name: Some("web".to_owned()),
                    resources: vec![Resource::Link],
                    prefix: None,
                    binds: vec![BindConfig::Address {
                        address: "[::]:8080".into(),
                    }],
                },
                ListenerConfig {
                    name: Some("internal".to_owned()),
                    resources: vec![Resource::Health],
                    prefix: None,
                    binds: vec![BindConfig::Listen {
                        host: Some("localhost".to_owned()),
                        port: 8081,
                    }],
                },
            ],
        }
    }
}

impl ConfigurationSection for HttpConfig {
    const PATH: Option<&'static str> = Some("http");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        for (index, listener) in self.listeners.iter().enumerate() {
            let annotate = |mut error: FigmentError| {
                error.metadata = figment.find_metadata("http.listeners").cloned();
                error.profile = Some(figment::Profile::Default);
                error.path = vec!["http".to_owned(), "listeners".to_owned(), index.to_string()];
                error
            };

            if listener.resources.is_empty() {
                return Err(annotate(FigmentError::custom("listener has no resources")).into());
            }

            if listener.binds.is_empty() {
                return Err(annotate(FigmentError::custom(
                    "listeners needs at least one bind",
                ))
                .into());
            }

            if let Some(prefix) = &listener.prefix
                && !prefix.starts_with('/')
            {
                return Err(annotate(FigmentError::custom("prefix must start with a slash")).into());
            }
        }

        Ok(())
    }
}

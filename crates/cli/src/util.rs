// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use ghlink_config::{DatabaseConfig, SessionConfig, SessionKind, StaticToken};
use ghlink_session::{Authenticator, CallerSession, MockAuthenticator, SessionUser};
use ghlink_session_remote::RemoteSessionAuthenticator;
use sqlx::{
    ConnectOptions, PgConnection, PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use tracing::log::LevelFilter;

fn static_session(token: &StaticToken) -> CallerSession {
    CallerSession::for_user(SessionUser {
        id: Some(token.user_id.clone()),
        name: token.name.clone(),
        email: token.email.clone(),
        image: None,
    })
}

/// Build the [`Authenticator`] described by the session configuration
pub fn authenticator_from_config(config: &SessionConfig) -> Arc<dyn Authenticator> {
    match config.kind {
        SessionKind::Remote => {
            tracing::info!(endpoint = %config.endpoint, "Using the remote session provider");
            Arc::new(RemoteSessionAuthenticator::new(
                config.endpoint.clone(),
                config.timeout,
                ghlink_http::reqwest_client(),
            ))
        }

        SessionKind::Static => {
            tracing::warn!(
                tokens = config.static_tokens.len(),
                "Using static session tokens, this should only be used for local development"
            );

            let authenticator = config.static_tokens.iter().fold(
                MockAuthenticator::new(config.cookie_name.clone()),
                |authenticator, token| {
                    authenticator.with_session(token.token.clone(), static_session(token))
                },
            );

            Arc::new(authenticator)
        }
    }
}

fn database_connect_options_from_config(
    config: &DatabaseConfig,
) -> Result<PgConnectOptions, anyhow::Error> {
    let options = if let Some(uri) = config.uri.as_deref() {
        uri.parse()
            .context("could not parse database connection string")?
    } else {
        let mut opts = PgConnectOptions::new().application_name("ghlink");

        if let Some(host) = config.host.as_deref() {
            opts = opts.host(host);
        }

        if let Some(port) = config.port {
            opts = opts.port(port);
        }

        if let Some(socket) = config.socket.as_deref() {
            opts = opts.socket(socket);
        }

        if let Some(username) = config.username.as_deref() {
            opts = opts.username(username);
        }

        if let Some(password) = config.password.as_deref() {
            opts = opts.password(password);
        }

        if let Some(database) = config.database.as_deref() {
            opts = opts.database(database);
        }

        opts
    };

    Ok(options
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(100)))
}

/// Create a database connection pool from the configuration
#[tracing::instrument(name = "db.connect", skip_all)]
pub async fn database_pool_from_config(config: &DatabaseConfig) -> Result<PgPool, anyhow::Error> {
    let options = database_connect_options_from_config(config)?;
    PgPoolOptions::new()
        .max_connections(config.max_connections.into())
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect_with(options)
        .await
        .context("could not connect to the database")
}

/// Create a single database connection from the configuration
#[tracing::instrument(name = "db.connect", skip_all)]
pub async fn database_connection_from_config(
    config: &DatabaseConfig,
) -> Result<PgConnection, anyhow::Error> {
    database_connect_options_from_config(config)?
        .connect()
        .await
        .context("could not connect to the database")
}

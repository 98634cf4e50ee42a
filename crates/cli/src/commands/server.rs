// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{collections::BTreeSet, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use figment::Figment;
use ghlink_config::{AppConfig, ConfigurationSection, StorageBackend};
use ghlink_storage::BoxRepositoryFactory;
use ghlink_storage_memory::MemoryRepositoryFactory;
use ghlink_storage_pg::{MIGRATOR, PgRepositoryFactory};
use sqlx::{PgPool, migrate::Migrate};
use tracing::{Instrument, info, info_span, warn};

use crate::{app_state::AppState, lifecycle::LifecycleManager, util};

#[derive(Parser, Debug, Default)]
pub(super) struct Options {
    /// Do not apply pending database migrations on start
    #[arg(long)]
    no_migrate: bool,
}

impl Options {
    async fn migrate(&self, pool: &PgPool) -> anyhow::Result<()> {
        if self.no_migrate {
            let mut conn = pool.acquire().await?;
            let applied = conn.list_applied_migrations().await?;
            let applied: BTreeSet<_> = applied.into_iter().map(|m| m.version).collect();
            let has_missing_migrations = MIGRATOR.iter().any(|m| !applied.contains(&m.version));
            if has_missing_migrations {
                // Refuse to start if there are pending migrations
                anyhow::bail!(
                    "The server is running with `--no-migrate` but there are pending migrations. Please run them first with `ghlink database migrate`, or omit the `--no-migrate` flag to apply them automatically on startup."
                );
            }
        } else {
            info!("Running pending database migrations");
            MIGRATOR
                .run(pool)
                .instrument(info_span!("db.migrate"))
                .await
                .context("could not run database migrations")?;
        }

        Ok(())
    }

    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let span = info_span!("cli.run.init").entered();
        let shutdown = LifecycleManager::new()?;
        let config = AppConfig::extract(figment).map_err(anyhow::Error::from_boxed)?;

        info!(version = crate::VERSION, "Starting up");

        let repository_factory: BoxRepositoryFactory = match config.storage.backend {
            StorageBackend::Postgres => {
                info!("Connecting to the database");
                let pool = util::database_pool_from_config(&config.database).await?;
                self.migrate(&pool).await?;
                PgRepositoryFactory::new(pool).boxed()
            }

            StorageBackend::Memory => {
                warn!("Using in-memory storage, everything will be lost on shutdown");
                MemoryRepositoryFactory::new().boxed()
            }
        };

        let authenticator = util::authenticator_from_config(&config.session);

        let state = AppState {
            repository_factory,
            authenticator,
        };

        for listener in config.http.listeners {
            let listeners = crate::server::build_listeners(&listener.binds)?;

            let router = crate::server::build_router(
                state.clone(),
                &listener.resources,
                listener.prefix.as_deref(),
                listener.name.as_deref(),
            );

            let prefix = listener.prefix.unwrap_or_default();
            let addresses: Vec<String> = listeners
                .iter()
                .map(|l| {
                    if let Ok(addr) = l.local_addr() {
                        format!("http://{addr}{prefix}")
                    } else {
                        warn!("Could not get local address for listener, something might be wrong!");
                        format!("http://???{prefix}")
                    }
                })
                .collect();

            let additional = if listener.resources.is_empty() {
                String::new()
            } else {
                format!(" (resources: {:?})", listener.resources)
            };

            if let Some(name) = listener.name.as_deref() {
                info!("Listening for {name} on {}{additional}", addresses.join(", "));
            } else {
                info!("Listening on {}{additional}", addresses.join(", "));
            }

            for l in listeners {
                crate::server::spawn_server(
                    l,
                    router.clone(),
                    shutdown.soft_shutdown_token(),
                    shutdown.hard_shutdown_token(),
                    shutdown.task_tracker(),
                )?;
            }
        }

        span.exit();

        Ok(shutdown.run().await)
    }
}

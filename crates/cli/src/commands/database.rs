// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{collections::BTreeSet, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use figment::Figment;
use ghlink_config::{ConfigurationSectionExt, DatabaseConfig};
use ghlink_storage_pg::MIGRATOR;
use sqlx::migrate::Migrate;
use tracing::{Instrument, info, info_span};

use crate::util::database_connection_from_config;

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[command(subcommand)]
    action: Action,
}

#[derive(Parser, Debug)]
enum Action {
    /// Apply the pending migrations
    Migrate,

    /// List the migrations not applied yet, failing if there are any
    Status,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let config =
            DatabaseConfig::extract_or_default(figment).map_err(anyhow::Error::from_boxed)?;
        let mut conn = database_connection_from_config(&config).await?;

        match self.action {
            Action::Migrate => {
                MIGRATOR
                    .run(&mut conn)
                    .instrument(info_span!("db.migrate"))
                    .await
                    .context("could not run migrations")?;
                info!("Database is up to date");
                Ok(ExitCode::SUCCESS)
            }

            Action::Status => {
                let applied: BTreeSet<i64> = conn
                    .list_applied_migrations()
                    .await?
                    .into_iter()
                    .map(|migration| migration.version)
                    .collect();

                let mut pending = 0;
                for migration in MIGRATOR.iter().filter(|m| !applied.contains(&m.version)) {
                    info!(version = migration.version, "Pending: {}", migration.description);
                    pending += 1;
                }

                if pending == 0 {
                    info!("No pending migration");
                    Ok(ExitCode::SUCCESS)
                } else {
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

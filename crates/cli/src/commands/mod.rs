// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};

mod config;
mod database;
mod server;

#[derive(Parser, Debug)]
enum Subcommand {
    /// Configuration-related commands
    Config(self::config::Options),

    /// Manage the database
    Database(self::database::Options),

    /// Runs the web server
    Server(self::server::Options),
}

#[derive(Parser, Debug)]
#[command(version = crate::VERSION)]
pub struct Options {
    /// Path to the configuration file
    #[arg(short, long, global = true, action = clap::ArgAction::Append)]
    config: Vec<Utf8PathBuf>,

    #[command(subcommand)]
    subcommand: Option<Subcommand>,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as S;
        match self.subcommand {
            Some(S::Config(c)) => c.run(figment).await,
            Some(S::Database(c)) => c.run(figment).await,
            Some(S::Server(c)) => Box::pin(c.run(figment)).await,
            None => Box::pin(self::server::Options::default().run(figment)).await,
        }
    }

    /// Get a [`Figment`] instance with the configuration loaded
    pub fn figment(&self) -> Figment {
        let configs = if self.config.is_empty() {
            // Read the GHLINK_CONFIG environment variable
            std::env::var("GHLINK_CONFIG")
                // Split the environment variable
                .map(|config| config.split(':').map(Utf8PathBuf::from).collect())
                // Default to "config.yaml"
                .unwrap_or_else(|_| vec!["config.yaml".into()])
        } else {
            self.config.clone()
        };

        let base = Figment::new();

        configs
            .into_iter()
            .fold(base, |f, path| f.admerge(Yaml::file(path)))
            .merge(Env::prefixed("GHLINK_").split("__"))
    }
}

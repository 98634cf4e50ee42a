// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use figment::Figment;
use ghlink_config::{ConfigurationSection, RootConfig};
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[command(subcommand)]
    action: Action,
}

#[derive(Parser, Debug)]
enum Action {
    /// Print the merged configuration as YAML
    Dump {
        /// Write to this file instead of stdout
        #[clap(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Load and validate the configuration
    Check,

    /// Print a configuration with every default filled in
    Generate {
        /// Write to this file instead of stdout
        #[clap(short, long)]
        output: Option<Utf8PathBuf>,
    },
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let load = || RootConfig::extract(figment).map_err(anyhow::Error::from_boxed);

        match self.action {
            Action::Dump { output } => emit(&load()?, output).await?,
            Action::Check => {
                load()?;
                info!("Configuration is valid");
            }
            Action::Generate { output } => emit(&RootConfig::generate(), output).await?,
        }

        Ok(ExitCode::SUCCESS)
    }
}

async fn emit(config: &RootConfig, output: Option<Utf8PathBuf>) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(config)?;

    match output {
        Some(path) => {
            info!(%path, "Writing configuration");
            tokio::fs::write(path, yaml).await?;
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(yaml.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

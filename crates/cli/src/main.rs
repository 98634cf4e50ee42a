// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![allow(clippy::module_name_repetitions)]

use std::{io::IsTerminal, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use figment::Figment;
use ghlink_config::{ConfigurationSection, SentryConfig, TelemetryConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

mod app_state;
mod commands;
mod lifecycle;
mod server;
mod telemetry;
mod util;

static VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sends Sentry events with our own HTTP client
#[derive(Debug)]
struct SentryTransportFactory {
    client: reqwest::Client,
}

impl sentry::TransportFactory for SentryTransportFactory {
    fn create_transport(&self, options: &sentry::ClientOptions) -> Arc<dyn sentry::Transport> {
        Arc::new(sentry::transports::ReqwestHttpTransport::with_client(
            options,
            self.client.clone(),
        ))
    }
}

fn init_sentry(config: &SentryConfig) -> sentry::ClientInitGuard {
    let transport = SentryTransportFactory {
        client: ghlink_http::reqwest_client(),
    };

    sentry::init((
        config.dsn.as_deref(),
        sentry::ClientOptions {
            transport: Some(Arc::new(transport)),
            environment: config.environment.clone().map(Into::into),
            release: Some(VERSION.into()),
            sample_rate: config.sample_rate.unwrap_or(1.0),
            traces_sample_rate: config.traces_sample_rate.unwrap_or(0.0),
            auto_session_tracking: true,
            session_mode: sentry::SessionMode::Request,
            ..Default::default()
        },
    ))
}

/// Install the global `tracing` subscriber
///
/// Logs go to stderr through a non-blocking writer, which flushes when the
/// returned guard is dropped.
fn init_logging(sentry_enabled: bool) -> anyhow::Result<WorkerGuard> {
    let output = std::io::stderr();
    let with_ansi = output.is_terminal();
    let (writer, guard) = tracing_appender::non_blocking(output);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(with_ansi);

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("could not setup logging filter")?;

    // Error events become Sentry events, which gives the handlers an event ID
    // to send back
    let sentry_layer = sentry_enabled
        .then(|| sentry_tracing::layer().event_filter(sentry_tracing::default_event_filter));

    let telemetry_layer = self::telemetry::TRACER.get().map(|tracer| {
        tracing_opentelemetry::layer()
            .with_tracer(tracer.clone())
            .with_tracked_inactivity(false)
            .with_filter(LevelFilter::INFO)
    });

    Registry::default()
        .with(sentry_layer)
        .with(telemetry_layer)
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .context("could not initialize logging")?;

    Ok(guard)
}

/// Load the telemetry section, which is needed before logging is set up
fn telemetry_config(figment: &Figment) -> anyhow::Result<TelemetryConfig> {
    TelemetryConfig::extract(figment)
        .map_err(anyhow::Error::from_boxed)
        .context("Failed to load telemetry config")
}

fn main() -> anyhow::Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run());

    // Flush the spans whatever happened
    if let Err(err) = self::telemetry::shutdown() {
        eprintln!("Failed to shutdown telemetry exporters: {err}");
    }

    result
}

async fn run() -> anyhow::Result<ExitCode> {
    let dotenv = dotenvy::dotenv()
        .map(Some)
        .or_else(|e| if e.not_found() { Ok(None) } else { Err(e) });

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("could not install the AWS LC crypto provider"))?;

    let opts = self::commands::Options::parse();
    let figment = opts.figment();

    let telemetry_config = telemetry_config(&figment)?;

    let sentry = init_sentry(&telemetry_config.sentry);
    self::telemetry::setup(&telemetry_config).context("failed to setup OpenTelemetry")?;
    let _log_guard = init_logging(sentry.is_enabled())?;

    match dotenv {
        Ok(Some(path)) => tracing::info!(?path, "Loaded environment variables from .env file"),
        Ok(None) => {}
        Err(e) => tracing::warn!(?e, "Failed to load .env file"),
    }

    tracing::trace!(?opts, "Running command");
    opts.run(&figment).await
}

#[cfg(test)]
mod tests {
    use figment::{
        Jail,
        providers::{Format, Yaml},
    };
    use ghlink_config::TracingExporterKind;

    use super::*;

    #[test]
    fn test_telemetry_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    telemetry:
                      tracing:
                        exporter: stdout
                ",
            )?;
            let config = telemetry_config(&Figment::new().merge(Yaml::file("config.yaml")))
                .map_err(|e| e.to_string())?;
            assert!(matches!(config.tracing.exporter, TracingExporterKind::Stdout));

            jail.create_file(
                "broken.yaml",
                r"
                    telemetry:
                      tracing:
                        exporter: carrier-pigeon
                ",
            )?;
            let error = telemetry_config(&Figment::new().merge(Yaml::file("broken.yaml")))
                .unwrap_err();
            assert_eq!(error.to_string(), "Failed to load telemetry config");

            Ok(())
        });
    }
}

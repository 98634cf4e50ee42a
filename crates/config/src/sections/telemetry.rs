// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::Error as _};
use serde_with::skip_serializing_none;
use url::Url;

use super::ConfigurationSection;

fn sample_rate_example() -> f64 {
    0.5
}

/// How trace context is read from incoming requests and written to outgoing
/// ones
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Propagator {
    /// W3C `traceparent` and `tracestate` headers
    TraceContext,

    /// W3C `baggage` header
    Baggage,
}

#[allow(clippy::unnecessary_wraps)]
fn otlp_endpoint_default() -> Option<String> {
    Some("https://localhost:4318".to_owned())
}

/// Where spans are sent
#[skip_serializing_none]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum TracingExporterKind {
    /// Nowhere, tracing is disabled
    #[default]
    None,

    /// To the standard output, for debugging
    Stdout,

    /// To an OTLP over HTTP collector
    Otlp,
}

/// Tracing with OpenTelemetry
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct TracingConfig {
    /// Where spans are sent
    #[serde(default)]
    pub exporter: TracingExporterKind,

    /// Endpoint of the OTLP collector, used by the `otlp` exporter
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(url, default = "otlp_endpoint_default")]
    pub endpoint: Option<Url>,

    /// Formats used to propagate the trace context
    #[serde(default)]
    pub propagators: Vec<Propagator>,

    /// Ratio of traces to sample, `1.0` when not set
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(example = "sample_rate_example", range(min = 0.0, max = 1.0))]
    pub sample_rate: Option<f64>,
}

impl TracingConfig {
    fn is_default(&self) -> bool {
        matches!(self.exporter, TracingExporterKind::None)
            && self.endpoint.is_none()
            && self.propagators.is_empty()
            && self.sample_rate.is_none()
    }
}

fn sentry_dsn_example() -> &'static str {
    "https://public@sentry.example.com/1"
}

/// Error reporting to Sentry
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct SentryConfig {
    /// DSN of the Sentry project, reporting is disabled when not set
    #[schemars(url, example = "sentry_dsn_example")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,

    /// Environment attached to the events, `production` when not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Ratio of error events to send, `1.0` when not set
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(example = "sample_rate_example", range(min = 0.0, max = 1.0))]
    pub sample_rate: Option<f32>,

    /// Ratio of transactions to send, `0.0` when not set
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(example = "sample_rate_example", range(min = 0.0, max = 1.0))]
    pub traces_sample_rate: Option<f32>,
}

impl SentryConfig {
    fn is_default(&self) -> bool {
        self.dsn.is_none() && self.environment.is_none()
    }
}

/// Traces and error reporting
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct TelemetryConfig {
    /// Tracing with OpenTelemetry
    #[serde(default, skip_serializing_if = "TracingConfig::is_default")]
    pub tracing: TracingConfig,

    /// Error reporting to Sentry
    #[serde(default, skip_serializing_if = "SentryConfig::is_default")]
    pub sentry: SentryConfig,
}

impl TelemetryConfig {
    pub(crate) fn is_default(&self) -> bool {
        self.tracing.is_default() && self.sentry.is_default()
    }
}

fn check_ratio(value: Option<f64>, path: &str) -> Result<(), figment::error::Error> {
    match value {
        Some(ratio) if !(0.0..=1.0).contains(&ratio) => Err(figment::error::Error::custom(
            format!("{ratio} is not a ratio between 0.0 and 1.0"),
        )
        .with_path(path)),
        _ => Ok(()),
    }
}

impl ConfigurationSection for TelemetryConfig {
    const PATH: Option<&'static str> = Some("telemetry");

    fn validate(
        &self,
        _figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        check_ratio(self.tracing.sample_rate, "tracing.sample_rate")?;
        check_ratio(
            self.sentry.sample_rate.map(f64::from),
            "sentry.sample_rate",
        )?;
        check_ratio(
            self.sentry.traces_sample_rate.map(f64::from),
            "sentry.traces_sample_rate",
        )?;

        Ok(())
    }
}

// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! OpenTelemetry tracing setup
//!
//! Only traces are exported. The tracer is installed globally and kept in
//! [`TRACER`] so that `main` can plug it into the `tracing` subscriber.

use std::sync::OnceLock;

use anyhow::Context as _;
use ghlink_config::{Propagator, TelemetryConfig, TracingConfig, TracingExporterKind};
use opentelemetry::{
    InstrumentationScope, KeyValue,
    propagation::{TextMapCompositePropagator, TextMapPropagator},
    trace::TracerProvider as _,
};
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{
        IdGenerator, Sampler, SdkTracerProvider, Tracer,
        span_processor_with_async_runtime::BatchSpanProcessor,
    },
};
use opentelemetry_semantic_conventions as semcov;

pub static TRACER: OnceLock<Tracer> = OnceLock::new();
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

pub fn setup(config: &TelemetryConfig) -> anyhow::Result<()> {
    let propagators = config
        .tracing
        .propagators
        .iter()
        .map(|propagator| -> Box<dyn TextMapPropagator + Send + Sync> {
            match propagator {
                Propagator::TraceContext => Box::new(TraceContextPropagator::new()),
                Propagator::Baggage => Box::new(BaggagePropagator::new()),
            }
        })
        .collect();
    opentelemetry::global::set_text_map_propagator(TextMapCompositePropagator::new(propagators));

    let provider = tracer_provider(&config.tracing).context("Failed to configure traces exporter")?;

    let scope = InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
        .with_version(crate::VERSION)
        .with_schema_url(semcov::SCHEMA_URL)
        .build();

    TRACER
        .set(provider.tracer_with_scope(scope))
        .map_err(|_| anyhow::anyhow!("the tracer was already set up"))?;
    TRACER_PROVIDER
        .set(provider.clone())
        .map_err(|_| anyhow::anyhow!("the tracer provider was already set up"))?;
    opentelemetry::global::set_tracer_provider(provider);

    Ok(())
}

/// Flush the pending spans
pub fn shutdown() -> opentelemetry_sdk::error::OTelSdkResult {
    TRACER_PROVIDER
        .get()
        .map_or(Ok(()), SdkTracerProvider::shutdown)
}

/// Hands out invalid trace and span IDs, so that no trace ID shows up in the
/// logs while tracing is disabled
#[derive(Debug, Clone, Copy)]
struct DisabledIdGenerator;

impl IdGenerator for DisabledIdGenerator {
    fn new_trace_id(&self) -> opentelemetry::TraceId {
        opentelemetry::TraceId::INVALID
    }

    fn new_span_id(&self) -> opentelemetry::SpanId {
        opentelemetry::SpanId::INVALID
    }
}

fn tracer_provider(config: &TracingConfig) -> anyhow::Result<SdkTracerProvider> {
    let resource = Resource::builder()
        .with_service_name(env!("CARGO_PKG_NAME"))
        .with_attributes([
            KeyValue::new(semcov::resource::SERVICE_VERSION, crate::VERSION),
            KeyValue::new(semcov::resource::PROCESS_RUNTIME_NAME, "rust"),
        ])
        .build();

    // Remote parents decide, root spans are sampled by ratio
    let ratio = config.sample_rate.unwrap_or(1.0);
    let builder = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            ratio,
        ))));

    let provider = match config.exporter {
        TracingExporterKind::None => builder
            .with_sampler(Sampler::AlwaysOff)
            .with_id_generator(DisabledIdGenerator)
            .build(),

        TracingExporterKind::Stdout => builder
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build(),

        TracingExporterKind::Otlp => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_http_client(ghlink_http::reqwest_client());
            let exporter = match &config.endpoint {
                Some(endpoint) => exporter.with_endpoint(endpoint.as_str()),
                None => exporter,
            }
            .build()
            .context("Failed to configure OTLP trace exporter")?;

            builder
                .with_span_processor(
                    BatchSpanProcessor::builder(exporter, opentelemetry_sdk::runtime::Tokio)
                        .build(),
                )
                .build()
        }
    };

    Ok(provider)
}

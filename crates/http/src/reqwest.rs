// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use headers::{ContentLength, HeaderMapExt as _};
use opentelemetry_http::HeaderInjector;
use opentelemetry_semantic_conventions::{
    attribute::HTTP_RESPONSE_BODY_SIZE,
    trace::{HTTP_REQUEST_METHOD, HTTP_RESPONSE_STATUS_CODE, SERVER_ADDRESS, SERVER_PORT, URL_FULL},
};
use rustls_platform_verifier::ConfigVerifierExt;
use tracing::{Instrument, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

static USER_AGENT: &str = concat!("ghlink/", env!("CARGO_PKG_VERSION"));

/// Build the [`reqwest::Client`] shared by every outgoing call of the service
///
/// It verifies certificates against the platform trust store, identifies
/// itself as `ghlink/<version>`, and gives up on requests after a minute.
///
/// # Panics
///
/// Panics if the platform trust store can't be loaded
#[must_use]
pub fn client() -> reqwest::Client {
    let tls_config: rustls::ClientConfig =
        rustls::ClientConfig::with_platform_verifier().expect("failed to create TLS config");

    reqwest::Client::builder()
        .use_preconfigured_tls(tls_config)
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .expect("failed to create HTTP client")
}

fn record_response(span: &Span, response: &reqwest::Response) {
    span.record("otel.status_code", "OK");
    span.record(HTTP_RESPONSE_STATUS_CODE, response.status().as_u16());
    if let Some(ContentLength(length)) = response.headers().typed_get() {
        span.record(HTTP_RESPONSE_BODY_SIZE, length);
    }
}

/// Sending requests inside an `http.client.request` span
pub trait RequestBuilderExt {
    /// Send the request in its own span, propagating the trace context to the
    /// remote server
    fn send_traced(self) -> impl Future<Output = Result<reqwest::Response, reqwest::Error>> + Send;
}

impl RequestBuilderExt for reqwest::RequestBuilder {
    fn send_traced(self) -> impl Future<Output = Result<reqwest::Response, reqwest::Error>> + Send {
        let (client, request) = self.build_split();

        async move {
            let mut request = request?;

            let url = request.url();
            let span = tracing::info_span!(
                "http.client.request",
                "otel.kind" = "client",
                "otel.status_code" = tracing::field::Empty,
                { HTTP_REQUEST_METHOD } = %request.method(),
                { URL_FULL } = %url,
                { SERVER_ADDRESS } = url.host_str(),
                { SERVER_PORT } = url.port_or_known_default(),
                { HTTP_RESPONSE_STATUS_CODE } = tracing::field::Empty,
                { HTTP_RESPONSE_BODY_SIZE } = tracing::field::Empty,
                "rust.error" = tracing::field::Empty,
            );

            let context = span.context();
            opentelemetry::global::get_text_map_propagator(|propagator| {
                propagator.inject_context(&context, &mut HeaderInjector(request.headers_mut()));
            });

            let result = client.execute(request).instrument(span.clone()).await;
            match &result {
                Ok(response) => record_response(&span, response),
                Err(err) => {
                    span.record("otel.status_code", "ERROR");
                    span.record("rust.error", err as &dyn std::error::Error);
                }
            }

            result
        }
    }
}

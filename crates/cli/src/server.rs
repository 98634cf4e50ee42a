// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{
    future::IntoFuture as _,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, ToSocketAddrs},
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{Router, extract::MatchedPath};
use ghlink_config::{HttpBindConfig, HttpResource};
use http::{Method, Request, Response, Version, header::USER_AGENT};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_semantic_conventions::trace::{
    HTTP_REQUEST_METHOD, HTTP_RESPONSE_STATUS_CODE, HTTP_ROUTE, NETWORK_PROTOCOL_NAME,
    NETWORK_PROTOCOL_VERSION, URL_PATH, URL_QUERY, USER_AGENT_ORIGINAL,
};
use sentry_tower::{NewSentryLayer, SentryHttpLayer};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::app_state::AppState;

const GHLINK_LISTENER_NAME: &str = "ghlink.listener.name";

/// The method as OpenTelemetry wants it, with extension methods folded into
/// `_OTHER`
fn method_label(method: &Method) -> &'static str {
    const KNOWN: [(Method, &str); 9] = [
        (Method::GET, "GET"),
        (Method::POST, "POST"),
        (Method::PUT, "PUT"),
        (Method::DELETE, "DELETE"),
        (Method::PATCH, "PATCH"),
        (Method::HEAD, "HEAD"),
        (Method::OPTIONS, "OPTIONS"),
        (Method::TRACE, "TRACE"),
        (Method::CONNECT, "CONNECT"),
    ];

    KNOWN
        .iter()
        .find_map(|(known, label)| (known == method).then_some(*label))
        .unwrap_or("_OTHER")
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "_OTHER",
    }
}

fn user_agent<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
}

fn make_http_span<B>(request: &Request<B>, listener_name: Option<&str>) -> Span {
    let method = method_label(request.method());
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str);

    let span = tracing::info_span!(
        "http.server.request",
        "otel.kind" = "server",
        "otel.name" = route.map_or_else(|| method.to_owned(), |route| format!("{method} {route}")),
        "otel.status_code" = tracing::field::Empty,
        { NETWORK_PROTOCOL_NAME } = "http",
        { NETWORK_PROTOCOL_VERSION } = version_label(request.version()),
        { HTTP_REQUEST_METHOD } = method,
        { HTTP_ROUTE } = route,
        { HTTP_RESPONSE_STATUS_CODE } = tracing::field::Empty,
        { URL_PATH } = request.uri().path(),
        { URL_QUERY } = request.uri().query(),
        { USER_AGENT_ORIGINAL } = user_agent(request),
        { GHLINK_LISTENER_NAME } = listener_name,
    );

    // Continue the trace started by the caller, if any
    let parent = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract_with_context(
            &opentelemetry::Context::new(),
            &HeaderExtractor(request.headers()),
        )
    });
    span.set_parent(parent);

    span
}

/// Log one access-log style line per response, its level following the
/// status class
async fn log_response_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let line = format!(
        "\"{method} {path} HTTP/{version}\"",
        method = method_label(request.method()),
        path = request.uri().path(),
        version = version_label(request.version()),
    );
    let agent = user_agent(&request).unwrap_or("-").to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();
    if status.is_server_error() {
        tracing::error!(name: "http.server.response", "{line} {status} {agent:?} [{elapsed:?}]");
    } else if status.is_client_error() {
        tracing::warn!(name: "http.server.response", "{line} {status} {agent:?} [{elapsed:?}]");
    } else {
        tracing::info!(name: "http.server.response", "{line} {status} {agent:?} [{elapsed:?}]");
    }

    response
}

pub fn build_router(
    state: AppState,
    resources: &[HttpResource],
    prefix: Option<&str>,
    name: Option<&str>,
) -> Router<()> {
    let mut router = Router::new();

    for resource in resources {
        router = match resource {
            HttpResource::Health => router.merge(ghlink_handlers::healthcheck_router::<AppState>()),
            HttpResource::Link => router.merge(ghlink_handlers::github_link_router::<AppState>()),
        }
    }

    // axum panics when nesting at the root
    let prefix = prefix.unwrap_or_default().trim_end_matches('/');
    if !prefix.is_empty() {
        router = Router::new().nest(prefix, router);
    }

    let listener_name = name.map(ToOwned::to_owned);

    router
        .layer(axum::middleware::from_fn(log_response_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<_>| {
                    make_http_span(request, listener_name.as_deref())
                })
                .on_response(|response: &Response<_>, _latency: Duration, span: &Span| {
                    span.record(HTTP_RESPONSE_STATUS_CODE, response.status().as_u16());
                    span.record("otel.status_code", "OK");
                }),
        )
        // Outermost last: the hub must exist before the HTTP layer uses it
        .layer(SentryHttpLayer::with_transaction())
        .layer(NewSentryLayer::new_from_top())
        .with_state(state)
}

pub fn build_listeners(configs: &[HttpBindConfig]) -> Result<Vec<TcpListener>, anyhow::Error> {
    let mut listeners = Vec::with_capacity(configs.len());

    for bind in configs {
        let listener = match bind {
            HttpBindConfig::Listen { host, port } => {
                let addrs = match host.as_deref() {
                    Some(host) => (host, *port)
                        .to_socket_addrs()
                        .context("could not parse listener host")?
                        .collect(),

                    None => vec![
                        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), *port),
                        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), *port),
                    ],
                };

                TcpListener::bind(&addrs[..]).context("could not bind address")?
            }

            HttpBindConfig::Address { address } => {
                let addr: SocketAddr = address
                    .parse()
                    .context("could not parse listener address")?;
                TcpListener::bind(addr).context("could not bind address")?
            }
        };

        listener.set_nonblocking(true)?;
        listeners.push(listener);
    }

    Ok(listeners)
}

/// Serve a router on a listener until the lifecycle manager shuts down
///
/// A soft shutdown stops accepting connections and waits for in-flight
/// requests, a hard shutdown drops everything.
pub fn spawn_server(
    listener: TcpListener,
    router: Router<()>,
    soft_shutdown_token: CancellationToken,
    hard_shutdown_token: CancellationToken,
    task_tracker: &TaskTracker,
) -> Result<(), anyhow::Error> {
    let listener =
        tokio::net::TcpListener::from_std(listener).context("could not register listener")?;
    let local_addr = listener.local_addr().ok();

    task_tracker.spawn(async move {
        let server = axum::serve(listener, router)
            .with_graceful_shutdown(soft_shutdown_token.clone().cancelled_owned())
            .into_future();

        tokio::select! {
            res = server => {
                if let Err(err) = res {
                    tracing::error!(
                        error = &err as &dyn std::error::Error,
                        ?local_addr,
                        "HTTP server failed"
                    );
                    soft_shutdown_token.cancel();
                }
            },

            () = hard_shutdown_token.cancelled() => {
                tracing::warn!(?local_addr, "Dropping in-flight connections");
            },
        }
    });

    Ok(())
}

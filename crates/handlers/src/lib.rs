// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! HTTP handlers linking user accounts to GitHub identities

#![deny(clippy::future_not_send)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRef, FromRequestParts},
    routing::get,
};
use ghlink_data_model::{BoxClock, BoxRng};
use ghlink_session::Authenticator;
use ghlink_storage::BoxRepositoryFactory;
use serde::Serialize;

mod caller;
mod github_link;
mod health;

#[cfg(test)]
mod test_utils;

pub use ghlink_axum_utils::ErrorWrapper;

pub use self::caller::{AuthenticatedCaller, AuthenticationError};

/// Implement `From<E>` for the route error type, collapsing the error into
/// the given variant, which defaults to `Internal`
#[macro_export]
macro_rules! impl_from_error_for_route {
    ($route_error:ty : $error:ty => $variant:ident) => {
        impl From<$error> for $route_error {
            fn from(e: $error) -> Self {
                Self::$variant(Box::new(e))
            }
        }
    };
    ($route_error:ty : $error:ty) => {
        impl_from_error_for_route!($route_error: $error => Internal);
    };
    ($error:ty => $variant:ident) => {
        impl_from_error_for_route!(self::RouteError: $error => $variant);
    };
    ($error:ty) => {
        impl_from_error_for_route!(self::RouteError: $error);
    };
}

/// The body of every response of the link API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct Message {
    message: &'static str,
}

impl Message {
    pub(crate) const SUCCESSFUL: Self = Self::new("successful");

    pub(crate) const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

pub fn healthcheck_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    BoxRepositoryFactory: FromRef<S>,
{
    Router::new().route("/health", get(self::health::get))
}

pub fn github_link_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    BoxRepositoryFactory: FromRef<S>,
    Arc<dyn Authenticator>: FromRef<S>,
    BoxClock: FromRequestParts<S>,
    BoxRng: FromRequestParts<S>,
{
    Router::new().route(
        "/api/github",
        axum::routing::post(self::github_link::register::handler)
            .put(self::github_link::confirm::handler),
    )
}

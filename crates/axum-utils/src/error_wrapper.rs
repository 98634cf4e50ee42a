// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::record_error;

/// Turns any error into an opaque 500 response
///
/// The error itself only ends up in the logs and in Sentry.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ErrorWrapper<E>(#[from] pub E);

impl<E: std::error::Error + 'static> IntoResponse for ErrorWrapper<E> {
    fn into_response(self) -> Response {
        let event_id = record_error!(self.0);
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        (status, event_id, status.canonical_reason().unwrap_or_default()).into_response()
    }
}

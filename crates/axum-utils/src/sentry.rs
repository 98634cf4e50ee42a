// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::convert::Infallible;

use axum::response::{IntoResponseParts, ResponseParts};
use http::HeaderValue;
use sentry::types::Uuid;

/// A wrapper to include a Sentry event ID in the response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentryEventID(Uuid);

impl SentryEventID {
    /// Create a new Sentry event ID header for the last event on the hub.
    #[must_use]
    pub fn for_last_event() -> Option<Self> {
        sentry::last_event_id().map(Self)
    }
}

impl From<Uuid> for SentryEventID {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl IntoResponseParts for SentryEventID {
    type Error = Infallible;
    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        // A hyphenated UUID is always a valid header value
        if let Ok(value) = HeaderValue::from_str(&self.0.to_string()) {
            res.headers_mut().insert("X-Sentry-Event-ID", value);
        }

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn test_event_id_header() {
        let uuid = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        let response = (SentryEventID::from(uuid), "oops").into_response();
        assert_eq!(
            response.headers().get("X-Sentry-Event-ID").unwrap(),
            "01234567-89ab-cdef-0123-456789abcdef"
        );

        // No header when nothing was reported
        let response = (Option::<SentryEventID>::None, "oops").into_response();
        assert!(response.headers().get("X-Sentry-Event-ID").is_none());
    }
}

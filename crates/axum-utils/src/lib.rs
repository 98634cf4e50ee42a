// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(clippy::future_not_send)]
#![allow(clippy::module_name_repetitions)]

pub mod error_wrapper;
pub mod sentry;

pub use axum;

pub use self::error_wrapper::ErrorWrapper;

/// Log an error, and return the Sentry event ID it was reported under, if any
///
/// With a pattern, only the errors matching it are logged as errors and
/// reported; the other ones are logged as warnings.
#[macro_export]
macro_rules! record_error {
    ($error:expr, !) => {{
        tracing::warn!(message = &$error as &dyn std::error::Error);
        Option::<$crate::sentry::SentryEventID>::None
    }};

    ($error:expr) => {{
        tracing::error!(message = &$error as &dyn std::error::Error);

        // With the `sentry-tracing` integration, Sentry should have captured an
        // error, so let's extract the last event ID from the current hub
        $crate::sentry::SentryEventID::for_last_event()
    }};

    ($error:expr, $pattern:pat) => {
        if let $pattern = $error {
            $crate::record_error!($error)
        } else {
            $crate::record_error!($error, !)
        }
    };
}

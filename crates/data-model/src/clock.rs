// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Where link requests get their timestamps from
//!
//! Nothing reads the system time directly: operations take a [`Clock`], which
//! is a [`SystemClock`] in the server and a [`MockClock`] in tests.

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, TimeZone, Utc};

/// Gives the current date and time
pub trait Clock: Sync {
    /// Get the current date and time
    fn now(&self) -> DateTime<Utc>;
}

/// The clock handed to request handlers
pub type BoxClock = Box<dyn Clock + Send>;

impl<C: Clock + Send + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// The wall clock of the machine
#[derive(Clone, Default)]
pub struct SystemClock {
    _private: (),
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        #[allow(clippy::disallowed_methods)]
        Utc::now()
    }
}

/// A frozen clock, which only moves when [`MockClock::advance`] is called
///
/// It has millisecond precision.
pub struct MockClock {
    timestamp_millis: AtomicI64,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2022, 1, 16, 14, 40, 0).unwrap())
    }
}

impl MockClock {
    /// Create a clock frozen at the given datetime
    #[must_use]
    pub fn new(datetime: DateTime<Utc>) -> Self {
        Self {
            timestamp_millis: AtomicI64::new(datetime.timestamp_millis()),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, duration: chrono::Duration) {
        self.timestamp_millis
            .fetch_add(duration.num_milliseconds(), Ordering::Relaxed);
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.timestamp_millis.load(Ordering::Relaxed);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}

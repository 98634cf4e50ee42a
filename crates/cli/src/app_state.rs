// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{convert::Infallible, sync::Arc};

use axum::extract::{FromRef, FromRequestParts};
use ghlink_data_model::{BoxClock, BoxRng, SystemClock};
use ghlink_session::Authenticator;
use ghlink_storage::BoxRepositoryFactory;
use rand::{Rng as _, SeedableRng as _};

#[derive(Clone)]
pub struct AppState {
    pub repository_factory: BoxRepositoryFactory,
    pub authenticator: Arc<dyn Authenticator>,
}

impl FromRef<AppState> for BoxRepositoryFactory {
    fn from_ref(input: &AppState) -> Self {
        input.repository_factory.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Authenticator> {
    fn from_ref(input: &AppState) -> Self {
        input.authenticator.clone()
    }
}

impl FromRequestParts<AppState> for BoxClock {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let clock = SystemClock::default();
        Ok(Box::new(clock))
    }
}

impl FromRequestParts<AppState> for BoxRng {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // This rng is used to source the local rng
        #[allow(clippy::disallowed_methods)]
        let mut rng = rand::thread_rng();

        let rng = rand_chacha::ChaChaRng::from_seed(rng.r#gen());
        Ok(Box::new(rng))
    }
}

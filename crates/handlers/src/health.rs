// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use axum::extract::State;
use ghlink_axum_utils::ErrorWrapper;
use ghlink_storage::{BoxRepositoryFactory, RepositoryError};
use tracing::Instrument;
use ulid::Ulid;

/// Round-trip to the store and answer `ok`
///
/// The lookup is for a link which can't exist, and the transaction is rolled
/// back, so nothing is ever written.
async fn probe(repository_factory: &BoxRepositoryFactory) -> Result<(), RepositoryError> {
    let mut repo = repository_factory.create().await?;
    let _ = repo.github_link().lookup(Ulid::nil()).await?;
    repo.cancel().await
}

pub async fn get(
    State(repository_factory): State<BoxRepositoryFactory>,
) -> Result<&'static str, ErrorWrapper<RepositoryError>> {
    probe(&repository_factory)
        .instrument(tracing::info_span!("health.store"))
        .await?;

    Ok("ok")
}

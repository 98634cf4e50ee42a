// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ghlink_axum_utils::record_error;
use ghlink_data_model::{BoxClock, BoxRng, ValidationError, validate_user_id, validate_username};
use ghlink_storage::BoxRepositoryFactory;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    AuthenticatedCaller, AuthenticationError, Message, impl_from_error_for_route,
};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Unauthenticated(#[from] AuthenticationError),

    #[error("Request body could not be parsed")]
    InvalidBody(#[from] JsonRejection),

    #[error(transparent)]
    InvalidField(#[from] ValidationError),

    #[error("Could not record the link request")]
    LinkFailure(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl_from_error_for_route!(ghlink_storage::RepositoryError => LinkFailure);

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let sentry_event_id = record_error!(
            self,
            Self::LinkFailure(_) | Self::Unauthenticated(AuthenticationError::Provider(_))
        );
        let (status, message) = match self {
            Self::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "Authentication failed"),
            Self::InvalidBody(_) | Self::InvalidField(_) => {
                (StatusCode::BAD_REQUEST, "invalid request body")
            }
            Self::LinkFailure(_) => (StatusCode::FORBIDDEN, "failed"),
        };

        (status, sentry_event_id, Json(Message::new(message))).into_response()
    }
}

/// # JSON payload for the `POST /api/github` route
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// The GitHub username the user claims
    value: String,

    /// The internal ID of the user
    user_id: String,
}

#[tracing::instrument(name = "handlers.github_link.register", skip_all)]
pub async fn handler(
    mut rng: BoxRng,
    clock: BoxClock,
    State(repository_factory): State<BoxRepositoryFactory>,
    caller: Result<AuthenticatedCaller, AuthenticationError>,
    body: Result<Json<Request>, JsonRejection>,
) -> Result<Json<Message>, RouteError> {
    let caller = caller?;
    let Json(params) = body?;
    validate_username(&params.value)?;
    validate_user_id(&params.user_id)?;

    let mut repo = repository_factory.create().await?;

    let link = repo
        .github_link()
        .upsert_pending(&mut rng, &clock, params.user_id, params.value)
        .await?;

    repo.save().await?;

    tracing::info!(
        github_link.id = %link.id,
        github_link.username = %link.username,
        session.user.name = caller.user().name.as_deref(),
        "Recorded a pending GitHub link for user {}",
        link.user_id,
    );

    Ok(Json(Message::SUCCESSFUL))
}

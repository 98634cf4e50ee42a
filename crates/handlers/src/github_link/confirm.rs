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
use ghlink_data_model::{BoxClock, LinkProfile, Ulid, validate_username};
use ghlink_storage::BoxRepositoryFactory;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    AuthenticatedCaller, AuthenticationError, Message, impl_from_error_for_route,
};

const LINK_ERROR_MESSAGE: &str = "Error while linking account, username is different";

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Unauthenticated(#[from] AuthenticationError),

    #[error("Request body could not be parsed")]
    InvalidBody(#[from] JsonRejection),

    #[error("Request body has no username")]
    MissingUsername,

    #[error("No pending link request for this username")]
    UnknownOrAlreadyLinked,

    #[error("Could not confirm the link request")]
    LinkFailure(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl_from_error_for_route!(ghlink_storage::RepositoryError => LinkFailure);

/// The link request stopped being pending between the lookup and the update
#[derive(Debug, Error)]
#[error("Link request {id} was confirmed concurrently")]
struct ConcurrentConfirmation {
    id: Ulid,
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let sentry_event_id = record_error!(
            self,
            Self::LinkFailure(_) | Self::Unauthenticated(AuthenticationError::Provider(_))
        );
        let (status, message) = match self {
            Self::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "Authentication failed"),
            Self::InvalidBody(_) => (StatusCode::BAD_REQUEST, "invalid request body"),
            Self::MissingUsername => (StatusCode::FORBIDDEN, "error while fetching username"),
            Self::UnknownOrAlreadyLinked => (StatusCode::UNAUTHORIZED, LINK_ERROR_MESSAGE),
            Self::LinkFailure(_) => (StatusCode::FORBIDDEN, LINK_ERROR_MESSAGE),
        };

        (status, sentry_event_id, Json(Message::new(message))).into_response()
    }
}

/// # JSON payload for the `PUT /api/github` route
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// The GitHub username to confirm
    #[serde(default)]
    username: Option<String>,

    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    public_name: Option<String>,

    #[serde(default)]
    image: Option<String>,
}

#[tracing::instrument(name = "handlers.github_link.confirm", skip_all)]
pub async fn handler(
    clock: BoxClock,
    State(repository_factory): State<BoxRepositoryFactory>,
    caller: Result<AuthenticatedCaller, AuthenticationError>,
    body: Result<Json<Request>, JsonRejection>,
) -> Result<Json<Message>, RouteError> {
    let _caller = caller?;
    let Json(params) = body?;

    let username = params
        .username
        .filter(|username| validate_username(username).is_ok())
        .ok_or(RouteError::MissingUsername)?;

    let profile = LinkProfile {
        email: params.email,
        public_name: params.public_name,
        image: params.image,
    };

    let mut repo = repository_factory.create().await?;

    let Some(link) = repo
        .github_link()
        .find_pending_by_username(&username)
        .await?
    else {
        repo.cancel().await?;
        return Err(RouteError::UnknownOrAlreadyLinked);
    };

    let id = link.id;
    let link = repo
        .github_link()
        .confirm(&clock, link, profile)
        .await?
        .ok_or_else(|| RouteError::LinkFailure(Box::new(ConcurrentConfirmation { id })))?;

    // Both writes land in the same transaction
    let attributed = repo
        .bounty()
        .set_github_user_for_username(&link.username, &link.user_id)
        .await?;

    repo.save().await?;

    tracing::info!(
        github_link.id = %link.id,
        github_link.username = %link.username,
        bounties.attributed = attributed,
        "Confirmed GitHub link for user {}",
        link.user_id,
    );

    Ok(Json(Message::SUCCESSFUL))
}

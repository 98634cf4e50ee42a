// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use ghlink_axum_utils::record_error;
use ghlink_session::{Authenticator, CallerSession, SessionUser};
use thiserror::Error;

use crate::Message;

/// The session of a caller which was successfully authenticated
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    user: SessionUser,
}

impl AuthenticatedCaller {
    /// The user behind this session
    #[must_use]
    pub fn user(&self) -> &SessionUser {
        &self.user
    }
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("Request carries no session")]
    MissingSession,

    #[error("Session is not bound to a user")]
    MissingUser,

    #[error("Could not look up the session")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl IntoResponse for AuthenticationError {
    fn into_response(self) -> Response {
        let sentry_event_id = record_error!(self, Self::Provider(_));
        (
            StatusCode::UNAUTHORIZED,
            sentry_event_id,
            Json(Message::new("Authentication failed")),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for AuthenticatedCaller
where
    S: Send + Sync,
    Arc<dyn Authenticator>: FromRef<S>,
{
    type Rejection = AuthenticationError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Arc::<dyn Authenticator>::from_ref(state);

        let CallerSession { user, .. } = authenticator
            .authenticate(parts)
            .await
            .map_err(|e| AuthenticationError::Provider(e.into()))?
            .ok_or(AuthenticationError::MissingSession)?;

        let user = user.ok_or(AuthenticationError::MissingUser)?;

        Ok(Self { user })
    }
}

// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Resolve incoming requests to an authenticated caller
//!
//! Sessions are owned by an external provider. This crate only defines the
//! [`Authenticator`] seam, the shape of a [`CallerSession`], and an in-process
//! [`MockAuthenticator`].

#![deny(missing_docs)]

mod mock;

use std::sync::Arc;

use headers::{Authorization, HeaderMapExt as _, authorization::Bearer};
use http::HeaderMap;
use serde::{Deserialize, Serialize};

pub use self::mock::Authenticator as MockAuthenticator;

/// The user a session belongs to, as described by the session provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// The internal identifier of the user, if the provider exposes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The display name of the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The email address of the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// The avatar of the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A session, as returned by the session provider
///
/// A session without a [`SessionUser`] does not authenticate anyone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerSession {
    /// The user this session belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,

    /// When the session expires, in the format used by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
}

impl CallerSession {
    /// Create a session for the given user
    #[must_use]
    pub fn for_user(user: SessionUser) -> Self {
        Self {
            user: Some(user),
            expires: None,
        }
    }

    /// Get the user this session authenticates, if any
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }
}

/// Get the session token carried by a request, either as a bearer token or
/// in the cookie with the given name
///
/// The bearer token wins if both are present.
#[must_use]
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_owned());
    }

    let cookies = headers.typed_get::<headers::Cookie>()?;
    cookies.get(cookie_name).map(ToOwned::to_owned)
}

/// Resolves a request to the session of the caller
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Find the session of the caller of a request
    ///
    /// Returns `None` if the request carries no valid session.
    ///
    /// # Parameters
    ///
    /// * `parts` - The head of the incoming request.
    ///
    /// # Errors
    ///
    /// Returns an error if the session provider could not be queried, or
    /// answered with something which is not a session.
    async fn authenticate(
        &self,
        parts: &http::request::Parts,
    ) -> Result<Option<CallerSession>, anyhow::Error>;
}

#[async_trait::async_trait]
impl<T: Authenticator + Send + Sync + ?Sized> Authenticator for &T {
    async fn authenticate(
        &self,
        parts: &http::request::Parts,
    ) -> Result<Option<CallerSession>, anyhow::Error> {
        (**self).authenticate(parts).await
    }
}

#[async_trait::async_trait]
impl<T: Authenticator + ?Sized> Authenticator for Arc<T> {
    async fn authenticate(
        &self,
        parts: &http::request::Parts,
    ) -> Result<Option<CallerSession>, anyhow::Error> {
        (**self).authenticate(parts).await
    }
}

// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! An [`Authenticator`] asking an external session provider who the caller is
//!
//! The provider is expected to expose a session endpoint which answers with a
//! JSON object containing a `user` when the credentials it received belong to
//! a signed-in user, and with `{}` or `null` otherwise.

use std::time::Duration;

use anyhow::Context as _;
use ghlink_http::RequestBuilderExt as _;
use ghlink_session::{Authenticator, CallerSession};
use http::header::{AUTHORIZATION, COOKIE};
use url::Url;

/// The headers which carry the caller credentials to the session provider
static FORWARDED_HEADERS: [http::HeaderName; 2] = [COOKIE, AUTHORIZATION];

#[derive(Clone)]
pub struct RemoteSessionAuthenticator {
    endpoint: Url,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl RemoteSessionAuthenticator {
    #[must_use]
    pub fn new(endpoint: Url, timeout: Duration, http_client: reqwest::Client) -> Self {
        Self {
            endpoint,
            timeout,
            http_client,
        }
    }
}

#[async_trait::async_trait]
impl Authenticator for RemoteSessionAuthenticator {
    #[tracing::instrument(
        name = "session.authenticate",
        skip_all,
        fields(session.endpoint = %self.endpoint),
        err(Debug),
    )]
    async fn authenticate(
        &self,
        parts: &http::request::Parts,
    ) -> Result<Option<CallerSession>, anyhow::Error> {
        let mut request = self
            .http_client
            .get(self.endpoint.clone())
            .timeout(self.timeout);

        let mut has_credentials = false;
        for name in &FORWARDED_HEADERS {
            for value in parts.headers.get_all(name) {
                request = request.header(name, value);
                has_credentials = true;
            }
        }

        if !has_credentials {
            tracing::debug!("Request has no credentials, not asking the session provider");
            return Ok(None);
        }

        let response = request
            .send_traced()
            .await
            .context("Failed to query the session provider")?
            .error_for_status()
            .context("Unexpected HTTP response from the session provider")?;

        // `null` deserializes to `None`
        let session: Option<CallerSession> = response
            .json()
            .await
            .context("Failed to deserialize the session provider response")?;

        Ok(session.filter(|session| session.user().is_some()))
    }
}

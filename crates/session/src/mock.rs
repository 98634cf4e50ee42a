// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{CallerSession, session_token};

/// An [`Authenticator`](crate::Authenticator) knowing a fixed set of session
/// tokens
///
/// Tokens are read from the `Authorization: Bearer` header, or from the cookie
/// named when creating the authenticator.
pub struct Authenticator {
    cookie_name: String,
    sessions: RwLock<HashMap<String, CallerSession>>,
}

impl Authenticator {
    /// Create a new [`Authenticator`] without any session
    #[must_use]
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Add a session, before the authenticator is shared
    #[must_use]
    pub fn with_session(mut self, token: impl Into<String>, session: CallerSession) -> Self {
        self.sessions.get_mut().insert(token.into(), session);
        self
    }

    /// Add or replace a session
    pub async fn add_session(&self, token: impl Into<String>, session: CallerSession) {
        self.sessions.write().await.insert(token.into(), session);
    }

    /// Forget a session
    pub async fn remove_session(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

#[async_trait::async_trait]
impl crate::Authenticator for Authenticator {
    async fn authenticate(
        &self,
        parts: &http::request::Parts,
    ) -> Result<Option<CallerSession>, anyhow::Error> {
        let Some(token) = session_token(&parts.headers, &self.cookie_name) else {
            return Ok(None);
        };

        Ok(self.sessions.read().await.get(&token).cloned())
    }
}

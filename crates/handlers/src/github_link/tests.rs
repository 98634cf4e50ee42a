// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::http::{Request, StatusCode};
use ghlink_data_model::{Clock, LinkProfile, LinkState};
use ghlink_session::{Authenticator, CallerSession};
use insta::assert_json_snapshot;

use crate::test_utils::{RequestBuilderExt, ResponseExt, TestState, setup};

fn register(token: Option<&str>, body: serde_json::Value) -> Request<String> {
    let builder = Request::post("/api/github");
    match token {
        Some(token) => builder.bearer(token).json(body),
        None => builder.json(body),
    }
}

fn confirm(token: Option<&str>, body: serde_json::Value) -> Request<String> {
    let builder = Request::put("/api/github");
    match token {
        Some(token) => builder.bearer(token).json(body),
        None => builder.json(body),
    }
}

#[tokio::test]
async fn test_unauthenticated() {
    setup();
    let state = TestState::new();

    let response = state
        .request(register(
            None,
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_json_snapshot!(body, @r#"
    {
      "message": "Authentication failed"
    }
    "#);

    // Unknown tokens are rejected the same way
    let response = state
        .request(register(
            Some("not-a-token"),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // Nothing was written
    let mut repo = state.repository().await;
    assert!(repo.github_link().find_by_user_id("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unauthenticated_confirm() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;
    let bounty = state.add_bounty("octocat").await;

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::OK);

    let response = state
        .request(confirm(None, serde_json::json!({ "username": "octocat" })))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = state
        .request(confirm(
            Some("not-a-token"),
            serde_json::json!({ "username": "octocat" }),
        ))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // The link is still pending and the bounty still unattributed
    let mut repo = state.repository().await;
    let link = repo
        .github_link()
        .find_pending_by_username("octocat")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.user_id, "u1");
    let bounty = repo.bounty().lookup(bounty.id).await.unwrap().unwrap();
    assert_eq!(bounty.github_user_id, None);
}

#[tokio::test]
async fn test_session_without_user() {
    setup();
    let state = TestState::new();
    state
        .sessions
        .add_session("anonymous", CallerSession::default())
        .await;

    let response = state
        .request(register(
            Some("anonymous"),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

struct BrokenAuthenticator;

#[async_trait::async_trait]
impl Authenticator for BrokenAuthenticator {
    async fn authenticate(
        &self,
        _parts: &axum::http::request::Parts,
    ) -> Result<Option<CallerSession>, anyhow::Error> {
        Err(anyhow::anyhow!("session provider is down"))
    }
}

#[tokio::test]
async fn test_authenticator_failure() {
    setup();
    let state = TestState::new().with_authenticator(Arc::new(BrokenAuthenticator));

    let response = state
        .request(register(
            Some("whatever"),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Authentication failed");
}

#[tokio::test]
async fn test_register() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_json_snapshot!(body, @r#"
    {
      "message": "successful"
    }
    "#);

    let mut repo = state.repository().await;
    let link = repo
        .github_link()
        .find_by_user_id("u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.username, "octocat");
    assert_eq!(link.state, LinkState::Pending);
    assert_eq!(link.profile, LinkProfile::default());
    assert_eq!(link.created_at, state.clock.now());
}

#[tokio::test]
async fn test_register_with_cookie() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;

    let request = Request::post("/api/github")
        .session_cookie(&token)
        .json(serde_json::json!({ "value": "octocat", "userId": "u1" }));
    let response = state.request(request).await;
    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_register_overwrites_pending() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;

    for username in ["octocat", "octocat", "monalisa"] {
        let response = state
            .request(register(
                Some(&token),
                serde_json::json!({ "value": username, "userId": "u1" }),
            ))
            .await;
        response.assert_status(StatusCode::OK);
    }

    let mut repo = state.repository().await;
    let link = repo
        .github_link()
        .find_by_user_id("u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.username, "monalisa");
    assert!(
        repo.github_link()
            .find_pending_by_username("octocat")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_register_invalid_body() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;

    let requests = [
        Request::post("/api/github")
            .bearer(&token)
            .raw_json("{ not json"),
        register(Some(&token), serde_json::json!({ "value": "octocat" })),
        register(Some(&token), serde_json::json!({ "userId": "u1" })),
        register(Some(&token), serde_json::json!({ "value": "", "userId": "u1" })),
        register(Some(&token), serde_json::json!({ "value": "octocat", "userId": "  " })),
        register(Some(&token), serde_json::json!({ "value": 42, "userId": "u1" })),
    ];

    for request in requests {
        let response = state.request(request).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "invalid request body");
    }

    let mut repo = state.repository().await;
    assert!(repo.github_link().find_by_user_id("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_register_claimed_username() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::OK);

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "octocat", "userId": "u2" }),
        ))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_json_snapshot!(body, @r#"
    {
      "message": "failed"
    }
    "#);

    let mut repo = state.repository().await;
    assert!(repo.github_link().find_by_user_id("u2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_register_after_linked() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::OK);

    let response = state
        .request(confirm(Some(&token), serde_json::json!({ "username": "octocat" })))
        .await;
    response.assert_status(StatusCode::OK);

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "monalisa", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let mut repo = state.repository().await;
    let link = repo
        .github_link()
        .find_by_user_id("u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.username, "octocat");
    assert!(link.is_linked());
}

#[tokio::test]
async fn test_confirm_missing_username() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;
    let bounty = state.add_bounty("octocat").await;

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::OK);

    for body in [
        serde_json::json!({}),
        serde_json::json!({ "username": "" }),
        serde_json::json!({ "username": "   " }),
        serde_json::json!({ "username": null, "email": "mona@example.com" }),
    ] {
        let response = state.request(confirm(Some(&token), body)).await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "error while fetching username");
    }

    // The pending link and the bounty were left alone
    let mut repo = state.repository().await;
    let link = repo
        .github_link()
        .find_by_user_id("u1")
        .await
        .unwrap()
        .unwrap();
    assert!(!link.is_linked());
    let bounty = repo.bounty().lookup(bounty.id).await.unwrap().unwrap();
    assert_eq!(bounty.github_user_id, None);
}

#[tokio::test]
async fn test_confirm_invalid_body() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;

    let request = Request::put("/api/github")
        .bearer(&token)
        .raw_json("[1, 2, 3");
    let response = state.request(request).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_confirm_unknown_username() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;

    let response = state
        .request(confirm(Some(&token), serde_json::json!({ "username": "octocat" })))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_json_snapshot!(body, @r#"
    {
      "message": "Error while linking account, username is different"
    }
    "#);
}

#[tokio::test]
async fn test_link_flow() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;

    let octocat_bounty = state.add_bounty("octocat").await;
    let hubot_bounty = state.add_bounty("hubot").await;

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::OK);

    state.clock.advance(chrono::Duration::minutes(5));

    let response = state
        .request(confirm(
            Some(&token),
            serde_json::json!({
                "username": "octocat",
                "email": "a@b.com",
                "publicName": "The Octocat",
            }),
        ))
        .await;
    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_json_snapshot!(body, @r#"
    {
      "message": "successful"
    }
    "#);

    {
        let mut repo = state.repository().await;
        let link = repo
            .github_link()
            .find_by_user_id("u1")
            .await
            .unwrap()
            .unwrap();
        assert_matches!(link.state, LinkState::Linked { linked_at } if linked_at == state.clock.now());
        assert_eq!(
            link.profile,
            LinkProfile {
                email: Some("a@b.com".to_owned()),
                public_name: Some("The Octocat".to_owned()),
                image: None,
            }
        );

        let bounty = repo
            .bounty()
            .lookup(octocat_bounty.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bounty.github_user_id.as_deref(), Some("u1"));

        let bounty = repo
            .bounty()
            .lookup(hubot_bounty.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bounty.github_user_id, None);

        repo.cancel().await.unwrap();
    }

    // A second confirmation finds no pending request
    let response = state
        .request(confirm(Some(&token), serde_json::json!({ "username": "octocat" })))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // and leaves the profile untouched
    let mut repo = state.repository().await;
    let link = repo
        .github_link()
        .find_by_user_id("u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.profile.email.as_deref(), Some("a@b.com"));
}

#[tokio::test]
async fn test_confirm_without_profile() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::OK);

    let response = state
        .request(confirm(Some(&token), serde_json::json!({ "username": "octocat" })))
        .await;
    response.assert_status(StatusCode::OK);

    let mut repo = state.repository().await;
    let link = repo
        .github_link()
        .find_by_user_id("u1")
        .await
        .unwrap()
        .unwrap();
    assert!(link.is_linked());
    assert_eq!(link.profile, LinkProfile::default());
}

#[tokio::test]
async fn test_confirm_rolls_back_on_bounty_failure() {
    setup();
    let state = TestState::new();
    let token = state.login("u1").await;
    state.add_bounty("octocat").await;

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::OK);

    let failing = state.clone().with_failing_bounties();
    let response = failing
        .request(confirm(Some(&token), serde_json::json!({ "username": "octocat" })))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["message"],
        "Error while linking account, username is different"
    );

    // The link request is still pending
    {
        let mut repo = state.repository().await;
        let link = repo
            .github_link()
            .find_pending_by_username("octocat")
            .await
            .unwrap();
        assert!(link.is_some());
        repo.cancel().await.unwrap();
    }

    // and can be confirmed once the store works again
    let response = state
        .request(confirm(Some(&token), serde_json::json!({ "username": "octocat" })))
        .await;
    response.assert_status(StatusCode::OK);

    let mut repo = state.repository().await;
    let bounties = repo.bounty().list_for_username("octocat").await.unwrap();
    assert_eq!(bounties.len(), 1);
    assert_eq!(bounties[0].github_user_id.as_deref(), Some("u1"));
}

#[tokio::test]
async fn test_unreachable_store() {
    setup();
    let state = TestState::new().with_unreachable_store();
    let token = state.login("u1").await;

    let response = state
        .request(register(
            Some(&token),
            serde_json::json!({ "value": "octocat", "userId": "u1" }),
        ))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = state
        .request(confirm(Some(&token), serde_json::json!({ "username": "octocat" })))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

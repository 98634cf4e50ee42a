// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use assert_matches::assert_matches;
use chrono::Duration;
use ghlink_data_model::{Clock, LinkProfile, clock::MockClock};
use ghlink_storage::{RepositoryAccess, RepositoryFactory, RepositoryTransaction};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use crate::{MemoryError, MemoryRepositoryFactory};

#[tokio::test]
async fn test_upsert_pending() {
    let factory = MemoryRepositoryFactory::new();
    let mut repo = factory.begin().await;
    let mut rng = ChaChaRng::seed_from_u64(42);
    let clock = MockClock::default();

    let first = repo
        .github_link()
        .upsert_pending(&mut rng, &clock, "u1".to_owned(), "octocat".to_owned())
        .await
        .unwrap();
    assert!(first.is_pending());
    assert_eq!(first.created_at, clock.now());

    clock.advance(Duration::minutes(1));
    let second = repo
        .github_link()
        .upsert_pending(&mut rng, &clock, "u1".to_owned(), "hubot".to_owned())
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.username, "hubot");
    assert_eq!(second.created_at, first.created_at);

    assert_eq!(
        repo.github_link().lookup(first.id).await.unwrap(),
        Some(second.clone())
    );
    assert_eq!(
        repo.github_link().find_by_user_id("u1").await.unwrap(),
        Some(second)
    );
    assert!(
        repo.github_link()
            .find_pending_by_username("octocat")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_unique_constraints() {
    let factory = MemoryRepositoryFactory::new();
    let mut repo = factory.begin().await;
    let mut rng = ChaChaRng::seed_from_u64(42);
    let clock = MockClock::default();

    let link = repo
        .github_link()
        .upsert_pending(&mut rng, &clock, "u1".to_owned(), "octocat".to_owned())
        .await
        .unwrap();

    let err = repo
        .github_link()
        .upsert_pending(&mut rng, &clock, "u2".to_owned(), "octocat".to_owned())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        MemoryError::UniqueViolation {
            table: "github_links",
            column: "username"
        }
    );

    repo.github_link()
        .confirm(&clock, link, LinkProfile::default())
        .await
        .unwrap()
        .unwrap();

    let err = repo
        .github_link()
        .upsert_pending(&mut rng, &clock, "u1".to_owned(), "hubot".to_owned())
        .await
        .unwrap_err();
    assert_matches!(err, MemoryError::AlreadyLinked { user_id } if user_id == "u1");
}

#[tokio::test]
async fn test_confirm_only_once() {
    let factory = MemoryRepositoryFactory::new();
    let mut repo = factory.begin().await;
    let mut rng = ChaChaRng::seed_from_u64(42);
    let clock = MockClock::default();

    let pending = repo
        .github_link()
        .upsert_pending(&mut rng, &clock, "u1".to_owned(), "octocat".to_owned())
        .await
        .unwrap();

    clock.advance(Duration::minutes(5));
    let profile = LinkProfile {
        email: Some("a@b.com".to_owned()),
        public_name: None,
        image: Some("https://example.com/octocat.png".to_owned()),
    };
    let linked = repo
        .github_link()
        .confirm(&clock, pending.clone(), profile.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(linked.linked_at(), Some(clock.now()));
    assert_eq!(linked.profile, profile);

    // The stale pending copy loses
    let again = repo
        .github_link()
        .confirm(&clock, pending, LinkProfile::default())
        .await
        .unwrap();
    assert_eq!(again, None);

    assert!(
        repo.github_link()
            .find_pending_by_username("octocat")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_bounty_attribution() {
    let factory = MemoryRepositoryFactory::new();
    let mut repo = factory.begin().await;
    let mut rng = ChaChaRng::seed_from_u64(42);
    let clock = MockClock::default();

    let first = repo
        .bounty()
        .add(&mut rng, &clock, "octocat".to_owned())
        .await
        .unwrap();
    clock.advance(Duration::seconds(1));
    let second = repo
        .bounty()
        .add(&mut rng, &clock, "octocat".to_owned())
        .await
        .unwrap();
    let other = repo
        .bounty()
        .add(&mut rng, &clock, "hubot".to_owned())
        .await
        .unwrap();

    let updated = repo
        .bounty()
        .set_github_user_for_username("octocat", "u1")
        .await
        .unwrap();
    assert_eq!(updated, 2);

    let bounties = repo.bounty().list_for_username("octocat").await.unwrap();
    assert_eq!(
        bounties.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );
    assert!(bounties.iter().all(|b| b.is_attributed()));

    let other = repo.bounty().lookup(other.id).await.unwrap().unwrap();
    assert!(!other.is_attributed());
}

#[tokio::test]
async fn test_transactions() {
    let factory = MemoryRepositoryFactory::new();
    let mut rng = ChaChaRng::seed_from_u64(42);
    let clock = MockClock::default();

    // Cancelled writes are discarded
    let mut repo = factory.create().await.unwrap();
    repo.github_link()
        .upsert_pending(&mut rng, &clock, "u1".to_owned(), "octocat".to_owned())
        .await
        .unwrap();
    repo.cancel().await.unwrap();

    // So are writes of a dropped repository
    let mut repo = factory.create().await.unwrap();
    assert!(repo.github_link().find_by_user_id("u1").await.unwrap().is_none());
    repo.bounty()
        .add(&mut rng, &clock, "octocat".to_owned())
        .await
        .unwrap();
    drop(repo);

    // Saved writes are visible to the next unit of work
    let mut repo = factory.create().await.unwrap();
    assert!(
        repo.bounty()
            .list_for_username("octocat")
            .await
            .unwrap()
            .is_empty()
    );
    repo.github_link()
        .upsert_pending(&mut rng, &clock, "u1".to_owned(), "octocat".to_owned())
        .await
        .unwrap();
    repo.save().await.unwrap();

    let mut repo = factory.create().await.unwrap();
    assert!(repo.github_link().find_by_user_id("u1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_boxed_errors_keep_their_cause() {
    let factory = MemoryRepositoryFactory::new();
    let mut rng = ChaChaRng::seed_from_u64(42);
    let clock = MockClock::default();

    let mut repo = factory.create().await.unwrap();
    repo.github_link()
        .upsert_pending(&mut rng, &clock, "u1".to_owned(), "octocat".to_owned())
        .await
        .unwrap();

    let err = repo
        .github_link()
        .upsert_pending(&mut rng, &clock, "u2".to_owned(), "octocat".to_owned())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "duplicate value for unique column github_links.username"
    );
}

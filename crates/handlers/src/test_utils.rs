// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
};

use axum::{
    body::{Bytes, HttpBody},
    extract::{FromRef, FromRequestParts},
    http::{HeaderName, Request, Response, StatusCode, header::CONTENT_TYPE},
};
use futures_util::future::BoxFuture;
use ghlink_data_model::{BoxClock, BoxRng, BountyRecord, Clock, clock::MockClock};
use ghlink_session::{Authenticator, CallerSession, MockAuthenticator, SessionUser};
use ghlink_storage::{
    BoxRepository, BoxRepositoryFactory, Repository, RepositoryAccess, RepositoryError,
    RepositoryFactory, RepositoryTransaction, bounty::BountyRepository,
    github_link::GithubLinkRepository,
};
use ghlink_storage_memory::MemoryRepositoryFactory;
use headers::{Authorization, ContentType, HeaderMapExt};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaChaRng;
use serde::{Serialize, de::DeserializeOwned};
use tower::{Service, ServiceExt};
use ulid::Ulid;

pub(crate) const SESSION_COOKIE: &str = "next-auth.session-token";

/// Setup tracing for tests.
#[allow(unused_must_use)]
pub(crate) fn setup() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

#[derive(Clone)]
pub(crate) struct TestState {
    pub memory: MemoryRepositoryFactory,
    pub repository_factory: BoxRepositoryFactory,
    pub sessions: Arc<MockAuthenticator>,
    pub authenticator: Arc<dyn Authenticator>,
    pub clock: Arc<MockClock>,
    pub rng: Arc<Mutex<ChaChaRng>>,
}

impl TestState {
    /// Create a new test state, backed by an empty in-memory store
    pub fn new() -> Self {
        let memory = MemoryRepositoryFactory::new();
        let sessions = Arc::new(MockAuthenticator::new(SESSION_COOKIE));
        Self {
            repository_factory: memory.clone().boxed(),
            memory,
            authenticator: sessions.clone(),
            sessions,
            clock: Arc::new(MockClock::default()),
            rng: Arc::new(Mutex::new(ChaChaRng::seed_from_u64(42))),
        }
    }

    /// Make every bounty operation fail, while link requests still work on the
    /// same store
    pub fn with_failing_bounties(mut self) -> Self {
        self.repository_factory = Arc::new(FailingBountiesFactory {
            inner: self.memory.clone(),
        });
        self
    }

    /// Make the store refuse every unit of work
    pub fn with_unreachable_store(mut self) -> Self {
        self.repository_factory = Arc::new(UnreachableFactory);
        self
    }

    /// Authenticate callers with the given authenticator instead of the
    /// in-memory sessions
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Register a session for the given user, and return its token
    pub async fn login(&self, user_id: &str) -> String {
        let token = format!("token-{user_id}");
        let session = CallerSession::for_user(SessionUser {
            id: Some(user_id.to_owned()),
            name: Some(format!("User {user_id}")),
            ..SessionUser::default()
        });
        self.sessions.add_session(&token, session).await;
        token
    }

    pub async fn request<B>(&self, request: Request<B>) -> Response<String>
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        <B as HttpBody>::Error: std::error::Error + Send + Sync,
        B::Error: std::error::Error + Send + Sync,
        B::Data: Send,
    {
        let app = crate::healthcheck_router()
            .merge(crate::github_link_router())
            .with_state(self.clone())
            .into_service();

        let Ok(mut service) = app.ready_oneshot().await;
        let Ok(response) = service.call(request).await;

        let (parts, body) = response.into_parts();

        // This could actually fail, but do we really care about that?
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("Failed to read response body");
        let body = std::str::from_utf8(&body)
            .expect("Response body is not valid UTF-8")
            .to_owned();

        Response::from_parts(parts, body)
    }

    /// Start a new unit of work on the underlying store, regardless of the
    /// failures injected in the request path
    pub async fn repository(&self) -> BoxRepository {
        self.memory.begin().await.boxed()
    }

    /// Seed a bounty filed against the given GitHub username
    pub async fn add_bounty(&self, username: &str) -> BountyRecord {
        let mut rng = self.rng();
        let mut repo = self.repository().await;
        let bounty = repo
            .bounty()
            .add(&mut rng, &self.clock, username.to_owned())
            .await
            .unwrap();
        repo.save().await.unwrap();
        bounty
    }

    /// Returns a new random number generator.
    ///
    /// # Panics
    ///
    /// Panics if the RNG is already locked.
    pub fn rng(&self) -> ChaChaRng {
        let mut parent_rng = self.rng.try_lock().expect("Failed to lock RNG");
        ChaChaRng::from_rng(&mut *parent_rng).unwrap()
    }
}

impl FromRef<TestState> for BoxRepositoryFactory {
    fn from_ref(input: &TestState) -> Self {
        input.repository_factory.clone()
    }
}

impl FromRef<TestState> for Arc<dyn Authenticator> {
    fn from_ref(input: &TestState) -> Self {
        input.authenticator.clone()
    }
}

impl FromRequestParts<TestState> for BoxClock {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        state: &TestState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Box::new(state.clock.clone()))
    }
}

impl FromRequestParts<TestState> for BoxRng {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        state: &TestState,
    ) -> Result<Self, Self::Rejection> {
        let mut parent_rng = state.rng.lock().expect("Failed to lock RNG");
        let rng = ChaChaRng::from_rng(&mut *parent_rng).expect("Failed to seed RNG");
        Ok(Box::new(rng))
    }
}

fn injected_failure(what: &str) -> RepositoryError {
    RepositoryError::from_error(std::io::Error::other(format!("{what} is unavailable")))
}

struct UnreachableFactory;

#[async_trait::async_trait]
impl RepositoryFactory for UnreachableFactory {
    async fn create(&self) -> Result<BoxRepository, RepositoryError> {
        Err(injected_failure("the store"))
    }
}

struct FailingBountiesFactory {
    inner: MemoryRepositoryFactory,
}

#[async_trait::async_trait]
impl RepositoryFactory for FailingBountiesFactory {
    async fn create(&self) -> Result<BoxRepository, RepositoryError> {
        let inner = self.inner.begin().await.boxed();
        Ok(Box::new(FailingBounties { inner }))
    }
}

/// A repository where link requests work, but every bounty operation fails
struct FailingBounties {
    inner: BoxRepository,
}

impl Repository<RepositoryError> for FailingBounties {}

impl RepositoryAccess for FailingBounties {
    type Error = RepositoryError;

    fn github_link<'c>(
        &'c mut self,
    ) -> Box<dyn GithubLinkRepository<Error = Self::Error> + 'c> {
        self.inner.github_link()
    }

    fn bounty<'c>(&'c mut self) -> Box<dyn BountyRepository<Error = Self::Error> + 'c> {
        Box::new(FailingBountyRepository)
    }
}

impl RepositoryTransaction for FailingBounties {
    type Error = RepositoryError;

    fn save(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        self.inner.save()
    }

    fn cancel(self: Box<Self>) -> BoxFuture<'static, Result<(), Self::Error>> {
        self.inner.cancel()
    }
}

struct FailingBountyRepository;

#[async_trait::async_trait]
impl BountyRepository for FailingBountyRepository {
    type Error = RepositoryError;

    async fn lookup(&mut self, _id: Ulid) -> Result<Option<BountyRecord>, Self::Error> {
        Err(injected_failure("the bounties table"))
    }

    async fn add(
        &mut self,
        _rng: &mut (dyn RngCore + Send),
        _clock: &dyn Clock,
        _username: String,
    ) -> Result<BountyRecord, Self::Error> {
        Err(injected_failure("the bounties table"))
    }

    async fn list_for_username(
        &mut self,
        _username: &str,
    ) -> Result<Vec<BountyRecord>, Self::Error> {
        Err(injected_failure("the bounties table"))
    }

    async fn set_github_user_for_username(
        &mut self,
        _username: &str,
        _github_user_id: &str,
    ) -> Result<usize, Self::Error> {
        Err(injected_failure("the bounties table"))
    }
}

pub(crate) trait RequestBuilderExt {
    /// Builds the request with the given JSON value as body.
    fn json<T: Serialize>(self, body: T) -> Request<String>;

    /// Builds the request with the given raw string as a JSON body.
    fn raw_json(self, body: &str) -> Request<String>;

    /// Sets the request Authorization header to the given bearer token.
    fn bearer(self, token: &str) -> Self;

    /// Sets the session cookie to the given token.
    fn session_cookie(self, token: &str) -> Self;

    /// Builds the request with an empty body.
    fn empty(self) -> Request<String>;
}

impl RequestBuilderExt for axum::http::request::Builder {
    fn json<T: Serialize>(self, body: T) -> Request<String> {
        self.raw_json(&serde_json::to_string(&body).unwrap())
    }

    fn raw_json(mut self, body: &str) -> Request<String> {
        self.headers_mut()
            .unwrap()
            .typed_insert(ContentType::json());

        self.body(body.to_owned()).unwrap()
    }

    fn bearer(mut self, token: &str) -> Self {
        self.headers_mut()
            .unwrap()
            .typed_insert(Authorization::bearer(token).unwrap());
        self
    }

    fn session_cookie(self, token: &str) -> Self {
        self.header(
            axum::http::header::COOKIE,
            format!("{SESSION_COOKIE}={token}"),
        )
    }

    fn empty(self) -> Request<String> {
        self.body(String::new()).unwrap()
    }
}

pub(crate) trait ResponseExt {
    /// Asserts that the response has the given status code.
    ///
    /// # Panics
    ///
    /// Panics if the response has a different status code.
    fn assert_status(&self, status: StatusCode);

    /// Asserts that the response has the given header value.
    ///
    /// # Panics
    ///
    /// Panics if the response does not have the given header or if the header
    /// value does not match.
    fn assert_header_value(&self, header: HeaderName, value: &str);

    /// Get the response body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the response is missing the `Content-Type: application/json`,
    /// or if the body is not valid JSON.
    fn json<T: DeserializeOwned>(&self) -> T;
}

impl ResponseExt for Response<String> {
    #[track_caller]
    fn assert_status(&self, status: StatusCode) {
        assert_eq!(
            self.status(),
            status,
            "HTTP status code mismatch: got {}, expected {}. Body: {}",
            self.status(),
            status,
            self.body()
        );
    }

    #[track_caller]
    fn assert_header_value(&self, header: HeaderName, value: &str) {
        let actual_value = self
            .headers()
            .get(&header)
            .unwrap_or_else(|| panic!("Missing header {header}"));

        assert_eq!(
            actual_value,
            value,
            "Header mismatch: got {:?}, expected {:?}",
            self.headers().get(header),
            value
        );
    }

    #[track_caller]
    fn json<T: DeserializeOwned>(&self) -> T {
        self.assert_header_value(CONTENT_TYPE, "application/json");
        serde_json::from_str(self.body()).expect("JSON deserialization failed")
    }
}

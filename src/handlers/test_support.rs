//! In-process harness for handler tests: a router over a `MemoryStore`.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    models::{Account, CreateAccountParams, CreateUserParams, User},
    random::RandomGenerator,
    router::{AppState, build_router},
    services::transfer_service::OverdraftPolicy,
    store::{MemoryStore, Queries, Store},
    token::TokenMaker,
};

pub(crate) struct TestApp {
    pub store: MemoryStore,
    pub rng: RandomGenerator,
    token_maker: TokenMaker,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_overdraft_policy(OverdraftPolicy::default())
    }

    pub fn with_overdraft_policy(policy: OverdraftPolicy) -> Self {
        let rng = RandomGenerator::new();
        let store = MemoryStore::new();
        let token_maker = TokenMaker::new(&rng.string(32)).unwrap();
        let state =
            AppState::new(store.clone(), token_maker.clone()).with_overdraft_policy(policy);

        Self {
            router: build_router(state),
            store,
            rng,
            token_maker,
        }
    }

    pub async fn create_user(&self) -> User {
        let mut conn = self.store.conn().await.unwrap();
        conn.create_user(CreateUserParams {
            username: self.rng.owner(),
            hashed_password: self.rng.string(16),
            full_name: self.rng.owner(),
            email: self.rng.email(),
        })
        .await
        .unwrap()
    }

    pub async fn create_account(&self, owner: &str, balance: i64, currency: &str) -> Account {
        let mut conn = self.store.conn().await.unwrap();
        conn.create_account(CreateAccountParams {
            owner: owner.to_string(),
            balance,
            currency: currency.to_string(),
        })
        .await
        .unwrap()
    }

    pub async fn balance(&self, account_id: i64) -> i64 {
        let mut conn = self.store.conn().await.unwrap();
        conn.get_account(account_id).await.unwrap().balance
    }

    pub fn token(&self, username: &str, duration: Duration) -> String {
        self.token_maker.create_token(username, duration).unwrap().0
    }

    /// Send a request, authenticated as `username` when given.
    ///
    /// Returns the status and the JSON body (`Null` when the body is empty).
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        username: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(username) = username {
            let token = self.token(username, Duration::minutes(1));
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    /// Send a prepared request through the router.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

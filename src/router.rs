//! Shared handler state and route table.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers, middleware, services::transfer_service::OverdraftPolicy, store::Store,
    token::TokenMaker,
};

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState<S> {
    pub store: S,
    pub token_maker: Arc<TokenMaker>,
    pub overdraft_policy: OverdraftPolicy,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, token_maker: TokenMaker) -> Self {
        Self {
            store,
            token_maker: Arc::new(token_maker),
            overdraft_policy: OverdraftPolicy::default(),
        }
    }

    pub fn with_overdraft_policy(mut self, policy: OverdraftPolicy) -> Self {
        self.overdraft_policy = policy;
        self
    }
}

/// Build the HTTP router.
///
/// `/health` is public; everything else requires a bearer token.
pub fn build_router<S: Store>(state: AppState<S>) -> Router {
    let authenticated_routes = Router::new()
        .route(
            "/accounts",
            post(handlers::accounts::create_account::<S>)
                .get(handlers::accounts::list_accounts::<S>)
                .put(handlers::accounts::update_account::<S>),
        )
        .route(
            "/accounts/{id}",
            get(handlers::accounts::get_account::<S>)
                .delete(handlers::accounts::delete_account::<S>),
        )
        .route("/transfer", post(handlers::transfers::create_transfer::<S>))
        .route_layer(axum_middleware::from_fn_with_state(
            state.token_maker.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check::<S>))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

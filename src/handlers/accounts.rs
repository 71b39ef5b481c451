//! Account management HTTP handlers.
//!
//! This module implements the account-related API endpoints:
//! - POST /accounts - Create new account
//! - GET /accounts/{id} - Get account by ID
//! - GET /accounts - List the caller's accounts
//! - PUT /accounts - Overwrite an account balance
//! - DELETE /accounts/{id} - Delete an account

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    currency::is_supported_currency,
    error::AppError,
    models::account::{
        Account, CreateAccountParams, CreateAccountRequest, ListAccountsParams, ListAccountsQuery,
        UpdateAccountParams, UpdateAccountRequest,
    },
    router::AppState,
    store::{Queries, Store, StoreError},
    token::Payload,
};

/// Largest page `GET /accounts` will return.
const MAX_PAGE_SIZE: i64 = 100;

/// Create a new account.
///
/// # Endpoint
///
/// `POST /accounts`
///
/// # Request Body
///
/// ```json
/// {
///   "currency": "USD"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: Returns the created account
/// - **Error (400)**: Unsupported currency
/// - **Error (401)**: Invalid token, or the token's user no longer exists
/// - **Error (500)**: Database error
///
/// The owner is taken from the token and the balance starts at 0.
pub async fn create_account<S: Store>(
    State(state): State<AppState<S>>,
    Extension(auth): Extension<Payload>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    if !is_supported_currency(&request.currency) {
        return Err(AppError::InvalidRequest(format!(
            "unsupported currency: {}",
            request.currency
        )));
    }

    let mut conn = state.store.conn().await?;
    let account = conn
        .create_account(CreateAccountParams {
            owner: auth.username,
            balance: 0,
            currency: request.currency,
        })
        .await
        .map_err(|err| match err {
            // The owner foreign key failed: the token outlived its user.
            StoreError::NotFound => AppError::Unauthorized("user does not exist".into()),
            other => other.into(),
        })?;

    Ok(Json(account))
}

/// Get a specific account by ID.
///
/// # Response
///
/// - **Success (200 OK)**: Returns account details
/// - **Error (400)**: Non-positive id
/// - **Error (404)**: Account not found
/// - **Error (401)**: Account belongs to another user
pub async fn get_account<S: Store>(
    State(state): State<AppState<S>>,
    Extension(auth): Extension<Payload>,
    Path(account_id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    if account_id < 1 {
        return Err(AppError::InvalidRequest("id must be at least 1".into()));
    }

    let mut conn = state.store.conn().await?;
    let account = conn.get_account(account_id).await?;

    if account.owner != auth.username {
        return Err(AppError::Unauthorized(
            "account doesn't belong to the authenticated user".into(),
        ));
    }

    Ok(Json(account))
}

/// List the authenticated user's accounts.
///
/// # Query Parameters
///
/// - `limit` - page size, 1 to 100 (default 10)
/// - `offset` - rows to skip (default 0)
///
/// # Ordering
///
/// Accounts are returned in ascending id order.
pub async fn list_accounts<S: Store>(
    State(state): State<AppState<S>>,
    Extension(auth): Extension<Payload>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<Vec<Account>>, AppError> {
    if !(1..=MAX_PAGE_SIZE).contains(&query.limit) || query.offset < 0 {
        return Err(AppError::InvalidRequest(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE} and offset must not be negative"
        )));
    }

    let mut conn = state.store.conn().await?;
    let accounts = conn
        .list_accounts(ListAccountsParams {
            owner: auth.username,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;

    Ok(Json(accounts))
}

/// Overwrite the balance of an account owned by the caller.
///
/// # Endpoint
///
/// `PUT /accounts`
///
/// # Request Body
///
/// ```json
/// {
///   "id": 1,
///   "balance": 500
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: Returns the updated account
/// - **Error (400)**: Non-positive id
/// - **Error (404)**: Account not found
/// - **Error (401)**: Account belongs to another user
/// - **Error (500)**: Database error
///
/// No ledger entry is written, so the balance stops matching the sum of the
/// account's entries. Transfers go through `POST /transfer` instead.
pub async fn update_account<S: Store>(
    State(state): State<AppState<S>>,
    Extension(auth): Extension<Payload>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    if request.id < 1 {
        return Err(AppError::InvalidRequest("id must be at least 1".into()));
    }

    let mut conn = state.store.conn().await?;
    let account = conn.get_account(request.id).await?;

    if account.owner != auth.username {
        return Err(AppError::Unauthorized(
            "account doesn't belong to the authenticated user".into(),
        ));
    }

    let updated = conn
        .update_account(UpdateAccountParams {
            id: account.id,
            balance: request.balance,
        })
        .await?;

    Ok(Json(updated))
}

/// Delete an account owned by the caller.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (400)**: Non-positive id
/// - **Error (404)**: Account not found
/// - **Error (401)**: Account belongs to another user
/// - **Error (500)**: The account still has ledger history
pub async fn delete_account<S: Store>(
    State(state): State<AppState<S>>,
    Extension(auth): Extension<Payload>,
    Path(account_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if account_id < 1 {
        return Err(AppError::InvalidRequest("id must be at least 1".into()));
    }

    let mut conn = state.store.conn().await?;
    let account = conn.get_account(account_id).await?;

    if account.owner != auth.username {
        return Err(AppError::Unauthorized(
            "account doesn't belong to the authenticated user".into(),
        ));
    }

    conn.delete_account(account.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::test_support::TestApp;
    use crate::models::Account;

    #[tokio::test]
    async fn create_account_for_token_user() {
        let app = TestApp::new();
        let user = app.create_user().await;
        let body = json!({ "currency": "EUR" });

        let (status, body) = app
            .request("POST", "/accounts", Some(&user.username), Some(body))
            .await;

        assert_eq!(status, StatusCode::OK);
        let account: Account = serde_json::from_value(body).unwrap();
        assert_eq!(account.owner, user.username);
        assert_eq!(account.currency, "EUR");
        assert_eq!(account.balance, 0);
    }

    #[tokio::test]
    async fn create_account_rejects_unknown_currency() {
        let app = TestApp::new();
        let user = app.create_user().await;
        let body = json!({ "currency": "XYZ" });

        let (status, _) = app
            .request("POST", "/accounts", Some(&user.username), Some(body))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_account_requires_token() {
        let app = TestApp::new();
        let body = json!({ "currency": "USD" });

        let (status, _) = app.request("POST", "/accounts", None, Some(body)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_account_cases() {
        let app = TestApp::new();
        let owner = app.create_user().await;
        let stranger = app.create_user().await;
        let account = app.create_account(&owner.username, 100, "USD").await;
        let owner_name = Some(owner.username.as_str());

        let path = format!("/accounts/{}", account.id);

        let (status, body) = app.request("GET", &path, owner_name, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_value::<Account>(body).unwrap(), account);

        let (status, _) = app
            .request("GET", &path, Some(&stranger.username), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.request("GET", &path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let missing = format!("/accounts/{}", account.id + 100);
        let (status, body) = app.request("GET", &missing, owner_name, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");

        let (status, _) = app.request("GET", "/accounts/0", owner_name, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_accounts_only_returns_own() {
        let app = TestApp::new();
        let owner = app.create_user().await;
        let other = app.create_user().await;
        let first = app.create_account(&owner.username, 10, "USD").await;
        let second = app.create_account(&owner.username, 20, "EUR").await;
        app.create_account(&other.username, 30, "USD").await;
        let owner_name = Some(owner.username.as_str());

        let (status, body) = app
            .request("GET", "/accounts?limit=5&offset=0", owner_name, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let accounts: Vec<Account> = serde_json::from_value(body).unwrap();
        assert_eq!(accounts, vec![first, second.clone()]);

        let (status, body) = app
            .request("GET", "/accounts?limit=5&offset=1", owner_name, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let accounts: Vec<Account> = serde_json::from_value(body).unwrap();
        assert_eq!(accounts, vec![second]);

        let (status, _) = app
            .request("GET", "/accounts?limit=0", owner_name, None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_account_ok() {
        let app = TestApp::new();
        let owner = app.create_user().await;
        let account = app.create_account(&owner.username, 100, "USD").await;
        let body = json!({ "id": account.id, "balance": 110 });

        let (status, body) = app
            .request("PUT", "/accounts", Some(&owner.username), Some(body))
            .await;

        assert_eq!(status, StatusCode::OK);
        let updated: Account = serde_json::from_value(body).unwrap();
        let expected = Account {
            balance: 110,
            ..account
        };
        assert_eq!(updated, expected);
        assert_eq!(app.balance(updated.id).await, 110);
    }

    #[tokio::test]
    async fn update_account_not_found() {
        let app = TestApp::new();
        let owner = app.create_user().await;
        let account = app.create_account(&owner.username, 100, "USD").await;
        let body = json!({ "id": account.id + 100, "balance": 110 });

        let (status, _) = app
            .request("PUT", "/accounts", Some(&owner.username), Some(body))
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_account_bad_request() {
        let app = TestApp::new();
        let owner = app.create_user().await;
        let account = app.create_account(&owner.username, 100, "USD").await;
        let body = json!({ "id": 0, "balance": 110 });

        let (status, _) = app
            .request("PUT", "/accounts", Some(&owner.username), Some(body))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.balance(account.id).await, 100);
    }

    #[tokio::test]
    async fn update_account_internal_error() {
        let app = TestApp::new();
        let owner = app.create_user().await;
        let account = app.create_account(&owner.username, 100, "USD").await;
        let body = json!({ "id": account.id, "balance": 110 });
        app.store.fail_on("update_account", 0);

        let (status, body) = app
            .request("PUT", "/accounts", Some(&owner.username), Some(body))
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(app.balance(account.id).await, 100);
    }

    #[tokio::test]
    async fn update_account_of_someone_else() {
        let app = TestApp::new();
        let owner = app.create_user().await;
        let stranger = app.create_user().await;
        let account = app.create_account(&owner.username, 100, "USD").await;
        let body = json!({ "id": account.id, "balance": 0 });

        let (status, _) = app
            .request("PUT", "/accounts", Some(&stranger.username), Some(body))
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(app.balance(account.id).await, 100);
    }

    #[tokio::test]
    async fn delete_account_by_owner_only() {
        let app = TestApp::new();
        let owner = app.create_user().await;
        let stranger = app.create_user().await;
        let account = app.create_account(&owner.username, 0, "USD").await;
        let owner_name = Some(owner.username.as_str());
        let path = format!("/accounts/{}", account.id);

        let (status, _) = app
            .request("DELETE", &path, Some(&stranger.username), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.request("DELETE", &path, owner_name, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.request("GET", &path, owner_name, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_account_rejects_non_positive_id() {
        let app = TestApp::new();
        let owner = app.create_user().await;
        let owner_name = Some(owner.username.as_str());

        for path in ["/accounts/0", "/accounts/-3"] {
            let (status, body) = app.request("DELETE", path, owner_name, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "invalid_request");
        }
    }
}

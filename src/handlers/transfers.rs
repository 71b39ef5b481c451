//! Transfer HTTP handler.
//!
//! Validates the request against both accounts and hands the money movement
//! to the transfer engine, which runs it as one transaction.

use axum::{Extension, Json, extract::State};

use crate::{
    currency::is_supported_currency,
    error::AppError,
    models::{Account, TransferRequest, TransferTxParams, TransferTxResult},
    router::AppState,
    services::transfer_service,
    store::{Queries, Store},
    token::Payload,
};

/// Move money between two accounts.
///
/// # Endpoint
///
/// `POST /transfer`
///
/// # Response
///
/// - **Success (200 OK)**: The transfer, both entries, and both updated accounts
/// - **Error (400)**: Invalid body, or a currency mismatch on either account
/// - **Error (401)**: The source account belongs to someone else
/// - **Error (404)**: Either account does not exist
/// - **Error (422)**: Overdraft rejected by policy
///
/// The account checks below are advisory and read outside the transaction;
/// the engine re-reads both balances under row locks.
pub async fn create_transfer<S: Store>(
    State(state): State<AppState<S>>,
    Extension(auth): Extension<Payload>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferTxResult>, AppError> {
    validate_request(&request)?;

    let mut conn = state.store.conn().await?;
    let from_account = valid_account(&mut conn, request.from_account_id, &request.currency).await?;
    if from_account.owner != auth.username {
        return Err(AppError::Unauthorized(
            "from account doesn't belong to the authenticated user".into(),
        ));
    }
    valid_account(&mut conn, request.to_account_id, &request.currency).await?;
    drop(conn);

    let params = TransferTxParams {
        from_account_id: request.from_account_id,
        to_account_id: request.to_account_id,
        amount: request.amount,
    };
    let result =
        transfer_service::transfer_tx_with_policy(&state.store, params, state.overdraft_policy)
            .await?;

    Ok(Json(result))
}

fn validate_request(request: &TransferRequest) -> Result<(), AppError> {
    if request.from_account_id < 1 || request.to_account_id < 1 {
        return Err(AppError::InvalidRequest("account ids must be at least 1".into()));
    }
    if request.from_account_id == request.to_account_id {
        return Err(AppError::InvalidRequest("cannot transfer to the same account".into()));
    }
    if request.amount <= 0 {
        return Err(AppError::InvalidRequest("amount must be greater than 0".into()));
    }
    if !is_supported_currency(&request.currency) {
        return Err(AppError::InvalidRequest(format!(
            "unsupported currency: {}",
            request.currency
        )));
    }
    Ok(())
}

/// Load `account_id` and make sure it holds `currency`.
async fn valid_account<Q: Queries>(
    conn: &mut Q,
    account_id: i64,
    currency: &str,
) -> Result<Account, AppError> {
    let account = conn.get_account(account_id).await?;
    if account.currency != currency {
        return Err(AppError::InvalidRequest(format!(
            "account [{}] currency mismatch: {} vs {}",
            account.id, account.currency, currency
        )));
    }
    Ok(account)
}

//! Payment history and processor configuration handlers.
//!
//! Charges themselves run through the purchase pipeline; these routes
//! cover the read side: a customer's own history, the admin transaction
//! ledger, and the publishable processor key the browser needs to mount
//! the card form.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::api::Transaction;
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireUser};
use crate::state::AppState;

// =============================================================================
// Response Types
// =============================================================================

/// Client-side processor configuration. Publishable key only.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfig {
    pub public_key: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// List the signed-in user's payments.
///
/// GET /api/payments/mine
pub async fn my_payments(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>> {
    let payments = state
        .backend()
        .get_payment_history(&user.access_token, Some(&user.email))
        .await?;

    Ok(Json(payments))
}

/// List every recorded transaction.
///
/// GET /api/admin/transactions
pub async fn all_transactions(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Transaction>>> {
    let transactions = state
        .backend()
        .get_payment_history(&admin.access_token, None)
        .await?;

    Ok(Json(transactions))
}

/// Expose the processor's publishable key.
///
/// GET /api/payments/config
pub async fn payment_config(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
) -> Json<PaymentConfig> {
    Json(PaymentConfig {
        public_key: state.config().payment_public_key.clone(),
    })
}

//! Inbound payment-provider webhooks.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use tollgate_core::webhook::{verify_signature, PaymentEvent, WebhookAction, SIGNATURE_HEADER};
use tollgate_db::models::user::UpdateSubscription;
use tollgate_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/v1/webhooks/payments
///
/// The body is verified against the raw bytes before it is parsed. Events
/// for unknown users are acknowledged so the provider stops retrying.
pub async fn payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let secret = state
        .config
        .payments
        .webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::InternalError("Webhook secret is not configured".into()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature".into()))?;

    if !verify_signature(secret.as_bytes(), &body, signature) {
        tracing::warn!("Webhook rejected: invalid signature");
        return Err(AppError::unauthorized("Invalid signature"));
    }

    let event = PaymentEvent::parse(&body)?;
    let event_name = event.meta.event_name;

    match event.action()? {
        WebhookAction::UpdateSubscription { user_id, change } => {
            let input = UpdateSubscription {
                status: change.status,
                product_id: change.product_id,
                variant_id: change.variant_id,
            };
            let updated = UserRepo::update_subscription(&state.pool, user_id, &input).await?;
            state.subscription_cache.invalidate(user_id).await;
            if updated {
                tracing::info!(
                    user_id,
                    event = ?event_name,
                    status = %input.status,
                    "Subscription updated",
                );
            } else {
                tracing::warn!(user_id, event = ?event_name, "Webhook names an unknown user");
            }
        }
        WebhookAction::InvalidateCache { user_id } => {
            state.subscription_cache.invalidate(user_id).await;
            tracing::info!(user_id, event = ?event_name, "Subscription cache invalidated");
        }
        WebhookAction::Ignore => {
            tracing::debug!(event = ?event_name, "Webhook event ignored");
        }
    }

    Ok(StatusCode::OK)
}

//! HTTP handlers for billing endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;
use uuid::Uuid;

use crate::application::handlers::{
    HandleGatewayWebhookCommand, HandleGatewayWebhookHandler, RequestCancellationCommand,
    RequestCancellationHandler, StartCheckoutCommand, StartCheckoutHandler,
};
use crate::domain::foundation::{DomainError, ErrorCode, ProgramId, SubscriptionId, UserId};
use crate::ports::SubscriptionStore;

use super::dto::{
    CancelSubscriptionBody, CheckoutResponse, ErrorResponse, StartCheckoutBody,
    SubscriptionSummary, WebhookAck,
};

/// Signature header carried on gateway webhook deliveries.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Application state for billing endpoints.
#[derive(Clone)]
pub struct BillingAppState {
    pub checkout: Arc<StartCheckoutHandler>,
    pub cancellation: Arc<RequestCancellationHandler>,
    pub webhook: Arc<HandleGatewayWebhookHandler>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
}

/// `DomainError` as an HTTP response.
pub struct ApiError(DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat
            | ErrorCode::InvalidWebhookSignature => StatusCode::BAD_REQUEST,

            ErrorCode::ProgramNotFound
            | ErrorCode::SubscriptionNotFound
            | ErrorCode::UnknownSubscriptionReference => StatusCode::NOT_FOUND,

            ErrorCode::ProgramInactive
            | ErrorCode::AlreadySubscribed
            | ErrorCode::OnboardingIncomplete
            | ErrorCode::CapacityExceeded
            | ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,

            ErrorCode::Unauthorized | ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::GatewayUnavailable => StatusCode::BAD_GATEWAY,

            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse {
            code: self.0.code.to_string(),
            message: self.0.message,
        };
        (status, Json(body)).into_response()
    }
}

fn parse_user_id(value: &str) -> Result<UserId, ApiError> {
    UserId::new(value).map_err(|e| ApiError(e.into()))
}

fn parse_program_id(value: &str) -> Result<ProgramId, ApiError> {
    Uuid::parse_str(value)
        .map(ProgramId::from_uuid)
        .map_err(|_| {
            ApiError(DomainError::new(
                ErrorCode::InvalidFormat,
                "program_id must be a UUID",
            ))
        })
}

/// Start a checkout for a program.
///
/// POST /api/billing/checkout
pub async fn start_checkout(
    State(state): State<BillingAppState>,
    Json(body): Json<StartCheckoutBody>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = StartCheckoutCommand {
        client_id: parse_user_id(&body.client_id)?,
        program_id: parse_program_id(&body.program_id)?,
    };

    let result = state.checkout.handle(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            subscription_id: result.subscription_id.to_string(),
            checkout_session_id: result.checkout_session_id,
            checkout_url: result.checkout_url,
        }),
    ))
}

/// Fetch a subscription summary.
///
/// GET /api/billing/subscriptions/:id
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubscriptionSummary>, ApiError> {
    let id = SubscriptionId::from_uuid(id);
    let subscription = state
        .subscriptions
        .get(id)
        .await
        .map_err(ApiError)?
        .ok_or_else(|| {
            ApiError(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription {} not found", id),
            ))
        })?;

    Ok(Json(SubscriptionSummary::from(&subscription)))
}

/// Request cancellation, at period end or immediately.
///
/// POST /api/billing/subscriptions/:id/cancel
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CancelSubscriptionBody>,
) -> Result<Json<SubscriptionSummary>, ApiError> {
    let cmd = RequestCancellationCommand {
        subscription_id: SubscriptionId::from_uuid(id),
        requested_by: parse_user_id(&body.requested_by)?,
        immediate: body.immediate,
    };

    let subscription = state.cancellation.handle(cmd).await?;
    Ok(Json(SubscriptionSummary::from(&subscription)))
}

/// Receive a payment gateway webhook.
///
/// POST /api/billing/webhooks/payment
///
/// The body must stay raw and unmodified for signature verification. A 200
/// goes out only after the authoritative state change is committed.
pub async fn handle_payment_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                code: "INVALID_WEBHOOK_SIGNATURE".to_string(),
                message: format!("Missing {} header", SIGNATURE_HEADER),
            }),
        )
            .into_response();
    };

    let cmd = HandleGatewayWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    match state.webhook.handle(cmd).await {
        Ok(_) => (StatusCode::OK, Json(WebhookAck { received: true })).into_response(),
        Err(err) => {
            warn!(error = %err, "webhook delivery rejected");
            (
                err.status_code(),
                Json(ErrorResponse {
                    code: "WEBHOOK_REJECTED".to_string(),
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

// HTTP handlers for checkout and order management

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::deals::CheckoutEvaluation;
use crate::orders::{
    CheckoutRequest, OrderError, OrderResponse, OrderStatus, UpdatePaymentRequest,
    UpdateStatusRequest,
};
use crate::AppState;

/// Query parameters for order history
#[derive(Debug, Deserialize)]
pub struct OrderHistoryQuery {
    pub customer_id: i32,
    /// Optional status filter
    pub status: Option<OrderStatus>,
}

/// Handler for POST /api/orders
/// Checks out a cart: evaluates deals, records usage, persists the order
pub async fn checkout_handler(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let response = state.order_service.checkout(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for POST /api/orders/preview
/// Evaluates deals for a cart without persisting or consuming usage
pub async fn preview_handler(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutEvaluation>, OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let evaluation = state.order_service.preview(request).await?;

    Ok(Json(evaluation))
}

/// Handler for GET /api/orders
/// Order history for a customer
pub async fn order_history_handler(
    State(state): State<AppState>,
    Query(query): Query<OrderHistoryQuery>,
) -> Result<Json<Vec<OrderResponse>>, OrderError> {
    let orders = state
        .order_service
        .get_customer_orders(query.customer_id, query.status)
        .await?;

    Ok(Json(orders))
}

/// Handler for GET /api/orders/{order_id}
pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state.order_service.get_order_by_id(order_id).await?;

    Ok(Json(order))
}

/// Handler for PATCH /api/orders/{order_id}/status
pub async fn update_order_status_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let order = state
        .order_service
        .update_order_status(order_id, request.status)
        .await?;

    Ok(Json(order))
}

/// Handler for PATCH /api/orders/{order_id}/payment
pub async fn update_payment_status_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let order = state
        .order_service
        .update_payment_status(order_id, request.payment_status)
        .await?;

    Ok(Json(order))
}

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{AdvanceOrderRequest, AvailableDeliveryList, OrderList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    services::driver_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/available", get(list_available))
        .route("/active", get(list_active))
        .route("/deliveries", get(list_deliveries))
        .route("/orders/{id}/claim", post(claim))
        .route("/orders/{id}/advance", post(advance_delivery))
}

#[utoipa::path(
    get,
    path = "/api/driver/available",
    responses(
        (status = 200, description = "Unclaimed ready orders, oldest first", body = ApiResponse<AvailableDeliveryList>),
        (status = 403, description = "Not a driver"),
    ),
    security(("bearer_auth" = [])),
    tag = "Driver"
)]
pub async fn list_available(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AvailableDeliveryList>>> {
    let resp = driver_service::list_available(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/driver/orders/{id}/claim",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Delivery claimed; order moves to picked_up", body = ApiResponse<Order>),
        (status = 403, description = "Not a driver"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Another driver claimed it first"),
    ),
    security(("bearer_auth" = [])),
    tag = "Driver"
)]
pub async fn claim(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = driver_service::claim(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/driver/active",
    responses(
        (status = 200, description = "Caller's in-flight deliveries", body = ApiResponse<OrderList>),
        (status = 403, description = "Not a driver"),
    ),
    security(("bearer_auth" = [])),
    tag = "Driver"
)]
pub async fn list_active(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = driver_service::list_active(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/driver/orders/{id}/advance",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = AdvanceOrderRequest,
    responses(
        (status = 200, description = "Delivery advanced one step", body = ApiResponse<Order>),
        (status = 403, description = "Not the assigned driver"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Out-of-sequence transition"),
    ),
    security(("bearer_auth" = [])),
    tag = "Driver"
)]
pub async fn advance_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = driver_service::advance_delivery(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/driver/deliveries",
    responses(
        (status = 200, description = "Caller's delivery history", body = ApiResponse<OrderList>),
        (status = 403, description = "Not a driver"),
    ),
    security(("bearer_auth" = [])),
    tag = "Driver"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = driver_service::list_deliveries(&state, &user).await?;
    Ok(Json(resp))
}

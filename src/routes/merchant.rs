use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{AdvanceOrderRequest, MerchantOrderDetail, MerchantStats, OrderList},
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    dto::shops::{CreateShopRequest, UpdateShopRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Order, Product, Shop},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{merchant_service, product_service, shop_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shop", get(my_shop).post(create_shop).put(update_shop))
        .route("/products", get(list_my_products).post(create_product))
        .route("/products/{id}", put(update_product))
        .route("/products/{id}", delete(delete_product))
        .route("/orders", get(list_shop_orders))
        .route("/orders/{id}", get(get_shop_order))
        .route("/orders/{id}/advance", post(advance_order))
        .route("/stats", get(shop_stats))
}

#[utoipa::path(
    get,
    path = "/api/merchant/shop",
    responses(
        (status = 200, description = "The caller's shop", body = ApiResponse<Shop>),
        (status = 403, description = "Not a merchant"),
        (status = 404, description = "No shop yet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn my_shop(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = shop_service::my_shop(&state.pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/merchant/shop",
    request_body = CreateShopRequest,
    responses(
        (status = 200, description = "Shop created", body = ApiResponse<Shop>),
        (status = 400, description = "Already has a shop"),
        (status = 403, description = "Not a merchant"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn create_shop(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateShopRequest>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = shop_service::create_shop(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/merchant/shop",
    request_body = UpdateShopRequest,
    responses(
        (status = 200, description = "Shop updated", body = ApiResponse<Shop>),
        (status = 403, description = "Not a merchant"),
        (status = 404, description = "No shop yet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn update_shop(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateShopRequest>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = shop_service::update_shop(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/merchant/products",
    responses(
        (status = 200, description = "Products of the caller's shop", body = ApiResponse<ProductList>),
        (status = 403, description = "Not a merchant"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn list_my_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_my_products(&state.pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/merchant/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<Product>),
        (status = 400, description = "Bad request"),
        (status = 403, description = "Not a merchant"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::create_product(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/merchant/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<Product>),
        (status = 403, description = "Not your product"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state.pool, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/merchant/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Not your product"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state.pool, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/merchant/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "Orders placed with the caller's shop", body = ApiResponse<OrderList>),
        (status = 403, description = "Not a merchant"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn list_shop_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = merchant_service::list_shop_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/merchant/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with items, customer, address and history", body = ApiResponse<MerchantOrderDetail>),
        (status = 403, description = "Not your shop's order"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn get_shop_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MerchantOrderDetail>>> {
    let resp = merchant_service::get_shop_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/merchant/orders/{id}/advance",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = AdvanceOrderRequest,
    responses(
        (status = 200, description = "Order advanced one step", body = ApiResponse<Order>),
        (status = 403, description = "Not your shop's order"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Out-of-sequence transition or lost race"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn advance_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = merchant_service::advance_order(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/merchant/stats",
    responses(
        (status = 200, description = "Order counts and delivered revenue", body = ApiResponse<MerchantStats>),
        (status = 403, description = "Not a merchant"),
    ),
    security(("bearer_auth" = [])),
    tag = "Merchant"
)]
pub async fn shop_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MerchantStats>>> {
    let resp = merchant_service::shop_stats(&state, &user).await?;
    Ok(Json(resp))
}

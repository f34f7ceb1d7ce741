use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::shops::{CreateShopRequest, ShopList, UpdateShopRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_merchant},
    models::Shop,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

pub async fn list_shops(pool: &DbPool, pagination: Pagination) -> AppResult<ApiResponse<ShopList>> {
    let (page, limit, offset) = pagination.normalize();
    let items: Vec<Shop> = sqlx::query_as(
        "SELECT * FROM shops WHERE is_active = TRUE ORDER BY name LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shops WHERE is_active = TRUE")
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Shops", ShopList { items }, Some(meta)))
}

pub async fn get_shop(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<Shop>> {
    let shop: Option<Shop> = sqlx::query_as("SELECT * FROM shops WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let shop = match shop {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Shop", shop, None))
}

pub async fn my_shop(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<Shop>> {
    ensure_merchant(user)?;
    let shop: Option<Shop> = sqlx::query_as("SELECT * FROM shops WHERE owner_id = $1")
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;
    let shop = match shop {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Shop", shop, None))
}

pub async fn create_shop(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateShopRequest,
) -> AppResult<ApiResponse<Shop>> {
    ensure_merchant(user)?;
    if payload.name.trim().is_empty() || payload.address.trim().is_empty() {
        return Err(AppError::BadRequest("name and address are required".into()));
    }

    // One shop per merchant.
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM shops WHERE owner_id = $1")
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("You already have a shop".into()));
    }

    let shop: Shop = sqlx::query_as(
        r#"
        INSERT INTO shops (id, owner_id, name, description, address, phone)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.name)
    .bind(payload.description)
    .bind(payload.address)
    .bind(payload.phone)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "shop_create",
        Some("shops"),
        Some(serde_json::json!({ "shop_id": shop.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Shop created",
        shop,
        Some(Meta::empty()),
    ))
}

pub async fn update_shop(
    pool: &DbPool,
    user: &AuthUser,
    payload: UpdateShopRequest,
) -> AppResult<ApiResponse<Shop>> {
    ensure_merchant(user)?;
    let existing: Option<Shop> = sqlx::query_as("SELECT * FROM shops WHERE owner_id = $1")
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;
    let existing = match existing {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let description = payload.description.or(existing.description);
    let address = payload.address.unwrap_or(existing.address);
    let phone = payload.phone.or(existing.phone);
    let is_active = payload.is_active.unwrap_or(existing.is_active);

    let shop: Shop = sqlx::query_as(
        r#"
        UPDATE shops
        SET name = $2, description = $3, address = $4, phone = $5, is_active = $6
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(existing.id)
    .bind(name)
    .bind(description)
    .bind(address)
    .bind(phone)
    .bind(is_active)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Updated", shop, Some(Meta::empty())))
}

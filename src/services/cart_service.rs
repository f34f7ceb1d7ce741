use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct CartWithProductRow {
    item_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    shop_id: Uuid,
    category_id: Uuid,
    name: String,
    description: Option<String>,
    price: i64,
    original_price: Option<i64>,
    stock_quantity: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    shop_name: String,
}

/// The caller's cart with live product data. A user without a cart row yet
/// simply has an empty cart. The subtotal uses current prices, so a price
/// change before checkout moves it; snapshots only happen at checkout.
pub async fn list_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS item_id, ci.quantity,
               p.id AS product_id, p.shop_id, p.category_id, p.name, p.description,
               p.price, p.original_price, p.stock_quantity, p.is_active, p.created_at,
               s.name AS shop_name
        FROM cart_items ci
        JOIN carts c ON c.id = ci.cart_id
        JOIN products p ON p.id = ci.product_id
        JOIN shops s ON s.id = p.shop_id
        WHERE c.user_id = $1
        ORDER BY ci.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let subtotal: i64 = rows.iter().map(|r| r.price * r.quantity as i64).sum();

    let items = rows
        .into_iter()
        .map(|row| CartItemDto {
            id: row.item_id,
            product: Product {
                id: row.product_id,
                shop_id: row.shop_id,
                category_id: row.category_id,
                name: row.name,
                description: row.description,
                price: row.price,
                original_price: row.original_price,
                stock_quantity: row.stock_quantity,
                is_active: row.is_active,
                created_at: row.created_at,
            },
            shop_name: row.shop_name,
            quantity: row.quantity,
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        CartList { items, subtotal },
        Some(Meta::empty()),
    ))
}

pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product: Option<(Uuid, bool)> =
        sqlx::query_as("SELECT id, is_active FROM products WHERE id = $1")
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;
    match product {
        None => return Err(AppError::BadRequest("product not found".to_string())),
        Some((_, false)) => {
            return Err(AppError::BadRequest("product is not available".to_string()));
        }
        Some(_) => {}
    }

    // The cart row is created lazily on first add.
    let cart_id = match sqlx::query_as::<_, (Uuid,)>("SELECT id FROM carts WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?
    {
        Some((id,)) => id,
        None => {
            let (id,): (Uuid,) =
                sqlx::query_as("INSERT INTO carts (id, user_id) VALUES ($1, $2) RETURNING id")
                    .bind(Uuid::new_v4())
                    .bind(user.user_id)
                    .fetch_one(pool)
                    .await?;
            id
        }
    };

    let exist: Option<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id)
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;

    let cart_item = if let Some(item) = exist {
        sqlx::query_as::<_, CartItem>(
            r#"
            UPDATE cart_items
            SET quantity = quantity + $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(payload.quantity)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_as(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(cart_id)
        .bind(payload.product_id)
        .bind(payload.quantity)
        .fetch_one(pool)
        .await?
    };

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_item, None))
}

/// Quantity at or below zero removes the line item, same as a delete.
pub async fn set_quantity(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.quantity <= 0 {
        return remove_item(pool, user, item_id).await;
    }

    let updated: Option<CartItem> = sqlx::query_as(
        r#"
        UPDATE cart_items ci
        SET quantity = $3
        FROM carts c
        WHERE ci.id = $1 AND ci.cart_id = c.id AND c.user_id = $2
        RETURNING ci.*
        "#,
    )
    .bind(item_id)
    .bind(user.user_id)
    .bind(payload.quantity)
    .fetch_optional(pool)
    .await?;

    let item = match updated {
        Some(item) => item,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "Quantity updated",
        serde_json::json!({ "id": item.id, "quantity": item.quantity }),
        Some(Meta::empty()),
    ))
}

pub async fn remove_item(
    pool: &DbPool,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query(
        r#"
        DELETE FROM cart_items ci
        USING carts c
        WHERE ci.id = $1 AND ci.cart_id = c.id AND c.user_id = $2
        "#,
    )
    .bind(item_id)
    .bind(user.user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

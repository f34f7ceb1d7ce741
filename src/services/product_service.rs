use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::products::{
        CategoryList, CreateProductRequest, ProductCard, ProductCardList, ProductList,
        UpdateProductRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_merchant},
    models::{Category, Product, Shop},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
};

/// Public storefront listing: active products of active shops, with search
/// and filter options.
pub async fn list_products(
    pool: &DbPool,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductCardList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let q = query.q.filter(|s| !s.trim().is_empty());

    let sql = format!(
        r#"
        SELECT p.id, p.shop_id, p.category_id, p.name, p.description,
               p.price, p.original_price, p.stock_quantity, p.is_active, p.created_at,
               s.name AS shop_name, c.name AS category_name
        FROM products p
        JOIN shops s ON s.id = p.shop_id
        JOIN categories c ON c.id = p.category_id
        WHERE p.is_active = TRUE AND s.is_active = TRUE
          AND ($1::text IS NULL OR p.name ILIKE '%' || $1 || '%' OR s.name ILIKE '%' || $1 || '%')
          AND ($2::uuid IS NULL OR p.category_id = $2)
          AND ($3::uuid IS NULL OR p.shop_id = $3)
          AND ($4::bigint IS NULL OR p.price >= $4)
          AND ($5::bigint IS NULL OR p.price <= $5)
        ORDER BY p.{} {}
        LIMIT $6 OFFSET $7
        "#,
        sort_by.as_sql(),
        sort_order.as_sql()
    );

    let items = sqlx::query_as::<_, ProductCard>(&sql)
        .bind(q.as_deref())
        .bind(query.category_id)
        .bind(query.shop_id)
        .bind(query.min_price)
        .bind(query.max_price)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM products p
        JOIN shops s ON s.id = p.shop_id
        WHERE p.is_active = TRUE AND s.is_active = TRUE
          AND ($1::text IS NULL OR p.name ILIKE '%' || $1 || '%' OR s.name ILIKE '%' || $1 || '%')
          AND ($2::uuid IS NULL OR p.category_id = $2)
          AND ($3::uuid IS NULL OR p.shop_id = $3)
          AND ($4::bigint IS NULL OR p.price >= $4)
          AND ($5::bigint IS NULL OR p.price <= $5)
        "#,
    )
    .bind(q.as_deref())
    .bind(query.category_id)
    .bind(query.shop_id)
    .bind(query.min_price)
    .bind(query.max_price)
    .fetch_one(pool)
    .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Products",
        ProductCardList { items },
        Some(meta),
    ))
}

pub async fn get_product(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<ProductCard>> {
    let product = sqlx::query_as::<_, ProductCard>(
        r#"
        SELECT p.id, p.shop_id, p.category_id, p.name, p.description,
               p.price, p.original_price, p.stock_quantity, p.is_active, p.created_at,
               s.name AS shop_name, c.name AS category_name
        FROM products p
        JOIN shops s ON s.id = p.shop_id
        JOIN categories c ON c.id = p.category_id
        WHERE p.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn list_categories(pool: &DbPool) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = sqlx::query_as("SELECT * FROM categories ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(ApiResponse::success("Categories", CategoryList { items }, None))
}

async fn own_shop(pool: &DbPool, user: &AuthUser) -> AppResult<Shop> {
    let shop: Option<Shop> = sqlx::query_as("SELECT * FROM shops WHERE owner_id = $1")
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;
    shop.ok_or_else(|| AppError::BadRequest("Create your shop first".into()))
}

pub async fn list_my_products(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_merchant(user)?;
    let shop = own_shop(pool, user).await?;

    let items: Vec<Product> =
        sqlx::query_as("SELECT * FROM products WHERE shop_id = $1 ORDER BY created_at DESC")
            .bind(shop.id)
            .fetch_all(pool)
            .await?;

    Ok(ApiResponse::success("Products", ProductList { items }, None))
}

pub async fn create_product(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_merchant(user)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if payload.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    let shop = own_shop(pool, user).await?;

    let category: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE id = $1")
        .bind(payload.category_id)
        .fetch_optional(pool)
        .await?;
    if category.is_none() {
        return Err(AppError::BadRequest("category not found".into()));
    }

    let product: Product = sqlx::query_as(
        r#"
        INSERT INTO products (id, shop_id, category_id, name, description, price, original_price, stock_quantity)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(shop.id)
    .bind(payload.category_id)
    .bind(payload.name)
    .bind(payload.description)
    .bind(payload.price)
    .bind(payload.original_price)
    .bind(payload.stock_quantity)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

async fn owned_product(pool: &DbPool, user: &AuthUser, id: Uuid) -> AppResult<Product> {
    let existing: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    // Ownership is asserted here, not just relied upon from the fetch filter.
    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT owner_id FROM shops WHERE id = $1")
        .bind(existing.shop_id)
        .fetch_optional(pool)
        .await?;
    match owner {
        Some((owner_id,)) if owner_id == user.user_id => Ok(existing),
        _ => Err(AppError::Forbidden),
    }
}

pub async fn update_product(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_merchant(user)?;
    let existing = owned_product(pool, user, id).await?;

    let category_id = payload.category_id.unwrap_or(existing.category_id);
    let name = payload.name.unwrap_or(existing.name);
    let description = payload.description.or(existing.description);
    let price = payload.price.unwrap_or(existing.price);
    let original_price = payload.original_price.or(existing.original_price);
    let stock_quantity = payload.stock_quantity.unwrap_or(existing.stock_quantity);
    let is_active = payload.is_active.unwrap_or(existing.is_active);

    if price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }

    let product: Product = sqlx::query_as(
        r#"
        UPDATE products
        SET category_id = $2, name = $3, description = $4, price = $5,
            original_price = $6, stock_quantity = $7, is_active = $8
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(category_id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(original_price)
    .bind(stock_quantity)
    .bind(is_active)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
}

pub async fn delete_product(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_merchant(user)?;
    owned_product(pool, user, id).await?;

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

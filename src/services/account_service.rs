use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::account::{
        AddressList, CreateAddressRequest, CreatePaymentMethodRequest, PaymentMethodList,
        UpdateProfileRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Profile, UserAddress, UserPaymentMethod},
    response::{ApiResponse, Meta},
};

const PAYMENT_METHOD_TYPES: [&str; 4] = ["tmoney", "flooz", "card", "cash"];

pub async fn get_profile(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<Profile>> {
    let profile: Option<Profile> = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;
    let profile = match profile {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("OK", profile, None))
}

pub async fn update_profile(
    pool: &DbPool,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<Profile>> {
    let existing: Option<Profile> = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(pool)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let full_name = payload.full_name.unwrap_or(existing.full_name);
    let phone = payload.phone.or(existing.phone);

    let profile: Profile = sqlx::query_as(
        r#"
        UPDATE profiles
        SET full_name = $2, phone = $3
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(full_name)
    .bind(phone)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Profile updated", profile, None))
}

pub async fn list_addresses(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<AddressList>> {
    let items: Vec<UserAddress> = sqlx::query_as(
        "SELECT * FROM user_addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success("OK", AddressList { items }, None))
}

pub async fn add_address(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateAddressRequest,
) -> AppResult<ApiResponse<UserAddress>> {
    if payload.label.trim().is_empty() || payload.address.trim().is_empty() {
        return Err(AppError::BadRequest("label and address are required".into()));
    }

    // Promoting a new default demotes the others in the same transaction, so
    // a user never ends up with two defaults.
    let mut txn = pool.begin().await?;

    if payload.is_default {
        sqlx::query("UPDATE user_addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(user.user_id)
            .execute(&mut *txn)
            .await?;
    }

    let address: UserAddress = sqlx::query_as(
        r#"
        INSERT INTO user_addresses (id, user_id, label, address, is_default)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.label)
    .bind(payload.address)
    .bind(payload.is_default)
    .fetch_one(&mut *txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "address_add",
        Some("user_addresses"),
        Some(serde_json::json!({ "address_id": address.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Address saved", address, None))
}

pub async fn remove_address(
    pool: &DbPool,
    user: &AuthUser,
    address_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM user_addresses WHERE id = $1 AND user_id = $2")
        .bind(address_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Address removed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_payment_methods(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<PaymentMethodList>> {
    let items: Vec<UserPaymentMethod> = sqlx::query_as(
        "SELECT * FROM user_payment_methods WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success("OK", PaymentMethodList { items }, None))
}

pub async fn add_payment_method(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreatePaymentMethodRequest,
) -> AppResult<ApiResponse<UserPaymentMethod>> {
    if !PAYMENT_METHOD_TYPES.contains(&payload.method_type.as_str()) {
        return Err(AppError::BadRequest("Invalid payment method type".into()));
    }

    let mut txn = pool.begin().await?;

    if payload.is_default {
        sqlx::query("UPDATE user_payment_methods SET is_default = FALSE WHERE user_id = $1")
            .bind(user.user_id)
            .execute(&mut *txn)
            .await?;
    }

    let method: UserPaymentMethod = sqlx::query_as(
        r#"
        INSERT INTO user_payment_methods (id, user_id, method_type, account_number, is_default)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.method_type)
    .bind(payload.account_number)
    .bind(payload.is_default)
    .fetch_one(&mut *txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "payment_method_add",
        Some("user_payment_methods"),
        Some(serde_json::json!({ "method_id": method.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Payment method saved", method, None))
}

pub async fn remove_payment_method(
    pool: &DbPool,
    user: &AuthUser,
    method_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM user_payment_methods WHERE id = $1 AND user_id = $2")
        .bind(method_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Payment method removed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{AdvanceOrderRequest, AvailableDelivery, AvailableDeliveryList, OrderList},
    entity::{
        order_status_history::ActiveModel as HistoryActive,
        orders::{Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_driver},
    models::Order,
    response::{ApiResponse, Meta},
    services::order_service::order_from_entity,
    state::AppState,
    status::OrderStatus,
};

// The queue stays short on purpose; drivers refresh it constantly.
const AVAILABLE_LIMIT: i64 = 10;

#[derive(FromRow)]
struct AvailableOrderRow {
    id: Uuid,
    customer_id: Uuid,
    shop_id: Uuid,
    driver_id: Option<Uuid>,
    delivery_address_id: Uuid,
    total_amount: i64,
    delivery_fee: i64,
    payment_method: String,
    payment_status: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    shop_name: String,
    shop_address: String,
    delivery_address: String,
}

/// Unclaimed ready orders, oldest first, for any authenticated driver.
pub async fn list_available(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AvailableDeliveryList>> {
    ensure_driver(user)?;

    let rows = sqlx::query_as::<_, AvailableOrderRow>(
        r#"
        SELECT o.id, o.customer_id, o.shop_id, o.driver_id, o.delivery_address_id,
               o.total_amount, o.delivery_fee, o.payment_method, o.payment_status,
               o.status, o.created_at, o.updated_at,
               s.name AS shop_name, s.address AS shop_address,
               ua.address AS delivery_address
        FROM orders o
        JOIN shops s ON s.id = o.shop_id
        JOIN user_addresses ua ON ua.id = o.delivery_address_id
        WHERE o.status = $1 AND o.driver_id IS NULL
        ORDER BY o.created_at
        LIMIT $2
        "#,
    )
    .bind(OrderStatus::ReadyForPickup.as_str())
    .bind(AVAILABLE_LIMIT)
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(available_from_row)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Available deliveries",
        AvailableDeliveryList { items },
        Some(Meta::empty()),
    ))
}

/// Claim an unclaimed ready order.
///
/// The assignment is a compare-and-swap: the UPDATE only matches while the
/// order is still ready_for_pickup with no driver, so of two racing drivers
/// exactly one sees a row change. The loser gets a 409 and should pick
/// another delivery, never a silent success.
pub async fn claim(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
    ensure_driver(user)?;

    let order = Orders::find_by_id(id).one(&state.orm).await?;
    if order.is_none() {
        return Err(AppError::NotFound);
    }

    let txn = state.orm.begin().await?;

    let result = Orders::update_many()
        .col_expr(OrderCol::DriverId, Expr::value(user.user_id))
        .col_expr(OrderCol::Status, Expr::value(OrderStatus::PickedUp.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(id))
                .add(OrderCol::Status.eq(OrderStatus::ReadyForPickup.as_str()))
                .add(OrderCol::DriverId.is_null()),
        )
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict("delivery already taken".into()));
    }

    HistoryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(id),
        status: Set(OrderStatus::PickedUp.as_str().into()),
        changed_by: Set(user.user_id),
        notes: Set(Some("Claimed by driver".into())),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    let claimed = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "delivery_claim",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Delivery claimed",
        order_from_entity(claimed)?,
        Some(Meta::empty()),
    ))
}

/// The caller's in-flight deliveries.
pub async fn list_active(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    ensure_driver(user)?;

    let orders = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::DriverId.eq(user.user_id))
                .add(OrderCol::Status.is_in([
                    OrderStatus::PickedUp.as_str(),
                    OrderStatus::InTransit.as_str(),
                ])),
        )
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Active deliveries",
        OrderList { items: orders },
        Some(Meta::empty()),
    ))
}

/// Apply one driver step: picked_up -> in_transit -> delivered.
///
/// Ownership is asserted against the stored driver_id before anything else;
/// the query filter alone is not the authorization check. The transition
/// itself uses the same guarded-UPDATE scheme as the merchant side.
pub async fn advance_delivery(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AdvanceOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_driver(user)?;

    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    if order.driver_id != Some(user.user_id) {
        return Err(AppError::Forbidden);
    }

    let current: OrderStatus = order
        .status
        .parse()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("{e}")))?;

    let expected = match current.driver_next() {
        Some(next) => next,
        None => {
            return Err(AppError::Conflict(format!(
                "delivery in status {current} cannot be advanced"
            )));
        }
    };
    if payload.status != expected {
        return Err(AppError::Conflict(format!(
            "delivery moved on, expected transition to {expected}"
        )));
    }

    let txn = state.orm.begin().await?;

    let result = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(expected.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(order.id))
                .add(OrderCol::DriverId.eq(user.user_id))
                .add(OrderCol::Status.eq(current.as_str())),
        )
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "delivery status changed, refresh and retry".into(),
        ));
    }

    HistoryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        status: Set(expected.as_str().into()),
        changed_by: Set(user.user_id),
        notes: Set(Some("Status updated by driver".into())),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    let updated = Orders::find_by_id(order.id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "delivery_advance",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": expected.as_str() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Delivery updated",
        order_from_entity(updated)?,
        Some(Meta::empty()),
    ))
}

/// Everything the driver has ever carried, newest first.
pub async fn list_deliveries(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_driver(user)?;

    let orders = Orders::find()
        .filter(OrderCol::DriverId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Deliveries",
        OrderList { items: orders },
        Some(Meta::empty()),
    ))
}

fn available_from_row(row: AvailableOrderRow) -> AppResult<AvailableDelivery> {
    let status: OrderStatus = row
        .status
        .parse()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("{e}")))?;
    Ok(AvailableDelivery {
        order: Order {
            id: row.id,
            customer_id: row.customer_id,
            shop_id: row.shop_id,
            driver_id: row.driver_id,
            delivery_address_id: row.delivery_address_id,
            total_amount: row.total_amount,
            delivery_fee: row.delivery_fee,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        },
        shop_name: row.shop_name,
        shop_address: row.shop_address,
        delivery_address: row.delivery_address,
    })
}

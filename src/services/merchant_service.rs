use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        AdvanceOrderRequest, ContactInfo, DeliveryAddressInfo, MerchantOrderDetail, MerchantStats,
        OrderList, StatusCount,
    },
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        order_status_history::{
            ActiveModel as HistoryActive, Column as HistoryCol, Entity as OrderStatusHistory,
        },
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
        shops::{Column as ShopCol, Entity as Shops},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_merchant},
    models::{Order, grand_total},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service::{history_from_entity, order_from_entity, order_item_from_entity},
    state::AppState,
    status::OrderStatus,
};

/// Load an order and assert the caller owns the shop it belongs to.
async fn owned_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<OrderModel> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let shop = Shops::find_by_id(order.shop_id).one(&state.orm).await?;
    match shop {
        Some(s) if s.owner_id == user.user_id => Ok(order),
        _ => Err(AppError::Forbidden),
    }
}

pub async fn list_shop_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_merchant(user)?;

    let shop = Shops::find()
        .filter(ShopCol::OwnerId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    let shop = match shop {
        Some(s) => s,
        None => return Err(AppError::BadRequest("Create your shop first".into())),
    };

    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::ShopId.eq(shop.id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_shop_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<MerchantOrderDetail>> {
    ensure_merchant(user)?;
    let order = owned_order(state, user, id).await?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect::<Vec<_>>();

    let history = OrderStatusHistory::find()
        .filter(HistoryCol::OrderId.eq(order.id))
        .order_by_asc(HistoryCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(history_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let customer: ContactInfo =
        sqlx::query_as("SELECT full_name, email FROM profiles WHERE id = $1")
            .bind(order.customer_id)
            .fetch_one(&state.pool)
            .await?;

    let delivery_address: DeliveryAddressInfo =
        sqlx::query_as("SELECT label, address FROM user_addresses WHERE id = $1")
            .bind(order.delivery_address_id)
            .fetch_one(&state.pool)
            .await?;

    let total = grand_total(&items, order.delivery_fee);
    Ok(ApiResponse::success(
        "Order",
        MerchantOrderDetail {
            order: order_from_entity(order)?,
            items,
            grand_total: total,
            customer,
            delivery_address,
            history,
        },
        Some(Meta::empty()),
    ))
}

/// Apply one merchant step of the status machine.
///
/// The caller names the status it is moving the order to; it must be the
/// immediate successor of the current one. The UPDATE is guarded on the
/// current status so a stale screen or a double submit loses with a 409
/// instead of skipping or repeating a stage. The history row lands in the
/// same transaction as the transition.
pub async fn advance_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AdvanceOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_merchant(user)?;
    let order = owned_order(state, user, id).await?;

    let current: OrderStatus = order
        .status
        .parse()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("{e}")))?;

    let expected = match current.merchant_next() {
        Some(next) => next,
        None => {
            return Err(AppError::Conflict(format!(
                "order in status {current} cannot be advanced by the merchant"
            )));
        }
    };
    if payload.status != expected {
        return Err(AppError::Conflict(format!(
            "order moved on, expected transition to {expected}"
        )));
    }

    let txn = state.orm.begin().await?;

    let result = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(expected.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(order.id))
                .add(OrderCol::Status.eq(current.as_str())),
        )
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "order status changed, refresh and retry".into(),
        ));
    }

    HistoryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        status: Set(expected.as_str().into()),
        changed_by: Set(user.user_id),
        notes: Set(Some("Status updated by merchant".into())),
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
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": expected.as_str() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(updated)?,
        Some(Meta::empty()),
    ))
}

pub async fn shop_stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<MerchantStats>> {
    ensure_merchant(user)?;

    let shop: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM shops WHERE owner_id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?;
    let (shop_id,) = match shop {
        Some(s) => s,
        None => return Err(AppError::BadRequest("Create your shop first".into())),
    };

    let (total_orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE shop_id = $1")
        .bind(shop_id)
        .fetch_one(&state.pool)
        .await?;

    // Revenue counts delivered orders only; in-flight and cancelled ones
    // haven't earned anything yet.
    let (total_revenue,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE shop_id = $1 AND status = $2",
    )
    .bind(shop_id)
    .bind(OrderStatus::Delivered.as_str())
    .fetch_one(&state.pool)
    .await?;

    let by_status: Vec<StatusCount> = sqlx::query_as(
        "SELECT status, COUNT(*) AS count FROM orders WHERE shop_id = $1 GROUP BY status ORDER BY status",
    )
    .bind(shop_id)
    .fetch_all(&state.pool)
    .await?;

    let average_order_value = if total_orders > 0 {
        total_revenue / total_orders
    } else {
        0
    };

    Ok(ApiResponse::success(
        "Stats",
        MerchantStats {
            total_orders,
            total_revenue,
            average_order_value,
            by_status,
        },
        Some(Meta::empty()),
    ))
}

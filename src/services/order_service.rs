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
    dto::orders::{CheckoutRequest, CheckoutResponse, OrderList, OrderWithItems, StatusHistoryList},
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        order_status_history::{
            ActiveModel as HistoryActive, Column as HistoryCol, Entity as OrderStatusHistory,
            Model as HistoryModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
        user_addresses::Entity as UserAddresses,
        user_payment_methods::Entity as UserPaymentMethods,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, StatusHistoryEntry, grand_total},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
    status::OrderStatus,
};

/// One cart line as seen by the splitter, price already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub shop_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

/// All of one shop's lines from a cart, with their subtotal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopGroup {
    pub shop_id: Uuid,
    pub subtotal: i64,
    pub lines: Vec<CartLine>,
}

/// Partition cart lines by shop, preserving first-seen shop order. Each
/// group's subtotal is Σ unit_price × quantity over its own lines only; the
/// delivery fee is per order and added later.
pub fn split_by_shop(lines: Vec<CartLine>) -> Vec<ShopGroup> {
    let mut groups: Vec<ShopGroup> = Vec::new();
    for line in lines {
        let amount = line.unit_price * line.quantity as i64;
        match groups.iter_mut().find(|g| g.shop_id == line.shop_id) {
            Some(group) => {
                group.subtotal += amount;
                group.lines.push(line);
            }
            None => groups.push(ShopGroup {
                shop_id: line.shop_id,
                subtotal: amount,
                lines: vec![line],
            }),
        }
    }
    groups
}

/// Turn the caller's cart into one order per shop and empty the cart.
///
/// Every write happens inside a single transaction: either all orders, all
/// their items and the cart clear land together, or nothing does and the
/// error names the shop group that failed.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    // Both selections are validated up front, before any write.
    let address = UserAddresses::find_by_id(payload.delivery_address_id)
        .one(&state.orm)
        .await?;
    let address = match address {
        Some(a) if a.user_id == user.user_id => a,
        _ => return Err(AppError::BadRequest("Select a delivery address".into())),
    };

    let method = UserPaymentMethods::find_by_id(payload.payment_method_id)
        .one(&state.orm)
        .await?;
    let method = match method {
        Some(m) if m.user_id == user.user_id => m,
        _ => return Err(AppError::BadRequest("Select a payment method".into())),
    };

    let txn = state.orm.begin().await?;

    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&txn)
        .await?;
    let cart = match cart {
        Some(c) => c,
        None => return Err(AppError::BadRequest("Cart is empty".into())),
    };

    let cart_items = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .order_by_asc(CartItemCol::CreatedAt)
        .all(&txn)
        .await?;
    if cart_items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let product_ids: Vec<Uuid> = cart_items.iter().map(|i| i.product_id).collect();
    let products = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&txn)
        .await?;

    let mut lines = Vec::with_capacity(cart_items.len());
    for item in &cart_items {
        let product = products
            .iter()
            .find(|p| p.id == item.product_id)
            .ok_or_else(|| AppError::BadRequest("Cart references a missing product".into()))?;
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        lines.push(CartLine {
            product_id: product.id,
            shop_id: product.shop_id,
            quantity: item.quantity,
            // Snapshot of the current price; this is what the order keeps.
            unit_price: product.price,
        });
    }

    let groups = split_by_shop(lines);
    let mut created: Vec<OrderWithItems> = Vec::with_capacity(groups.len());

    for group in &groups {
        let order_id = Uuid::new_v4();
        let delivery_fee = state.fees.quote(group.subtotal);

        let order = OrderActive {
            id: Set(order_id),
            customer_id: Set(user.user_id),
            shop_id: Set(group.shop_id),
            driver_id: Set(None),
            delivery_address_id: Set(address.id),
            total_amount: Set(group.subtotal),
            delivery_fee: Set(delivery_fee),
            payment_method: Set(method.method_type.clone()),
            payment_status: Set("unpaid".into()),
            status: Set(OrderStatus::Pending.as_str().into()),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await
        .map_err(|source| AppError::Checkout {
            shop_id: group.shop_id,
            source,
        })?;

        let mut order_items: Vec<OrderItem> = Vec::with_capacity(group.lines.len());
        for line in &group.lines {
            let item = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                total_price: Set(line.unit_price * line.quantity as i64),
                created_at: NotSet,
            }
            .insert(&txn)
            .await
            .map_err(|source| AppError::Checkout {
                shop_id: group.shop_id,
                source,
            })?;

            order_items.push(order_item_from_entity(item));
        }

        let total = grand_total(&order_items, order.delivery_fee);
        created.push(OrderWithItems {
            order: order_from_entity(order)?,
            items: order_items,
            grand_total: total,
        });
    }

    // The cart survives as an empty row; only its items go.
    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({
            "orders": created.iter().map(|o| o.order.id).collect::<Vec<_>>()
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        CheckoutResponse { orders: created },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::CustomerId.eq(user.user_id));
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
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    if order.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect::<Vec<_>>();

    let total = grand_total(&items, order.delivery_fee);
    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
            grand_total: total,
        },
        Some(Meta::empty()),
    ))
}

pub async fn order_history(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<StatusHistoryList>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    if order.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let items = OrderStatusHistory::find()
        .filter(HistoryCol::OrderId.eq(order.id))
        .order_by_asc(HistoryCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(history_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "OK",
        StatusHistoryList { items },
        Some(Meta::empty()),
    ))
}

/// Customer-side cancellation, allowed only while the order is still pending.
/// The guard lives in the UPDATE itself; losing the race against a merchant
/// confirmation comes back as a conflict, not a silent success.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id).one(&txn).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    if order.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let current: OrderStatus = order
        .status
        .parse()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("{e}")))?;
    if !current.cancellable() {
        return Err(AppError::Conflict(
            "order can no longer be cancelled".into(),
        ));
    }

    let result = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(OrderStatus::Cancelled.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(order.id))
                .add(OrderCol::CustomerId.eq(user.user_id))
                .add(OrderCol::Status.eq(OrderStatus::Pending.as_str())),
        )
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "order can no longer be cancelled".into(),
        ));
    }

    HistoryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        status: Set(OrderStatus::Cancelled.as_str().into()),
        changed_by: Set(user.user_id),
        notes: Set(Some("Cancelled by customer".into())),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    let cancelled = Orders::find_by_id(order.id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order cancelled",
        order_from_entity(cancelled)?,
        Some(Meta::empty()),
    ))
}

pub fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status: OrderStatus = model
        .status
        .parse()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("{e}")))?;
    Ok(Order {
        id: model.id,
        customer_id: model.customer_id,
        shop_id: model.shop_id,
        driver_id: model.driver_id,
        delivery_address_id: model.delivery_address_id,
        total_amount: model.total_amount,
        delivery_fee: model.delivery_fee,
        payment_method: model.payment_method,
        payment_status: model.payment_status,
        status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        total_price: model.total_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn history_from_entity(model: HistoryModel) -> AppResult<StatusHistoryEntry> {
    let status: OrderStatus = model
        .status
        .parse()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("{e}")))?;
    Ok(StatusHistoryEntry {
        id: model.id,
        order_id: model.order_id,
        status,
        changed_by: model.changed_by,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

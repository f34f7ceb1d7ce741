use std::sync::Arc;

use axum_marketplace_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        account::{CreateAddressRequest, CreatePaymentMethodRequest},
        cart::{AddToCartRequest, UpdateCartItemRequest},
        orders::{AdvanceOrderRequest, CheckoutRequest},
        products::{CreateProductRequest, UpdateProductRequest},
        shops::CreateShopRequest,
    },
    error::AppError,
    middleware::auth::{AuthUser, Role},
    pricing::FlatFee,
    routes::params::{OrderListQuery, Pagination},
    services::{
        account_service, cart_service, driver_service, merchant_service, order_service,
        product_service, shop_service,
    },
    state::AppState,
    status::OrderStatus,
};
use uuid::Uuid;

// Full multi-party flow: client fills a two-shop cart and checks out, the
// merchant walks the order to ready_for_pickup, two drivers race for the
// claim, the winner delivers. Skips when no database is configured.
#[tokio::test]
async fn cart_checkout_claim_and_delivery_flow() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let client = AuthUser {
        user_id: create_user(&state, "client@test.example", "client").await?,
        role: Role::Client,
    };
    let merchant_a = AuthUser {
        user_id: create_user(&state, "merchant-a@test.example", "merchant").await?,
        role: Role::Merchant,
    };
    let merchant_b = AuthUser {
        user_id: create_user(&state, "merchant-b@test.example", "merchant").await?,
        role: Role::Merchant,
    };
    let driver_1 = AuthUser {
        user_id: create_user(&state, "driver-1@test.example", "driver").await?,
        role: Role::Driver,
    };
    let driver_2 = AuthUser {
        user_id: create_user(&state, "driver-2@test.example", "driver").await?,
        role: Role::Driver,
    };

    let shop_a = shop_service::create_shop(
        &state.pool,
        &merchant_a,
        CreateShopRequest {
            name: "Épicerie A".into(),
            description: None,
            address: "Marché central".into(),
            phone: None,
        },
    )
    .await?
    .data
    .unwrap();

    let shop_b = shop_service::create_shop(
        &state.pool,
        &merchant_b,
        CreateShopRequest {
            name: "Boutique B".into(),
            description: None,
            address: "Rue du commerce".into(),
            phone: None,
        },
    )
    .await?
    .data
    .unwrap();

    let category_id = create_category(&state, "Alimentation").await?;

    let product_a = product_service::create_product(
        &state.pool,
        &merchant_a,
        CreateProductRequest {
            category_id,
            name: "Sac de gari".into(),
            description: None,
            price: 1000,
            original_price: None,
            stock_quantity: 50,
        },
    )
    .await?
    .data
    .unwrap();

    let product_b = product_service::create_product(
        &state.pool,
        &merchant_b,
        CreateProductRequest {
            category_id,
            name: "Panier tressé".into(),
            description: None,
            price: 5000,
            original_price: None,
            stock_quantity: 10,
        },
    )
    .await?
    .data
    .unwrap();

    let product_c = product_service::create_product(
        &state.pool,
        &merchant_a,
        CreateProductRequest {
            category_id,
            name: "Savon local".into(),
            description: None,
            price: 999,
            original_price: None,
            stock_quantity: 100,
        },
    )
    .await?
    .data
    .unwrap();

    let address = account_service::add_address(
        &state.pool,
        &client,
        CreateAddressRequest {
            label: "Maison".into(),
            address: "Quartier Tokoin".into(),
            is_default: true,
        },
    )
    .await?
    .data
    .unwrap();

    let payment = account_service::add_payment_method(
        &state.pool,
        &client,
        CreatePaymentMethodRequest {
            method_type: "tmoney".into(),
            account_number: "+228 91 00 00 00".into(),
            is_default: true,
        },
    )
    .await?
    .data
    .unwrap();

    // Adding the same product twice increments the line, not duplicates it.
    cart_service::add_to_cart(
        &state.pool,
        &client,
        AddToCartRequest {
            product_id: product_a.id,
            quantity: 1,
        },
    )
    .await?;
    let item_a = cart_service::add_to_cart(
        &state.pool,
        &client,
        AddToCartRequest {
            product_id: product_a.id,
            quantity: 1,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(item_a.quantity, 2);

    cart_service::add_to_cart(
        &state.pool,
        &client,
        AddToCartRequest {
            product_id: product_b.id,
            quantity: 1,
        },
    )
    .await?;

    // Setting a line to zero removes it, same as deleting it.
    let item_c = cart_service::add_to_cart(
        &state.pool,
        &client,
        AddToCartRequest {
            product_id: product_c.id,
            quantity: 1,
        },
    )
    .await?
    .data
    .unwrap();
    cart_service::set_quantity(
        &state.pool,
        &client,
        item_c.id,
        UpdateCartItemRequest { quantity: 0 },
    )
    .await?;

    let cart = cart_service::list_cart(&state.pool, &client)
        .await?
        .data
        .unwrap();
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.subtotal, 2 * 1000 + 5000);

    // A bad address selection blocks checkout before anything is written.
    let failed = order_service::checkout(
        &state,
        &client,
        CheckoutRequest {
            delivery_address_id: Uuid::new_v4(),
            payment_method_id: payment.id,
        },
    )
    .await;
    assert!(matches!(failed, Err(AppError::BadRequest(_))));

    let orders_after_failure = order_service::list_orders(&state, &client, empty_query())
        .await?
        .data
        .unwrap();
    assert!(orders_after_failure.items.is_empty());
    let cart_after_failure = cart_service::list_cart(&state.pool, &client)
        .await?
        .data
        .unwrap();
    assert_eq!(cart_after_failure.items.len(), 2);

    // Checkout splits the two-shop cart into two orders and empties the cart.
    let checkout = order_service::checkout(
        &state,
        &client,
        CheckoutRequest {
            delivery_address_id: address.id,
            payment_method_id: payment.id,
        },
    )
    .await?
    .data
    .unwrap();

    assert_eq!(checkout.orders.len(), 2);
    let order_a = checkout
        .orders
        .iter()
        .find(|o| o.order.shop_id == shop_a.id)
        .expect("order for shop A");
    let order_b = checkout
        .orders
        .iter()
        .find(|o| o.order.shop_id == shop_b.id)
        .expect("order for shop B");

    assert_eq!(order_a.order.total_amount, 2000);
    assert_eq!(order_a.order.delivery_fee, 1500);
    assert_eq!(order_a.grand_total, 3500);
    assert_eq!(order_a.items.len(), 1);
    assert_eq!(order_a.items[0].quantity, 2);
    assert_eq!(order_a.items[0].unit_price, 1000);
    assert_eq!(order_a.items[0].total_price, 2000);
    assert_eq!(order_a.order.status, OrderStatus::Pending);
    assert!(order_a.order.driver_id.is_none());

    assert_eq!(order_b.order.total_amount, 5000);
    assert_eq!(order_b.grand_total, 6500);

    let cart_after = cart_service::list_cart(&state.pool, &client)
        .await?
        .data
        .unwrap();
    assert!(cart_after.items.is_empty());
    assert_eq!(cart_after.subtotal, 0);

    // Order items keep their checkout-time price even if the product changes.
    product_service::update_product(
        &state.pool,
        &merchant_a,
        product_a.id,
        UpdateProductRequest {
            category_id: None,
            name: None,
            description: None,
            price: Some(1200),
            original_price: None,
            stock_quantity: None,
            is_active: None,
        },
    )
    .await?;
    let rechecked = order_service::get_order(&state, &client, order_a.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(rechecked.items[0].unit_price, 1000);
    assert_eq!(rechecked.grand_total, 3500);

    // Another merchant can't touch this order.
    let foreign = merchant_service::advance_order(
        &state,
        &merchant_b,
        order_a.order.id,
        AdvanceOrderRequest {
            status: OrderStatus::Confirmed,
        },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));

    // Merchant walks the order to ready_for_pickup, one stage at a time.
    for target in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::ReadyForPickup,
    ] {
        let advanced = merchant_service::advance_order(
            &state,
            &merchant_a,
            order_a.order.id,
            AdvanceOrderRequest { status: target },
        )
        .await?
        .data
        .unwrap();
        assert_eq!(advanced.status, target);
    }

    // Replaying a stale transition loses.
    let replay = merchant_service::advance_order(
        &state,
        &merchant_a,
        order_a.order.id,
        AdvanceOrderRequest {
            status: OrderStatus::Confirmed,
        },
    )
    .await;
    assert!(matches!(replay, Err(AppError::Conflict(_))));

    // Exactly one history row per applied transition, in order.
    let history = order_service::order_history(&state, &client, order_a.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(history.items.len(), 3);
    assert_eq!(
        history
            .items
            .iter()
            .map(|h| h.status)
            .collect::<Vec<_>>(),
        vec![
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::ReadyForPickup
        ]
    );
    for h in &history.items {
        assert_eq!(h.changed_by, merchant_a.user_id);
    }

    // The ready order shows up in the queue; the still-pending one doesn't.
    let available = driver_service::list_available(&state, &driver_1)
        .await?
        .data
        .unwrap();
    assert!(available.items.iter().any(|d| d.order.id == order_a.order.id));
    assert!(available.items.iter().all(|d| d.order.id != order_b.order.id));

    // Two drivers race for the same order; exactly one wins.
    let (first, second) = tokio::join!(
        driver_service::claim(&state, &driver_1, order_a.order.id),
        driver_service::claim(&state, &driver_2, order_a.order.id),
    );
    let (winner, loser_result) = match (&first, &second) {
        (Ok(_), Err(_)) => (&driver_1, &second),
        (Err(_), Ok(_)) => (&driver_2, &first),
        other => panic!("expected exactly one successful claim, got {other:?}"),
    };
    assert!(matches!(loser_result, Err(AppError::Conflict(_))));

    let claimed = order_service::get_order(&state, &client, order_a.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(claimed.order.status, OrderStatus::PickedUp);
    assert_eq!(claimed.order.driver_id, Some(winner.user_id));

    let loser = if winner.user_id == driver_1.user_id {
        &driver_2
    } else {
        &driver_1
    };

    // Only the assigned driver may advance the delivery.
    let stranger = driver_service::advance_delivery(
        &state,
        loser,
        order_a.order.id,
        AdvanceOrderRequest {
            status: OrderStatus::InTransit,
        },
    )
    .await;
    assert!(matches!(stranger, Err(AppError::Forbidden)));

    for target in [OrderStatus::InTransit, OrderStatus::Delivered] {
        let advanced = driver_service::advance_delivery(
            &state,
            winner,
            order_a.order.id,
            AdvanceOrderRequest { status: target },
        )
        .await?
        .data
        .unwrap();
        assert_eq!(advanced.status, target);
    }

    // Delivered is terminal for the driver too.
    let past_terminal = driver_service::advance_delivery(
        &state,
        winner,
        order_a.order.id,
        AdvanceOrderRequest {
            status: OrderStatus::Delivered,
        },
    )
    .await;
    assert!(matches!(past_terminal, Err(AppError::Conflict(_))));

    let active = driver_service::list_active(&state, winner).await?.data.unwrap();
    assert!(active.items.is_empty());
    let deliveries = driver_service::list_deliveries(&state, winner)
        .await?
        .data
        .unwrap();
    assert_eq!(deliveries.items.len(), 1);

    // Claim and driver steps are logged too: 3 merchant rows + picked_up +
    // in_transit + delivered.
    let full_history = order_service::order_history(&state, &client, order_a.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(full_history.items.len(), 6);
    assert_eq!(
        full_history.items.last().map(|h| h.status),
        Some(OrderStatus::Delivered)
    );

    // The untouched pending order can still be cancelled by the customer,
    // but only once, and delivered orders not at all.
    let cancelled = order_service::cancel_order(&state, &client, order_b.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let recancel = order_service::cancel_order(&state, &client, order_b.order.id).await;
    assert!(matches!(recancel, Err(AppError::Conflict(_))));

    let cancel_delivered = order_service::cancel_order(&state, &client, order_a.order.id).await;
    assert!(matches!(cancel_delivered, Err(AppError::Conflict(_))));

    // Merchant stats count the delivered revenue only.
    let stats = merchant_service::shop_stats(&state, &merchant_a)
        .await?
        .data
        .unwrap();
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.total_revenue, 2000);
    assert!(
        stats
            .by_status
            .iter()
            .any(|s| s.status == "delivered" && s.count == 1)
    );

    Ok(())
}

fn empty_query() -> OrderListQuery {
    OrderListQuery {
        pagination: Pagination {
            page: None,
            per_page: None,
        },
        status: None,
        sort_order: None,
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE order_status_history, order_items, orders, cart_items, carts, favorites, \
         user_payment_methods, user_addresses, products, categories, shops, audit_logs, profiles \
         RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    Ok(AppState {
        pool,
        orm,
        fees: Arc::new(FlatFee::new(1500)),
    })
}

async fn create_user(state: &AppState, email: &str, user_type: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO profiles (id, email, password_hash, full_name, user_type)
        VALUES ($1, $2, 'dummy', $3, $4)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(format!("Test {user_type}"))
    .bind(user_type)
    .fetch_one(&state.pool)
    .await?;

    Ok(id)
}

async fn create_category(state: &AppState, name: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) =
        sqlx::query_as("INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id")
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(&state.pool)
            .await?;

    Ok(id)
}

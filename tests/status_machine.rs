use axum_marketplace_api::status::OrderStatus;

const CHAIN: [OrderStatus; 7] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::ReadyForPickup,
    OrderStatus::PickedUp,
    OrderStatus::InTransit,
    OrderStatus::Delivered,
];

#[test]
fn happy_path_is_a_strict_linear_chain() {
    for pair in CHAIN.windows(2) {
        assert_eq!(pair[0].next(), Some(pair[1]));
        assert_eq!(pair[1].predecessor(), Some(pair[0]));
    }
}

#[test]
fn terminal_states_have_no_successor() {
    assert_eq!(OrderStatus::Delivered.next(), None);
    assert_eq!(OrderStatus::Cancelled.next(), None);
    assert!(OrderStatus::Delivered.is_terminal());
    assert!(OrderStatus::Cancelled.is_terminal());
    for status in CHAIN.iter().take(6) {
        assert!(!status.is_terminal(), "{status} must not be terminal");
    }
}

#[test]
fn merchant_owns_exactly_the_preparation_steps() {
    assert_eq!(
        OrderStatus::Pending.merchant_next(),
        Some(OrderStatus::Confirmed)
    );
    assert_eq!(
        OrderStatus::Confirmed.merchant_next(),
        Some(OrderStatus::Preparing)
    );
    assert_eq!(
        OrderStatus::Preparing.merchant_next(),
        Some(OrderStatus::ReadyForPickup)
    );

    // Once the order is ready, the merchant has no further action.
    assert_eq!(OrderStatus::ReadyForPickup.merchant_next(), None);
    assert_eq!(OrderStatus::PickedUp.merchant_next(), None);
    assert_eq!(OrderStatus::InTransit.merchant_next(), None);
    assert_eq!(OrderStatus::Delivered.merchant_next(), None);
    assert_eq!(OrderStatus::Cancelled.merchant_next(), None);
}

#[test]
fn driver_owns_exactly_the_delivery_steps() {
    assert_eq!(
        OrderStatus::PickedUp.driver_next(),
        Some(OrderStatus::InTransit)
    );
    assert_eq!(
        OrderStatus::InTransit.driver_next(),
        Some(OrderStatus::Delivered)
    );

    assert_eq!(OrderStatus::Pending.driver_next(), None);
    assert_eq!(OrderStatus::Confirmed.driver_next(), None);
    assert_eq!(OrderStatus::Preparing.driver_next(), None);
    assert_eq!(OrderStatus::ReadyForPickup.driver_next(), None);
    assert_eq!(OrderStatus::Delivered.driver_next(), None);
    assert_eq!(OrderStatus::Cancelled.driver_next(), None);
}

#[test]
fn no_actor_can_skip_a_stage() {
    // The advance services require target == current.{merchant,driver}_next();
    // a jump like pending -> delivered can never satisfy that.
    assert_ne!(
        OrderStatus::Pending.merchant_next(),
        Some(OrderStatus::Delivered)
    );
    assert_ne!(
        OrderStatus::Pending.merchant_next(),
        Some(OrderStatus::ReadyForPickup)
    );
    assert_ne!(
        OrderStatus::PickedUp.driver_next(),
        Some(OrderStatus::Delivered)
    );
}

#[test]
fn only_pending_orders_are_cancellable() {
    assert!(OrderStatus::Pending.cancellable());
    for status in CHAIN.iter().skip(1) {
        assert!(!status.cancellable(), "{status} must not be cancellable");
    }
    assert!(!OrderStatus::Cancelled.cancellable());
}

#[test]
fn parse_and_display_round_trip() {
    let all = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::ReadyForPickup,
        OrderStatus::PickedUp,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];
    for status in all {
        let parsed: OrderStatus = status.as_str().parse().expect("round trip");
        assert_eq!(parsed, status);
    }

    assert!("shipped".parse::<OrderStatus>().is_err());
    assert!("".parse::<OrderStatus>().is_err());
    assert!("Pending".parse::<OrderStatus>().is_err());
}

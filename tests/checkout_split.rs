use axum_marketplace_api::pricing::{DeliveryFeePolicy, FlatFee};
use axum_marketplace_api::services::order_service::{CartLine, split_by_shop};
use uuid::Uuid;

fn line(shop_id: Uuid, quantity: i32, unit_price: i64) -> CartLine {
    CartLine {
        product_id: Uuid::new_v4(),
        shop_id,
        quantity,
        unit_price,
    }
}

#[test]
fn empty_cart_produces_no_groups() {
    assert!(split_by_shop(Vec::new()).is_empty());
}

#[test]
fn single_shop_cart_stays_one_group() {
    let shop = Uuid::new_v4();
    let groups = split_by_shop(vec![line(shop, 2, 700), line(shop, 1, 300)]);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].shop_id, shop);
    assert_eq!(groups[0].subtotal, 1700);
    assert_eq!(groups[0].lines.len(), 2);
}

#[test]
fn two_shop_cart_splits_into_two_orders() {
    // Two units at 1000 from one shop, one unit at 5000 from another, with a
    // 1500 flat fee: expect subtotals 2000 and 5000, payable 3500 and 6500.
    let shop_a = Uuid::new_v4();
    let shop_b = Uuid::new_v4();
    let groups = split_by_shop(vec![line(shop_a, 2, 1000), line(shop_b, 1, 5000)]);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].shop_id, shop_a);
    assert_eq!(groups[0].subtotal, 2000);
    assert_eq!(groups[0].lines.len(), 1);
    assert_eq!(groups[0].lines[0].quantity, 2);
    assert_eq!(groups[0].lines[0].unit_price, 1000);
    assert_eq!(groups[1].shop_id, shop_b);
    assert_eq!(groups[1].subtotal, 5000);
    assert_eq!(groups[1].lines.len(), 1);

    let fees = FlatFee::new(1500);
    assert_eq!(groups[0].subtotal + fees.quote(groups[0].subtotal), 3500);
    assert_eq!(groups[1].subtotal + fees.quote(groups[1].subtotal), 6500);
}

#[test]
fn every_line_lands_in_its_own_shop_group_and_nothing_is_lost() {
    let shops = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
    let lines = vec![
        line(shops[0], 1, 100),
        line(shops[1], 3, 250),
        line(shops[0], 2, 400),
        line(shops[2], 5, 60),
        line(shops[1], 1, 999),
    ];
    let total_in: i64 = lines
        .iter()
        .map(|l| l.unit_price * l.quantity as i64)
        .sum();

    let groups = split_by_shop(lines);

    assert_eq!(groups.len(), shops.len());
    for group in &groups {
        for l in &group.lines {
            assert_eq!(l.shop_id, group.shop_id);
        }
        let group_sum: i64 = group
            .lines
            .iter()
            .map(|l| l.unit_price * l.quantity as i64)
            .sum();
        assert_eq!(group.subtotal, group_sum);
    }

    let total_out: i64 = groups.iter().map(|g| g.subtotal).sum();
    assert_eq!(total_out, total_in);
}

#[test]
fn groups_keep_first_seen_shop_order() {
    let shop_a = Uuid::new_v4();
    let shop_b = Uuid::new_v4();
    let groups = split_by_shop(vec![
        line(shop_b, 1, 10),
        line(shop_a, 1, 20),
        line(shop_b, 1, 30),
    ]);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].shop_id, shop_b);
    assert_eq!(groups[0].subtotal, 40);
    assert_eq!(groups[1].shop_id, shop_a);
    assert_eq!(groups[1].subtotal, 20);
}

#[test]
fn flat_fee_ignores_subtotal() {
    let fees = FlatFee::default();
    assert_eq!(fees.quote(0), 1500);
    assert_eq!(fees.quote(100), 1500);
    assert_eq!(fees.quote(1_000_000), 1500);

    let fees = FlatFee::new(2000);
    assert_eq!(fees.quote(500), 2000);
}

// Property-based tests for the join and derive stages.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use rust_decimal::Decimal;

use concilia_recon::config::{ColumnRename, DuplicatePolicy, FormulaConfig, JoinConfig};
use concilia_recon::derived::derive_row;
use concilia_recon::join::join_all;
use concilia_recon::model::{OrderRecord, PaymentRecord, PriceRecord, Table};
use concilia_recon::normalize::rename_columns;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Money with two decimal places.
fn arb_money() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_order() -> impl Strategy<Value = OrderRecord> {
    ("[0-9]{1,3}", "[A-D]", arb_money(), 0i64..500).prop_map(|(id, sku, price, qty)| OrderRecord {
        order_id: id,
        product_name: format!("product {sku}"),
        sku,
        unit_price: price,
        quantity: qty,
        order_date: None,
    })
}

fn arb_payment() -> impl Strategy<Value = PaymentRecord> {
    ("[0-9]{1,3}", proptest::option::of(arb_money())).prop_map(|(id, received)| PaymentRecord {
        order_id: id,
        received,
    })
}

fn arb_price() -> impl Strategy<Value = PriceRecord> {
    ("[A-F]", proptest::option::of(arb_money()), proptest::option::of(arb_money())).prop_map(
        |(sku, cost, pack)| PriceRecord {
            sku,
            product_cost: cost,
            packaging_cost: pack,
        },
    )
}

fn keep_first() -> JoinConfig {
    JoinConfig {
        duplicate_keys: DuplicatePolicy::KeepFirst,
        strict_joins: false,
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config())]

    #[test]
    fn left_join_preserves_order_count(
        orders in prop::collection::vec(arb_order(), 1..40),
        payments in prop::collection::vec(arb_payment(), 0..40),
        prices in prop::collection::vec(arb_price(), 0..10),
    ) {
        let n = orders.len();
        let out = join_all(orders, payments, prices, &keep_first()).unwrap();
        prop_assert_eq!(out.rows.len(), n);
    }

    #[test]
    fn total_sale_is_exact_product(
        orders in prop::collection::vec(arb_order(), 1..20),
        prices in prop::collection::vec(arb_price(), 0..10),
    ) {
        let out = join_all(orders, vec![], prices, &keep_first()).unwrap();
        for joined in &out.rows {
            let row = derive_row(joined, &FormulaConfig::default()).unwrap();
            prop_assert_eq!(row.total_sale, joined.order.unit_price * Decimal::from(joined.order.quantity));
            if row.product_cost.is_none() || row.packaging_cost.is_none() {
                prop_assert!(row.total_cost.is_none());
            }
            prop_assert!(row.net_result.is_none());
        }
    }

    #[test]
    fn rename_twice_equals_once(
        headers in prop::collection::vec("[a-e]{1,2}", 0..8),
    ) {
        let renames = vec![
            ColumnRename::new("a", "order_id"),
            ColumnRename::new("b", "sku"),
            ColumnRename::new("cc", "cc"),
            ColumnRename::new("zz", "received"),
        ];
        let t = Table::new(headers);
        let once = rename_columns(&t, &renames);
        let twice = rename_columns(&once, &renames);
        prop_assert_eq!(once.headers, twice.headers);
    }
}

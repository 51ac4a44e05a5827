use rust_decimal::Decimal;

use concilia_recon::config::ReconConfig;
use concilia_recon::engine::run;
use concilia_recon::model::{ReconInput, ReconResult, ResultSign, Table};
use concilia_recon::{ProcessingError, ReconError, Role};

const CANONICAL: &str = r#"
name = "Canonical"

[roles.orders]
[roles.payments]
[roles.prices]
"#;

fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
    Table {
        headers: headers.iter().map(|s| s.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
    }
}

fn orders(rows: &[&[&str]]) -> Table {
    table(&["order_id", "product_name", "sku", "unit_price", "quantity"], rows)
}

fn payments(rows: &[&[&str]]) -> Table {
    table(&["order_id", "received"], rows)
}

fn prices(rows: &[&[&str]]) -> Table {
    table(&["sku", "product_cost", "packaging_cost"], rows)
}

fn reconcile(input: ReconInput) -> Result<ReconResult, ReconError> {
    let config = ReconConfig::from_toml(CANONICAL).unwrap();
    run(&config, &input)
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn scenario_a_all_sources_match() {
    let result = reconcile(ReconInput {
        orders: orders(&[&["1", "Caneca", "A", "10", "2"]]),
        payments: payments(&[&["1", "18"]]),
        prices: prices(&[&["A", "3", "1"]]),
    })
    .unwrap();

    let row = &result.rows[0];
    assert_eq!(row.total_sale, Decimal::from(20));
    assert_eq!(row.total_cost, Some(Decimal::from(7)));
    assert_eq!(row.net_result, Some(Decimal::from(11)));
    assert_eq!(result.summary.result_sign, ResultSign::Positive);
}

#[test]
fn scenario_b_missing_payment() {
    let result = reconcile(ReconInput {
        orders: orders(&[&["1", "Caneca", "A", "10", "2"], &["2", "Caneca", "A", "10", "1"]]),
        payments: payments(&[&["1", "18"]]),
        prices: prices(&[&["A", "3", "1"]]),
    })
    .unwrap();

    assert_eq!(result.rows.len(), 2);
    let row = &result.rows[1];
    assert_eq!(row.order_id, "2");
    assert_eq!(row.received, None);
    assert_eq!(row.net_result, None);
}

#[test]
fn scenario_c_missing_price() {
    let result = reconcile(ReconInput {
        orders: orders(&[&["1", "Prato", "Z", "10", "2"]]),
        payments: payments(&[&["1", "18"]]),
        prices: prices(&[&["A", "3", "1"]]),
    })
    .unwrap();

    assert_eq!(result.rows.len(), 1);
    let row = &result.rows[0];
    assert_eq!(row.product_cost, None);
    assert_eq!(row.packaging_cost, None);
    assert_eq!(row.total_cost, None);
    assert_eq!(row.net_result, None);
}

#[test]
fn scenario_d_zero_received_does_not_crash() {
    let result = reconcile(ReconInput {
        orders: orders(&[&["1", "Caneca", "A", "10", "2"]]),
        payments: payments(&[&["1", "0"]]),
        prices: prices(&[&["A", "3", "1"]]),
    })
    .unwrap();

    let row = &result.rows[0];
    assert_eq!(row.net_result, Some(Decimal::from(-7)));
    assert_eq!(row.margin_pct, None);
    assert_eq!(result.summary.mean_margin_pct, None);
}

// -------------------------------------------------------------------------
// Error policy
// -------------------------------------------------------------------------

#[test]
fn duplicate_price_skus_are_rejected() {
    let err = reconcile(ReconInput {
        orders: orders(&[&["1", "Caneca", "A", "10", "2"]]),
        payments: payments(&[&["1", "18"]]),
        prices: prices(&[&["A", "3", "1"], &["A", "4", "1"]]),
    })
    .unwrap_err();

    match err {
        ReconError::Processing(ProcessingError::DuplicateKeys { role, keys, .. }) => {
            assert_eq!(role, Role::Prices);
            assert_eq!(keys[0].key, "A");
            assert_eq!(keys[0].count, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_price_is_a_processing_error() {
    let err = reconcile(ReconInput {
        orders: orders(&[&["1", "Caneca", "A", "dez", "2"]]),
        payments: payments(&[]),
        prices: prices(&[]),
    })
    .unwrap_err();
    assert!(matches!(err, ReconError::Processing(ProcessingError::InvalidValue { .. })));
}

#[test]
fn empty_orders_is_a_join_error() {
    let err = reconcile(ReconInput {
        orders: orders(&[]),
        payments: payments(&[&["1", "18"]]),
        prices: prices(&[]),
    })
    .unwrap_err();
    assert!(matches!(err, ReconError::Processing(ProcessingError::JoinKey { .. })));
}

// -------------------------------------------------------------------------
// Marketplace preset
// -------------------------------------------------------------------------

#[test]
fn marketplace_preset_reconciles_native_headers() {
    let config = ReconConfig::preset("marketplace").unwrap();
    let input = ReconInput {
        orders: table(
            &[
                "ID do pedido",
                "Status do pedido",
                "Data de criação",
                "Nome do produto",
                "Número de referência",
                "Preço acordado",
                "Quantidade",
            ],
            &[
                &["240501AB", "Concluído", "2024-05-01 10:12", "Caneca", "CAN-01", "29,90", "2"],
                &["240502CD", "Concluído", "2024-05-02 18:40", "Prato", "PRA-02", "15,00", "1"],
            ],
        ),
        payments: table(
            &["Data", "ID do pedido", "Tipo", "Valor"],
            &[
                &["2024-05-03", "240501AB", "Renda do pedido", "50,12"],
                &["2024-05-04", "999999ZZ", "Renda do pedido", "10,00"],
            ],
        ),
        prices: table(
            &["SKU", "Custo do Produto"],
            &[&["CAN-01", "12,50"], &["PRA-02", "6,00"]],
        ),
    };

    let result = run(&config, &input).unwrap();
    assert_eq!(result.rows.len(), 2);

    let mug = &result.rows[0];
    assert_eq!(mug.total_sale, "59.80".parse::<Decimal>().unwrap());
    // 12.50 * 2 + 1 adjustment
    assert_eq!(mug.total_cost, Some("26.00".parse::<Decimal>().unwrap()));
    assert_eq!(mug.net_result, Some("24.12".parse::<Decimal>().unwrap()));

    assert_eq!(result.rows[1].received, None);
    assert_eq!(result.summary.orphan_payments, 1);
    assert_eq!(result.by_date.len(), 2);
}

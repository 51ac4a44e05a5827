use tracing::{debug, info};

use crate::aggregate::{summarize, totals_by_date};
use crate::config::{OutputConfig, ReconConfig};
use crate::derived::derive_row;
use crate::error::ReconError;
use crate::join::join_all;
use crate::model::{ReconInput, ReconMeta, ReconResult, ReconciledRow, Role, Table};
use crate::normalize::normalize;
use crate::records::{order_records, payment_records, price_records};

/// Run one reconciliation pass. All-or-nothing: any error aborts the pass.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    let orders = normalize(Role::Orders, &input.orders, &config.roles.orders)?;
    let payments = normalize(Role::Payments, &input.payments, &config.roles.payments)?;
    let prices = normalize(Role::Prices, &input.prices, &config.roles.prices)?;

    let orders = order_records(&orders)?;
    let payments = payment_records(&payments)?;
    let prices = price_records(&prices, config.formulas.packaging)?;
    debug!(
        orders = orders.len(),
        payments = payments.len(),
        prices = prices.len(),
        "records extracted"
    );

    let joined = join_all(orders, payments, prices, &config.joins)?;

    let rows = joined
        .rows
        .iter()
        .map(|r| derive_row(r, &config.formulas))
        .collect::<Result<Vec<_>, _>>()?;

    let summary = summarize(&rows, joined.orphan_payments)?;
    let by_date = totals_by_date(&rows)?;

    info!(
        config = %config.name,
        rows = summary.rows,
        unpaid = summary.unpaid_rows,
        unpriced = summary.unpriced_rows,
        orphan_payments = summary.orphan_payments,
        "reconciliation complete"
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        by_date,
        rows,
    })
}

/// Lay out reconciled rows in the configured export column order.
pub fn export_table(rows: &[ReconciledRow], output: &OutputConfig) -> Table {
    let headers = output.columns.iter().map(|c| c.header.clone()).collect();
    let mut table = Table::new(headers);
    table.rows = rows
        .iter()
        .map(|row| output.columns.iter().map(|c| c.field.render(row)).collect())
        .collect();
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    const CONFIG: &str = r#"
name = "Engine test"

[roles.orders]
rename = [
  { from = "id", to = "order_id" },
  { from = "name", to = "product_name" },
  { from = "price", to = "unit_price" },
  { from = "qty", to = "quantity" },
]

[roles.payments]
rename = [
  { from = "id", to = "order_id" },
  { from = "value", to = "received" },
]

[roles.prices]
rename = [
  { from = "cost", to = "product_cost" },
  { from = "pack", to = "packaging_cost" },
]
"#;

    fn input() -> ReconInput {
        ReconInput {
            orders: table(
                &["id", "name", "sku", "price", "qty"],
                &[&["1", "Caneca", "A", "10", "2"], &["2", "Prato", "B", "5", "1"]],
            ),
            payments: table(&["id", "value"], &[&["1", "18"]]),
            prices: table(&["sku", "cost", "pack"], &[&["A", "3", "1"]]),
        }
    }

    #[test]
    fn end_to_end_in_memory() {
        let config = ReconConfig::from_toml(CONFIG).unwrap();
        let result = run(&config, &input()).unwrap();

        assert_eq!(result.rows.len(), 2);
        let first = &result.rows[0];
        assert_eq!(first.total_sale, Decimal::from(20));
        assert_eq!(first.total_cost, Some(Decimal::from(7)));
        assert_eq!(first.net_result, Some(Decimal::from(11)));

        let second = &result.rows[1];
        assert_eq!(second.received, None);
        assert_eq!(second.total_cost, None);

        assert_eq!(result.summary.net_result, Decimal::from(11));
        assert_eq!(result.summary.unpaid_rows, 1);
        assert_eq!(result.summary.unpriced_rows, 1);
        assert_eq!(result.meta.config_name, "Engine test");
    }

    #[test]
    fn missing_column_aborts_pass() {
        let config = ReconConfig::from_toml(CONFIG).unwrap();
        let mut input = input();
        input.payments = table(&["id", "amount"], &[&["1", "18"]]);
        let err = run(&config, &input).unwrap_err();
        assert_eq!(err.to_string(), "role 'payments': missing column 'received'");
    }

    #[test]
    fn summary_overflow_fails_the_pass() {
        let config = ReconConfig::from_toml(CONFIG).unwrap();
        let mut input = input();
        input.orders = table(
            &["id", "name", "sku", "price", "qty"],
            &[
                &["1", "Caneca", "A", "40000000000000000000000000000", "1"],
                &["2", "Caneca", "A", "40000000000000000000000000000", "1"],
            ],
        );
        let err = run(&config, &input).unwrap_err();
        assert!(matches!(err, ReconError::Processing(_)), "{err}");
        assert!(err.to_string().contains("arithmetic overflow"), "{err}");
    }

    #[test]
    fn export_uses_configured_columns() {
        let config = ReconConfig::from_toml(&format!(
            r#"{CONFIG}
[[output.columns]]
field = "order_id"
header = "Pedido"

[[output.columns]]
field = "net_result"
header = "Liquido"
"#
        ))
        .unwrap();
        let result = run(&config, &input()).unwrap();
        let t = export_table(&result.rows, &config.output);
        assert_eq!(t.headers, vec!["Pedido", "Liquido"]);
        assert_eq!(t.rows[0], vec!["1", "11"]);
        assert_eq!(t.rows[1], vec!["2", ""]);
    }

    #[test]
    fn result_serializes_to_json() {
        let config = ReconConfig::from_toml(CONFIG).unwrap();
        let result = run(&config, &input()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["summary"]["result_sign"], "positive");
        assert_eq!(json["rows"].as_array().unwrap().len(), 2);
    }
}

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ProcessingError;
use crate::model::{DailyTotal, Metric, ProductTotal, ReconSummary, ReconciledRow, ResultSign};

fn add(acc: &mut Decimal, value: Decimal, what: &str) -> Result<(), ProcessingError> {
    *acc = acc
        .checked_add(value)
        .ok_or_else(|| ProcessingError::Other(format!("arithmetic overflow summing {what}")))?;
    Ok(())
}

/// Sum totals across all rows. Null cells are skipped.
pub fn summarize(rows: &[ReconciledRow], orphan_payments: usize) -> Result<ReconSummary, ProcessingError> {
    let mut total_sale = Decimal::ZERO;
    let mut total_received = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;
    let mut net_result = Decimal::ZERO;
    let mut margin_sum = Decimal::ZERO;
    let mut margin_count = 0u32;
    let mut unpaid_rows = 0;
    let mut unpriced_rows = 0;

    for row in rows {
        add(&mut total_sale, row.total_sale, "total sale")?;
        match row.received {
            Some(r) => add(&mut total_received, r, "received")?,
            None => unpaid_rows += 1,
        }
        if row.product_cost.is_none() {
            unpriced_rows += 1;
        }
        if let Some(c) = row.total_cost {
            add(&mut total_cost, c, "total cost")?;
        }
        if let Some(n) = row.net_result {
            add(&mut net_result, n, "net result")?;
        }
        if let Some(m) = row.margin_pct {
            add(&mut margin_sum, m, "margin")?;
            margin_count += 1;
        }
    }

    let mean_margin_pct = if margin_count > 0 {
        Some((margin_sum / Decimal::from(margin_count)).round_dp(4))
    } else {
        None
    };

    Ok(ReconSummary {
        rows: rows.len(),
        total_sale,
        total_received,
        total_cost,
        net_result,
        mean_margin_pct,
        unpaid_rows,
        unpriced_rows,
        orphan_payments,
        result_sign: ResultSign::of(net_result),
    })
}

/// Group by order date, earliest first. Undated rows come first as `None`.
pub fn totals_by_date(rows: &[ReconciledRow]) -> Result<Vec<DailyTotal>, ProcessingError> {
    let mut groups: BTreeMap<Option<NaiveDate>, (usize, Decimal, Decimal)> = BTreeMap::new();

    for row in rows {
        let entry = groups
            .entry(row.order_date)
            .or_insert((0, Decimal::ZERO, Decimal::ZERO));
        entry.0 += 1;
        add(&mut entry.1, row.total_sale, "total sale by date")?;
        if let Some(n) = row.net_result {
            add(&mut entry.2, n, "net result by date")?;
        }
    }

    Ok(groups
        .into_iter()
        .map(|(date, (rows, total_sale, net_result))| DailyTotal {
            date,
            rows,
            total_sale,
            net_result,
        })
        .collect())
}

/// Rank products by the summed metric, highest first; ties by name.
///
/// Rows with an empty product name are grouped under their SKU. Sums saturate
/// at the `Decimal` range, since the ranking only needs their order.
pub fn top_products(rows: &[ReconciledRow], metric: Metric, n: usize) -> Vec<ProductTotal> {
    let mut sums: HashMap<&str, Decimal> = HashMap::new();
    for row in rows {
        let Some(value) = metric.value(row) else {
            continue;
        };
        let product = if row.product_name.is_empty() {
            row.sku.as_str()
        } else {
            row.product_name.as_str()
        };
        let sum = sums.entry(product).or_insert(Decimal::ZERO);
        *sum = sum.saturating_add(value);
    }

    let mut ranked: Vec<ProductTotal> = sums
        .into_iter()
        .map(|(product, value)| ProductTotal {
            product: product.to_string(),
            value,
        })
        .collect();
    ranked.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.product.cmp(&b.product)));
    ranked.truncate(n);
    ranked
}

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use crate::config::{DuplicatePolicy, JoinConfig};
use crate::error::{DuplicateKey, ProcessingError};
use crate::model::{columns, OrderRecord, PaymentRecord, PriceRecord, Role};

/// An order line with whatever its payment and price lookups found.
#[derive(Debug, Clone)]
pub struct JoinedRow {
    pub order: OrderRecord,
    pub payment: Option<PaymentRecord>,
    pub price: Option<PriceRecord>,
}

#[derive(Debug)]
pub struct JoinOutput {
    pub rows: Vec<JoinedRow>,
    /// Payments whose order id never appears in the orders table.
    pub orphan_payments: usize,
}

/// Left join: every left row is kept, paired with each matching right row or
/// with `None`. Duplicate right keys produce one output row per match.
pub fn left_join<L, R, KL, KR>(left: Vec<L>, right: &[R], left_key: KL, right_key: KR) -> Vec<(L, Option<R>)>
where
    L: Clone,
    R: Clone,
    KL: Fn(&L) -> &str,
    KR: Fn(&R) -> &str,
{
    let mut index: HashMap<&str, Vec<&R>> = HashMap::new();
    for r in right {
        index.entry(right_key(r)).or_default().push(r);
    }

    let mut out = Vec::with_capacity(left.len());
    for l in left {
        match index.get(left_key(&l)) {
            Some(matches) => {
                for r in matches {
                    out.push((l.clone(), Some((*r).clone())));
                }
            }
            None => out.push((l, None)),
        }
    }
    out
}

/// Keys that appear more than once, sorted by key.
pub fn find_duplicates<R>(rows: &[R], key: impl Fn(&R) -> &str) -> Vec<DuplicateKey> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(key(row)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, count)| DuplicateKey {
            key: key.to_string(),
            count,
        })
        .collect()
}

/// Apply the duplicate-key policy to a lookup table before it is joined.
pub fn enforce_unique<R>(
    role: Role,
    column: &'static str,
    rows: Vec<R>,
    key: impl Fn(&R) -> &str,
    policy: DuplicatePolicy,
) -> Result<Vec<R>, ProcessingError> {
    let dups = find_duplicates(&rows, &key);
    if dups.is_empty() {
        return Ok(rows);
    }

    match policy {
        DuplicatePolicy::Error => Err(ProcessingError::DuplicateKeys {
            role,
            column,
            keys: dups,
        }),
        DuplicatePolicy::KeepFirst => {
            warn!(%role, column, duplicates = dups.len(), "duplicate join keys, keeping first occurrence");
            let mut seen = HashSet::new();
            let kept = rows
                .into_iter()
                .filter(|r| seen.insert(key(r).to_string()))
                .collect();
            Ok(kept)
        }
        DuplicatePolicy::FanOut => {
            warn!(%role, column, duplicates = dups.len(), "duplicate join keys, rows will fan out");
            Ok(rows)
        }
    }
}

/// Orders ⟕ payments on order id, then ⟕ prices on SKU.
pub fn join_all(
    orders: Vec<OrderRecord>,
    payments: Vec<PaymentRecord>,
    prices: Vec<PriceRecord>,
    config: &JoinConfig,
) -> Result<JoinOutput, ProcessingError> {
    if orders.is_empty() {
        return Err(ProcessingError::JoinKey {
            join: "orders-payments",
            reason: "the orders table has no rows".into(),
        });
    }

    let payments = enforce_unique(
        Role::Payments,
        columns::ORDER_ID,
        payments,
        |p| p.order_id.as_str(),
        config.duplicate_keys,
    )?;
    let prices = enforce_unique(
        Role::Prices,
        columns::SKU,
        prices,
        |p| p.sku.as_str(),
        config.duplicate_keys,
    )?;

    let order_ids: HashSet<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
    let orphan_payments = payments
        .iter()
        .filter(|p| !order_ids.contains(p.order_id.as_str()))
        .count();

    let with_payments = left_join(orders, &payments, |o| o.order_id.as_str(), |p| p.order_id.as_str());
    if config.strict_joins && !payments.is_empty() && with_payments.iter().all(|(_, p)| p.is_none()) {
        return Err(ProcessingError::JoinKey {
            join: "orders-payments",
            reason: "no order id matched any payment".into(),
        });
    }

    let with_prices = left_join(
        with_payments,
        &prices,
        |(o, _)| o.sku.as_str(),
        |p| p.sku.as_str(),
    );
    if config.strict_joins && !prices.is_empty() && with_prices.iter().all(|(_, p)| p.is_none()) {
        return Err(ProcessingError::JoinKey {
            join: "orders-prices",
            reason: "no SKU matched any price entry".into(),
        });
    }

    let rows = with_prices
        .into_iter()
        .map(|((order, payment), price)| JoinedRow { order, payment, price })
        .collect();

    Ok(JoinOutput { rows, orphan_payments })
}

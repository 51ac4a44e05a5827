//! Derived columns: total sale, total cost, net result, margin.

use rust_decimal::Decimal;

use crate::config::{FormulaConfig, ZeroReceivedPolicy};
use crate::error::ProcessingError;
use crate::join::JoinedRow;
use crate::model::ReconciledRow;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const MARGIN_DP: u32 = 4;

fn overflow(what: &str, order_id: &str) -> ProcessingError {
    ProcessingError::Other(format!("order '{order_id}': arithmetic overflow computing {what}"))
}

pub fn total_sale(unit_price: Decimal, quantity: i64) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// `product_cost × quantity + packaging + adjustment`. `None` on overflow.
pub fn total_cost(product_cost: Decimal, packaging_cost: Decimal, quantity: i64, adjustment: Decimal) -> Option<Decimal> {
    product_cost
        .checked_mul(Decimal::from(quantity))?
        .checked_add(packaging_cost)?
        .checked_add(adjustment)
}

/// Net result over the received amount, as a percentage.
pub fn margin_pct(net_result: Decimal, received: Decimal, order_id: &str) -> Result<Decimal, ProcessingError> {
    if received.is_zero() {
        return Err(ProcessingError::DivisionUndefined {
            order_id: order_id.to_string(),
        });
    }
    net_result
        .checked_div(received)
        .and_then(|r| r.checked_mul(HUNDRED))
        .map(|m| m.round_dp(MARGIN_DP))
        .ok_or_else(|| overflow("margin", order_id))
}

pub fn derive_row(joined: &JoinedRow, formulas: &FormulaConfig) -> Result<ReconciledRow, ProcessingError> {
    let order = &joined.order;
    let received = joined.payment.as_ref().and_then(|p| p.received);
    let product_cost = joined.price.as_ref().and_then(|p| p.product_cost);
    let packaging_cost = joined.price.as_ref().and_then(|p| p.packaging_cost);

    let total_sale = total_sale(order.unit_price, order.quantity)
        .ok_or_else(|| overflow("total sale", &order.order_id))?;

    let total_cost = match (product_cost, packaging_cost) {
        (Some(cost), Some(pack)) => Some(
            total_cost(cost, pack, order.quantity, formulas.cost_adjustment)
                .ok_or_else(|| overflow("total cost", &order.order_id))?,
        ),
        _ => None,
    };

    let net_result = match (received, total_cost) {
        (Some(r), Some(c)) => Some(
            r.checked_sub(c)
                .ok_or_else(|| overflow("net result", &order.order_id))?,
        ),
        _ => None,
    };

    let margin_pct = match (net_result, received) {
        (Some(net), Some(r)) => match margin_pct(net, r, &order.order_id) {
            Ok(m) => Some(m),
            Err(ProcessingError::DivisionUndefined { .. }) => match formulas.zero_received {
                ZeroReceivedPolicy::Null => None,
                ZeroReceivedPolicy::Zero => Some(Decimal::ZERO),
            },
            Err(e) => return Err(e),
        },
        _ => None,
    };

    Ok(ReconciledRow {
        order_id: order.order_id.clone(),
        order_date: order.order_date,
        product_name: order.product_name.clone(),
        sku: order.sku.clone(),
        unit_price: order.unit_price,
        quantity: order.quantity,
        received,
        product_cost,
        packaging_cost,
        total_sale,
        total_cost,
        net_result,
        margin_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderRecord, PaymentRecord, PriceRecord};
    use std::str::FromStr;

    fn joined(received: Option<i64>, price: Option<(i64, i64)>) -> JoinedRow {
        JoinedRow {
            order: OrderRecord {
                order_id: "1".into(),
                product_name: "Caneca".into(),
                sku: "A".into(),
                unit_price: Decimal::from(10),
                quantity: 2,
                order_date: None,
            },
            payment: received.map(|v| PaymentRecord {
                order_id: "1".into(),
                received: Some(Decimal::from(v)),
            }),
            price: price.map(|(cost, pack)| PriceRecord {
                sku: "A".into(),
                product_cost: Some(Decimal::from(cost)),
                packaging_cost: Some(Decimal::from(pack)),
            }),
        }
    }

    #[test]
    fn all_present() {
        let row = derive_row(&joined(Some(18), Some((3, 1))), &FormulaConfig::default()).unwrap();
        assert_eq!(row.total_sale, Decimal::from(20));
        assert_eq!(row.total_cost, Some(Decimal::from(7)));
        assert_eq!(row.net_result, Some(Decimal::from(11)));
        assert_eq!(row.margin_pct, Some(Decimal::from_str("61.1111").unwrap()));
    }

    #[test]
    fn adjustment_is_added_to_cost() {
        let formulas = FormulaConfig {
            cost_adjustment: Decimal::ONE,
            ..FormulaConfig::default()
        };
        let row = derive_row(&joined(Some(18), Some((3, 0))), &formulas).unwrap();
        assert_eq!(row.total_cost, Some(Decimal::from(7)));
    }

    #[test]
    fn missing_payment_nulls_net_result() {
        let row = derive_row(&joined(None, Some((3, 1))), &FormulaConfig::default()).unwrap();
        assert_eq!(row.received, None);
        assert_eq!(row.total_cost, Some(Decimal::from(7)));
        assert_eq!(row.net_result, None);
        assert_eq!(row.margin_pct, None);
    }

    #[test]
    fn missing_price_nulls_costs() {
        let row = derive_row(&joined(Some(18), None), &FormulaConfig::default()).unwrap();
        assert_eq!(row.product_cost, None);
        assert_eq!(row.packaging_cost, None);
        assert_eq!(row.total_cost, None);
        assert_eq!(row.net_result, None);
        assert_eq!(row.total_sale, Decimal::from(20));
    }

    #[test]
    fn zero_received_margin_follows_policy() {
        let row = derive_row(&joined(Some(0), Some((3, 1))), &FormulaConfig::default()).unwrap();
        assert_eq!(row.net_result, Some(Decimal::from(-7)));
        assert_eq!(row.margin_pct, None);

        let formulas = FormulaConfig {
            zero_received: ZeroReceivedPolicy::Zero,
            ..FormulaConfig::default()
        };
        let row = derive_row(&joined(Some(0), Some((3, 1))), &formulas).unwrap();
        assert_eq!(row.margin_pct, Some(Decimal::ZERO));
    }

    #[test]
    fn margin_raises_division_undefined() {
        let err = margin_pct(Decimal::ONE, Decimal::ZERO, "42").unwrap_err();
        assert!(matches!(err, ProcessingError::DivisionUndefined { ref order_id } if order_id == "42"));
    }
}

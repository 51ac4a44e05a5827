//! Typed record extraction from normalized tables.

use rust_decimal::Decimal;

use crate::error::{ProcessingError, ReconError};
use crate::model::{columns, OrderRecord, PaymentRecord, PriceRecord, Role, Table};
use crate::value::{parse_date, parse_decimal, parse_quantity};

fn require(table: &Table, role: Role, column: &str) -> Result<usize, ReconError> {
    table.column_index(column).ok_or_else(|| ReconError::MissingColumn {
        role,
        column: column.into(),
    })
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Reads one typed cell. Blank cells are `None`; unparseable ones are an error.
struct CellReader<'a> {
    role: Role,
    row: usize,
    cells: &'a [String],
}

impl<'a> CellReader<'a> {
    fn text(&self, idx: usize) -> String {
        self.cells.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
    }

    fn parsed<T>(
        &self,
        idx: usize,
        column: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, ProcessingError> {
        let raw = self.cells.get(idx).map(String::as_str).unwrap_or("");
        if raw.trim().is_empty() {
            return Ok(None);
        }
        parse(raw).map(Some).ok_or_else(|| ProcessingError::InvalidValue {
            role: self.role,
            row: self.row,
            column,
            value: raw.to_string(),
        })
    }

    fn required<T>(
        &self,
        idx: usize,
        column: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, ProcessingError> {
        self.parsed(idx, column, parse)?
            .ok_or_else(|| ProcessingError::InvalidValue {
                role: self.role,
                row: self.row,
                column,
                value: String::new(),
            })
    }
}

fn rows(table: &Table, role: Role) -> impl Iterator<Item = CellReader<'_>> {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, r)| !is_blank(r))
        .map(move |(i, cells)| CellReader { role, row: i + 1, cells })
}

pub fn order_records(table: &Table) -> Result<Vec<OrderRecord>, ReconError> {
    let role = Role::Orders;
    let order_id = require(table, role, columns::ORDER_ID)?;
    let product_name = require(table, role, columns::PRODUCT_NAME)?;
    let sku = require(table, role, columns::SKU)?;
    let unit_price = require(table, role, columns::UNIT_PRICE)?;
    let quantity = require(table, role, columns::QUANTITY)?;
    let order_date = table.column_index(columns::ORDER_DATE);

    let mut out = Vec::with_capacity(table.len());
    for r in rows(table, role) {
        let date = match order_date {
            Some(idx) => r.parsed(idx, columns::ORDER_DATE, parse_date)?,
            None => None,
        };
        out.push(OrderRecord {
            order_id: r.text(order_id),
            product_name: r.text(product_name),
            sku: r.text(sku),
            unit_price: r.required(unit_price, columns::UNIT_PRICE, parse_decimal)?,
            quantity: r.required(quantity, columns::QUANTITY, parse_quantity)?,
            order_date: date,
        });
    }
    Ok(out)
}

pub fn payment_records(table: &Table) -> Result<Vec<PaymentRecord>, ReconError> {
    let role = Role::Payments;
    let order_id = require(table, role, columns::ORDER_ID)?;
    let received = require(table, role, columns::RECEIVED)?;

    let mut out = Vec::with_capacity(table.len());
    for r in rows(table, role) {
        out.push(PaymentRecord {
            order_id: r.text(order_id),
            received: r.parsed(received, columns::RECEIVED, parse_decimal)?,
        });
    }
    Ok(out)
}

/// Without a packaging column every matched SKU gets a zero packaging cost.
pub fn price_records(table: &Table, packaging: bool) -> Result<Vec<PriceRecord>, ReconError> {
    let role = Role::Prices;
    let sku = require(table, role, columns::SKU)?;
    let product_cost = require(table, role, columns::PRODUCT_COST)?;
    let packaging_cost = if packaging {
        Some(require(table, role, columns::PACKAGING_COST)?)
    } else {
        None
    };

    let mut out = Vec::with_capacity(table.len());
    for r in rows(table, role) {
        let packaging_cost = match packaging_cost {
            Some(idx) => r.parsed(idx, columns::PACKAGING_COST, parse_decimal)?,
            None => Some(Decimal::ZERO),
        };
        out.push(PriceRecord {
            sku: r.text(sku),
            product_cost: r.parsed(product_cost, columns::PRODUCT_COST, parse_decimal)?,
            packaging_cost,
        });
    }
    Ok(out)
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Which upload a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Orders,
    Payments,
    Prices,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Orders, Role::Payments, Role::Prices];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Payments => "payments",
            Self::Prices => "prices",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Canonical column vocabulary
// ---------------------------------------------------------------------------

pub mod columns {
    pub const ORDER_ID: &str = "order_id";
    pub const ORDER_DATE: &str = "order_date";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const SKU: &str = "sku";
    pub const UNIT_PRICE: &str = "unit_price";
    pub const QUANTITY: &str = "quantity";
    pub const RECEIVED: &str = "received";
    pub const PRODUCT_COST: &str = "product_cost";
    pub const PACKAGING_COST: &str = "packaging_cost";
}

// ---------------------------------------------------------------------------
// Row-set
// ---------------------------------------------------------------------------

/// A parsed upload: header names plus string cells.
///
/// Rows may be shorter than the header; missing trailing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// One purchased line item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: String,
    pub product_name: String,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub order_date: Option<NaiveDate>,
}

/// One settled payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub order_id: String,
    pub received: Option<Decimal>,
}

/// Cost entry for one SKU.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub sku: String,
    pub product_cost: Option<Decimal>,
    pub packaging_cost: Option<Decimal>,
}

/// Raw tables for one reconciliation pass, before normalization.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub orders: Table,
    pub payments: Table,
    pub prices: Table,
}

impl ReconInput {
    pub fn table(&self, role: Role) -> &Table {
        match role {
            Role::Orders => &self.orders,
            Role::Payments => &self.payments,
            Role::Prices => &self.prices,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// An order line after both joins and the derived columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledRow {
    pub order_id: String,
    pub order_date: Option<NaiveDate>,
    pub product_name: String,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub received: Option<Decimal>,
    pub product_cost: Option<Decimal>,
    pub packaging_cost: Option<Decimal>,
    pub total_sale: Decimal,
    pub total_cost: Option<Decimal>,
    pub net_result: Option<Decimal>,
    pub margin_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSign {
    Positive,
    Negative,
    Zero,
}

impl ResultSign {
    pub fn of(value: Decimal) -> Self {
        if value.is_zero() {
            Self::Zero
        } else if value.is_sign_negative() {
            Self::Negative
        } else {
            Self::Positive
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconSummary {
    pub rows: usize,
    pub total_sale: Decimal,
    pub total_received: Decimal,
    pub total_cost: Decimal,
    pub net_result: Decimal,
    /// Mean over rows whose margin is defined.
    pub mean_margin_pct: Option<Decimal>,
    /// Order rows with no matching payment.
    pub unpaid_rows: usize,
    /// Order rows whose SKU has no price entry.
    pub unpriced_rows: usize,
    /// Payment rows dropped by the left join.
    pub orphan_payments: usize,
    pub result_sign: ResultSign,
}

/// Sums for one order date. `date = None` collects undated rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: Option<NaiveDate>,
    pub rows: usize,
    pub total_sale: Decimal,
    pub net_result: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductTotal {
    pub product: String,
    pub value: Decimal,
}

/// Per-product ranking metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalSale,
    NetResult,
    Quantity,
    TotalCost,
    Received,
}

impl Metric {
    pub fn value(&self, row: &ReconciledRow) -> Option<Decimal> {
        match self {
            Self::TotalSale => Some(row.total_sale),
            Self::NetResult => row.net_result,
            Self::Quantity => Some(Decimal::from(row.quantity)),
            Self::TotalCost => row.total_cost,
            Self::Received => row.received,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TotalSale => write!(f, "total_sale"),
            Self::NetResult => write!(f, "net_result"),
            Self::Quantity => write!(f, "quantity"),
            Self::TotalCost => write!(f, "total_cost"),
            Self::Received => write!(f, "received"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub by_date: Vec<DailyTotal>,
    pub rows: Vec<ReconciledRow>,
}

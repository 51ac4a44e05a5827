use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{ReconciledRow, Role};
use crate::value::{parse_date, parse_decimal};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub roles: Roles,
    #[serde(default)]
    pub formulas: FormulaConfig,
    #[serde(default)]
    pub joins: JoinConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Built-in configs, embedded at compile time.
pub const PRESETS: &[(&str, &str)] = &[
    ("marketplace", include_str!("../presets/marketplace.toml")),
    ("standard", include_str!("../presets/standard.toml")),
];

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Roles {
    pub orders: RoleConfig,
    pub payments: RoleConfig,
    pub prices: RoleConfig,
}

impl Roles {
    pub fn get(&self, role: Role) -> &RoleConfig {
        match role {
            Role::Orders => &self.orders,
            Role::Payments => &self.payments,
            Role::Prices => &self.prices,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleConfig {
    /// Case-insensitive file name substrings that identify this role.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Preamble rows before the header row.
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub rename: Vec<ColumnRename>,
    #[serde(default)]
    pub filter: Option<RowFilter>,
    #[serde(default)]
    pub range: Option<RangeFilter>,
}

impl RoleConfig {
    pub fn matches_file(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.patterns
            .iter()
            .any(|p| lower.contains(&p.to_lowercase()))
    }
}

/// One source-name → canonical-name entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
}

impl ColumnRename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

/// Keep rows whose `column` value is one of `values`. `"all"` keeps everything.
#[derive(Debug, Clone, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub values: Vec<String>,
}

impl RowFilter {
    pub const ALL: &'static str = "all";

    pub fn is_passthrough(&self) -> bool {
        self.values.iter().any(|v| v == Self::ALL)
    }
}

/// Keep rows whose `column` value lies within `[min, max]`. Either bound may
/// be omitted. Bounds are dates when they parse as dates, numbers otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeFilter {
    pub column: String,
    #[serde(default)]
    pub min: Option<String>,
    #[serde(default)]
    pub max: Option<String>,
}

/// A parsed range bound or cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeValue {
    Number(Decimal),
    Date(NaiveDate),
}

impl RangeValue {
    pub fn parse(raw: &str) -> Option<Self> {
        parse_date(raw)
            .map(Self::Date)
            .or_else(|| parse_decimal(raw).map(Self::Number))
    }

    /// Parse `raw` as the same kind of value as `self`.
    pub fn parse_like(&self, raw: &str) -> Option<Self> {
        match self {
            Self::Number(_) => parse_decimal(raw).map(Self::Number),
            Self::Date(_) => parse_date(raw).map(Self::Date),
        }
    }

    fn same_kind(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Number(_), Self::Number(_)) | (Self::Date(_), Self::Date(_))
        )
    }

    /// `None` when the kinds differ.
    pub fn compare(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Inclusive bounds of a range filter, both of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBounds {
    pub min: Option<RangeValue>,
    pub max: Option<RangeValue>,
}

impl RangeBounds {
    /// A present bound to parse cells against.
    pub fn kind(&self) -> Option<RangeValue> {
        self.min.or(self.max)
    }

    pub fn contains(&self, value: &RangeValue) -> bool {
        let above_min = self
            .min
            .map_or(true, |lo| value.compare(&lo).is_some_and(|o| o.is_ge()));
        let below_max = self
            .max
            .map_or(true, |hi| value.compare(&hi).is_some_and(|o| o.is_le()));
        above_min && below_max
    }
}

impl RangeFilter {
    pub fn bounds(&self) -> Result<RangeBounds, String> {
        let parse = |label: &str, raw: &Option<String>| -> Result<Option<RangeValue>, String> {
            match raw {
                None => Ok(None),
                Some(s) => RangeValue::parse(s)
                    .map(Some)
                    .ok_or_else(|| format!("range {label} '{s}' is neither a date nor a number")),
            }
        };
        let min = parse("min", &self.min)?;
        let max = parse("max", &self.max)?;

        match (min, max) {
            (None, None) => Err("range needs a min or a max".into()),
            (Some(lo), Some(hi)) if !lo.same_kind(&hi) => {
                Err("range min and max must both be dates or both be numbers".into())
            }
            (Some(lo), Some(hi)) if lo.compare(&hi).is_some_and(|o| o.is_gt()) => {
                Err("range min is greater than max".into())
            }
            _ => Ok(RangeBounds { min, max }),
        }
    }
}

// ---------------------------------------------------------------------------
// Formulas + joins
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FormulaConfig {
    /// Price table carries a packaging cost column.
    #[serde(default = "default_true")]
    pub packaging: bool,
    /// Fixed amount added to every total cost.
    #[serde(default)]
    pub cost_adjustment: Decimal,
    #[serde(default)]
    pub zero_received: ZeroReceivedPolicy,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            packaging: true,
            cost_adjustment: Decimal::ZERO,
            zero_received: ZeroReceivedPolicy::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Margin value when the received amount is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroReceivedPolicy {
    #[default]
    Null,
    Zero,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinConfig {
    #[serde(default)]
    pub duplicate_keys: DuplicatePolicy,
    /// Fail when a join matches nothing although the right side has rows.
    #[serde(default)]
    pub strict_joins: bool,
}

/// What to do with repeated payment order ids or price SKUs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Error,
    KeepFirst,
    FanOut,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_columns")]
    pub columns: Vec<OutputColumn>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { columns: default_output_columns() }
    }
}

fn default_output_columns() -> Vec<OutputColumn> {
    OutputField::ALL
        .iter()
        .map(|f| OutputColumn { field: *f, header: f.canonical_name().to_string() })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputColumn {
    pub field: OutputField,
    pub header: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputField {
    OrderId,
    OrderDate,
    ProductName,
    Sku,
    UnitPrice,
    Quantity,
    TotalSale,
    ProductCost,
    PackagingCost,
    TotalCost,
    Received,
    NetResult,
    MarginPct,
}

impl OutputField {
    pub const ALL: [OutputField; 13] = [
        Self::OrderId,
        Self::OrderDate,
        Self::ProductName,
        Self::Sku,
        Self::UnitPrice,
        Self::Quantity,
        Self::TotalSale,
        Self::ProductCost,
        Self::PackagingCost,
        Self::TotalCost,
        Self::Received,
        Self::NetResult,
        Self::MarginPct,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::OrderId => "order_id",
            Self::OrderDate => "order_date",
            Self::ProductName => "product_name",
            Self::Sku => "sku",
            Self::UnitPrice => "unit_price",
            Self::Quantity => "quantity",
            Self::TotalSale => "total_sale",
            Self::ProductCost => "product_cost",
            Self::PackagingCost => "packaging_cost",
            Self::TotalCost => "total_cost",
            Self::Received => "received",
            Self::NetResult => "net_result",
            Self::MarginPct => "margin_pct",
        }
    }

    /// Numeric fields are written as numbers in spreadsheet exports.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::OrderId | Self::OrderDate | Self::ProductName | Self::Sku)
    }

    /// Render a row's value. Nulls render as an empty string.
    pub fn render(&self, row: &ReconciledRow) -> String {
        fn opt(v: Option<Decimal>) -> String {
            v.map(|d| d.to_string()).unwrap_or_default()
        }
        match self {
            Self::OrderId => row.order_id.clone(),
            Self::OrderDate => row
                .order_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            Self::ProductName => row.product_name.clone(),
            Self::Sku => row.sku.clone(),
            Self::UnitPrice => row.unit_price.to_string(),
            Self::Quantity => row.quantity.to_string(),
            Self::TotalSale => row.total_sale.to_string(),
            Self::ProductCost => opt(row.product_cost),
            Self::PackagingCost => opt(row.packaging_cost),
            Self::TotalCost => opt(row.total_cost),
            Self::Received => opt(row.received),
            Self::NetResult => opt(row.net_result),
            Self::MarginPct => opt(row.margin_pct.map(|m| m.round_dp(2))),
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Money formatting for summary cards.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: char,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            decimal_separator: default_decimal_separator(),
            thousands_separator: default_thousands_separator(),
        }
    }
}

fn default_currency_symbol() -> String {
    "$".into()
}

fn default_decimal_separator() -> char {
    '.'
}

fn default_thousands_separator() -> char {
    ','
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn preset(name: &str) -> Result<Self, ReconError> {
        let (_, source) = PRESETS
            .iter()
            .find(|(preset, _)| *preset == name)
            .ok_or_else(|| {
                let known: Vec<&str> = PRESETS.iter().map(|(n, _)| *n).collect();
                ReconError::ConfigValidation(format!(
                    "unknown preset '{name}' (known: {})",
                    known.join(", ")
                ))
            })?;
        Self::from_toml(source)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        for role in Role::ALL {
            let rc = self.roles.get(role);
            validate_renames(role, &rc.rename)?;

            if rc.patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "role '{role}': empty file pattern"
                )));
            }

            if let Some(ref filter) = rc.filter {
                if filter.column.trim().is_empty() || filter.values.is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "role '{role}': filter needs a column and at least one value"
                    )));
                }
            }

            if let Some(ref range) = rc.range {
                if range.column.trim().is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "role '{role}': range needs a column"
                    )));
                }
                range
                    .bounds()
                    .map_err(|e| ReconError::ConfigValidation(format!("role '{role}': {e}")))?;
            }
        }

        if self.output.columns.is_empty() {
            return Err(ReconError::ConfigValidation(
                "output.columns must not be empty".into(),
            ));
        }
        let mut headers = HashSet::new();
        for col in &self.output.columns {
            if col.header.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "output column for '{}' has an empty header",
                    col.field.canonical_name()
                )));
            }
            if !headers.insert(col.header.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate output header '{}'",
                    col.header
                )));
            }
        }

        Ok(())
    }
}

/// Reject rename tables that are not a plain one-step mapping.
///
/// Identity entries are allowed. A target may not be another entry's source,
/// so applying the table twice is the same as applying it once.
pub fn validate_renames(role: Role, renames: &[ColumnRename]) -> Result<(), ReconError> {
    let mut sources = HashSet::new();
    let mut targets = HashSet::new();

    for r in renames {
        if r.from.trim().is_empty() || r.to.trim().is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "role '{role}': rename entries need non-empty 'from' and 'to'"
            )));
        }
        if !sources.insert(r.from.as_str()) {
            return Err(ReconError::ConfigValidation(format!(
                "role '{role}': column '{}' renamed twice",
                r.from
            )));
        }
        if !targets.insert(r.to.as_str()) {
            return Err(ReconError::ConfigValidation(format!(
                "role '{role}': two columns renamed to '{}'",
                r.to
            )));
        }
    }

    for r in renames {
        if r.from != r.to && sources.contains(r.to.as_str()) {
            return Err(ReconError::ConfigValidation(format!(
                "role '{role}': '{}' -> '{}' chains into another rename",
                r.from, r.to
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

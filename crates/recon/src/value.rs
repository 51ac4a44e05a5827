//! Cell value parsing: money, quantities, dates.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const CURRENCY_PREFIXES: &[&str] = &["R$", "US$", "$"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a money or plain decimal value.
///
/// Accepts an optional currency prefix and either `.` or `,` as the decimal
/// separator. When both appear, the last one is the decimal separator.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim();
    let negative = s.starts_with('-');
    if negative {
        s = s[1..].trim_start();
    }
    for prefix in CURRENCY_PREFIXES {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim_start();
            break;
        }
    }
    // `R$ -12,00`: sign after the symbol. Only one sign overall.
    let negative = match s.strip_prefix('-') {
        Some(rest) if !negative => {
            s = rest.trim_start();
            true
        }
        Some(_) => return None,
        None => negative,
    };
    if s.starts_with('-') || (negative && s.starts_with('+')) {
        return None;
    }

    let compact: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if compact.is_empty() {
        return None;
    }

    let last_dot = compact.rfind('.');
    let last_comma = compact.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(d), Some(c)) if c > d => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (None, Some(_)) if compact.matches(',').count() == 1 => compact.replace(',', "."),
        (None, Some(_)) => compact.replace(',', ""),
        (Some(_), None) if compact.matches('.').count() > 1 => compact.replace('.', ""),
        _ => compact,
    };

    let value = Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()?;
    Some(if negative { -value } else { value })
}

/// Parse an integer quantity. Integral decimals (`2.0`) are accepted.
pub fn parse_quantity(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    let d = parse_decimal(s)?;
    if d.fract().is_zero() {
        d.to_i64()
    } else {
        None
    }
}

/// Parse a date or date-time cell, keeping the date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

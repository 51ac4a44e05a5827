//! Human-readable summary output: result cards, per-date table, top-N bar chart.

use concilia_recon::config::DisplayConfig;
use concilia_recon::model::{DailyTotal, ProductTotal, ResultSign};
use concilia_recon::{Metric, ReconResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const BAR_WIDTH: usize = 30;

/// `R$ 1.234,56` / `$ -12.00`: symbol, space, signed amount with two decimals.
pub fn format_money(value: Decimal, display: &DisplayConfig) -> String {
    format!("{} {}", display.currency_symbol, format_number(value, 2, display))
}

pub fn format_pct(value: Option<Decimal>, display: &DisplayConfig) -> String {
    match value {
        Some(v) => format!("{}%", format_number(v, 2, display)),
        None => "n/a".to_string(),
    }
}

fn format_number(value: Decimal, dp: u32, display: &DisplayConfig) -> String {
    let rounded = value.round_dp(dp);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let fixed = format!("{:.*}", dp as usize, rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(display.thousands_separator);
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push(display.decimal_separator);
        out.push_str(frac_part);
    }
    out
}

fn sign_label(sign: ResultSign) -> &'static str {
    match sign {
        ResultSign::Positive => "positive",
        ResultSign::Negative => "negative",
        ResultSign::Zero => "zero",
    }
}

pub fn summary_cards(result: &ReconResult, display: &DisplayConfig) -> String {
    let s = &result.summary;
    let money = |v| format_money(v, display);
    let mut out = String::new();
    out.push_str(&format!("{} ({} rows)\n", result.meta.config_name, s.rows));
    out.push_str(&format!("  Total sale       {}\n", money(s.total_sale)));
    out.push_str(&format!("  Received         {}\n", money(s.total_received)));
    out.push_str(&format!("  Total cost       {}\n", money(s.total_cost)));
    out.push_str(&format!(
        "  Net result       {} ({})\n",
        money(s.net_result),
        sign_label(s.result_sign)
    ));
    out.push_str(&format!("  Mean margin      {}\n", format_pct(s.mean_margin_pct, display)));
    if s.unpaid_rows + s.unpriced_rows + s.orphan_payments > 0 {
        out.push_str(&format!(
            "  Unmatched        {} unpaid, {} unpriced, {} orphan payments\n",
            s.unpaid_rows, s.unpriced_rows, s.orphan_payments
        ));
    }
    out
}

pub fn by_date_table(days: &[DailyTotal], display: &DisplayConfig) -> String {
    let mut out = format!("{:<12} {:>6} {:>18} {:>18}\n", "date", "rows", "total sale", "net result");
    for day in days {
        let date = day
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "(no date)".to_string());
        out.push_str(&format!(
            "{:<12} {:>6} {:>18} {:>18}\n",
            date,
            day.rows,
            format_money(day.total_sale, display),
            format_money(day.net_result, display)
        ));
    }
    out
}

/// Horizontal bars scaled to the largest value. Non-positive values get no bar.
pub fn top_chart(products: &[ProductTotal], metric: Metric, display: &DisplayConfig) -> String {
    if products.is_empty() {
        return format!("top products by {metric}: no data\n");
    }

    let max = products
        .iter()
        .map(|p| p.value)
        .max()
        .filter(|m| m.is_sign_positive() && !m.is_zero());
    let label_width = products.iter().map(|p| p.product.chars().count()).max().unwrap_or(0).min(40);

    let mut out = format!("top products by {metric}\n");
    for p in products {
        let bar_len = match max {
            Some(max) if p.value > Decimal::ZERO => {
                ((p.value / max) * Decimal::from(BAR_WIDTH)).round().to_usize().unwrap_or(0).max(1)
            }
            _ => 0,
        };
        let value = match metric {
            Metric::Quantity => p.value.normalize().to_string(),
            _ => format_money(p.value, display),
        };
        let label: String = p.product.chars().take(label_width).collect();
        out.push_str(&format!(
            "  {:<width$}  {:<bar$}  {}\n",
            label,
            "█".repeat(bar_len),
            value,
            width = label_width,
            bar = BAR_WIDTH
        ));
    }
    out
}

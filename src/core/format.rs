//! Number and currency display helpers.

use crate::core::currency::Currency;

#[derive(Debug, Clone, Copy)]
pub struct CurrencyFormat {
    pub compact: bool,
    pub decimals: usize,
    pub show_symbol: bool,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            compact: false,
            decimals: 2,
            show_symbol: true,
        }
    }
}

/// Inserts thousands separators into a fixed-point rendering of `value`.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && rendered.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Formats `value` in `currency`. Compact mode abbreviates thousands,
/// millions and billions with one decimal.
pub fn format_currency_value(value: f64, currency: Currency, opts: CurrencyFormat) -> String {
    let symbol = if opts.show_symbol {
        currency.symbol()
    } else {
        ""
    };

    if opts.compact {
        for (threshold, suffix) in [(1e9, "B"), (1e6, "M"), (1e3, "K")] {
            if value.abs() >= threshold {
                return format!("{symbol}{:.1}{suffix}", value / threshold);
            }
        }
    }

    let grouped = group_thousands(value, opts.decimals);
    match grouped.strip_prefix('-') {
        Some(rest) => format!("-{symbol}{rest}"),
        None => format!("{symbol}{grouped}"),
    }
}

/// Large dollar amounts such as market caps: "$1.23T", "$4.50B".
pub fn format_large_number(number: Option<f64>) -> String {
    let Some(number) = number.filter(|n| *n != 0.0) else {
        return "N/A".to_string();
    };
    for (threshold, suffix) in [(1e12, "T"), (1e9, "B"), (1e6, "M")] {
        if number >= threshold {
            return format!("${:.2}{suffix}", number / threshold);
        }
    }
    format!("${}", group_thousands(number, 0))
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v != 0.0 => format!("{v:.2}%"),
        _ => "N/A".to_string(),
    }
}

/// Turns slugs like "consumer-cyclical" into "Consumer Cyclical".
pub fn format_category_name(name: Option<&str>, null_sub: Option<&str>) -> String {
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return null_sub.unwrap_or("-").to_string();
    };

    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for ch in name.chars() {
        let ch = if ch == '-' { ' ' } else { ch };
        if at_word_start && ch.is_alphanumeric() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !(ch.is_alphanumeric() || ch == '_');
    }
    out
}

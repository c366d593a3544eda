//! pt-BR display formatting for the dashboard (reference currency BRL).

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::SaleStatus;

/// `R$ 1.234,56`; negatives as `-R$ 1,00`.
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    format!("{sign}R$ {},{frac_part}", group_thousands(int_part))
}

/// `12.345`
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// `+12.5%`, `-3.1%`, `0.0%`; `n/d` when the change is unavailable.
pub fn format_percentage(value: Option<Decimal>) -> String {
    match value {
        None => "n/d".into(),
        Some(v) => {
            let mut v = v.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
            if v.is_zero() {
                v = Decimal::ZERO;
            }
            let prefix = if v > Decimal::ZERO { "+" } else { "" };
            format!("{prefix}{v:.1}%")
        }
    }
}

/// `20/07/2024 14:05`
pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

pub fn status_label(status: SaleStatus) -> &'static str {
    match status {
        SaleStatus::Approved => "Aprovado",
        SaleStatus::Refunded => "Reembolsado",
        SaleStatus::Cancelled => "Cancelado",
        SaleStatus::Unknown => "Pendente",
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

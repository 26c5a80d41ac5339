//! Currency conversion calculator
//!
//! Pure helpers turning a fiat amount into platform tokens or the ETH
//! equivalent at the current spot price. Missing or unparseable inputs fail
//! softly to "0"; callers treat that as "not yet computable", not a real zero.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

/// Tokens purchasable for a fiat amount, rounded to 2 decimal places.
pub fn tokens_for_fiat(fiat_amount: &str, token_price: f64) -> String {
    divide_rounded(fiat_amount, token_price, 2)
}

/// ETH equivalent of a fiat amount, rounded to 6 decimal places.
pub fn crypto_for_fiat(fiat_amount: &str, crypto_price: f64) -> String {
    divide_rounded(fiat_amount, crypto_price, 6)
}

fn divide_rounded(fiat_amount: &str, price: f64, dp: u32) -> String {
    let fiat = match Decimal::from_str(fiat_amount.trim()) {
        Ok(v) => v,
        Err(_) => return "0".to_string(),
    };
    let price = match Decimal::from_f64(price) {
        Some(p) if p > Decimal::ZERO => p,
        _ => return "0".to_string(),
    };
    if fiat.is_zero() {
        return "0".to_string();
    }
    let quotient = (fiat / price).round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.prec$}", quotient, prec = dp as usize)
}

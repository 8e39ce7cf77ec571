//! Input sanitization and format validation
//!
//! Free text is trimmed and has markup-sensitive characters escaped before it
//! is stored. Escaping never double-encodes an entity that is already present,
//! so sanitizing a sanitized value returns it unchanged.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

use super::result::{Error, Result};

/// Entities produced by [`sanitize`]; an `&` that starts one of these is kept as-is
const KNOWN_ENTITIES: &[&str] = &["&amp;", "&lt;", "&gt;", "&quot;", "&#039;", "&#39;"];

/// Decimal places kept for money amounts
pub const MONEY_SCALE: u32 = 2;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\+?[0-9(][0-9 ().\-]{5,18}[0-9]$").expect("phone pattern is valid")
    })
}

/// Trim and escape a free-text value
pub fn sanitize(input: &str) -> String {
    let trimmed = input.trim();
    let mut out = String::with_capacity(trimmed.len());

    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '&' => {
                let rest = &trimmed[idx..];
                if KNOWN_ENTITIES.iter().any(|e| rest.starts_with(e)) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }

    out
}

/// Check an (already sanitized) email address
pub fn validate_email(email: &str) -> Result<()> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(Error::validation(format!("invalid email address: {}", email)))
    }
}

/// Check an (already sanitized) phone number
pub fn validate_phone(phone: &str) -> Result<()> {
    if phone_regex().is_match(phone) {
        Ok(())
    } else {
        Err(Error::validation(format!("invalid phone number: {}", phone)))
    }
}

/// Round a money amount to cents (banker's rounding)
pub fn normalize_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

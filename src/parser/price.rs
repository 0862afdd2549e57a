use serde::{Deserialize, Serialize};

/// Price as it arrives from storage: sometimes a number, usually a formatted
/// string like "1,050,000원".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceField {
    Number(i64),
    Float(f64),
    Text(String),
}

/// Positive integer amount, or `None` when the field is unusable.
pub fn parse_price(value: &PriceField) -> Option<i64> {
    match value {
        PriceField::Number(n) if *n > 0 => Some(*n),
        PriceField::Number(_) => None,
        PriceField::Float(f) if *f > 0.0 => Some(f.round() as i64),
        PriceField::Float(_) => None,
        PriceField::Text(raw) => parse_price_text(raw),
    }
}

/// Strips every non-digit character and parses the remainder base-10.
pub fn parse_price_text(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<i64>().ok()?;
    (value > 0).then_some(value)
}

/// "1045000" -> "1,045,000원" for human-facing output.
pub fn format_currency(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{grouped}원")
    } else {
        format!("{grouped}원")
    }
}

//! Free-form price values as they appear on marketplace listings.
//!
//! Listing prices are farmer-entered and arrive in mixed shapes: a bare
//! number, `"KSh 1,200"`, `"12.50/bird"`, or prose like `"Contact for
//! price"`. The raw value is preserved for display; all arithmetic goes
//! through exactly one normalization function.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price exactly as captured from a listing: either a JSON number or a
/// decorated string.
///
/// Use [`RawPrice::normalized`] for any money math. Never duplicate the
/// strip-and-parse rule elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    /// A plain numeric price.
    Number(f64),
    /// A free-form price string, possibly decorated with currency, ranges,
    /// or units.
    Text(String),
}

impl RawPrice {
    /// Normalize to a decimal amount.
    ///
    /// Every character that is not an ASCII digit or a decimal point is
    /// stripped; the remainder is parsed as a decimal. An empty or
    /// unparseable remainder normalizes to zero, so prose prices like
    /// `"Contact for price"` contribute nothing to a subtotal.
    #[must_use]
    pub fn normalized(&self) -> Decimal {
        let text = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        };
        let stripped: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if stripped.is_empty() {
            return Decimal::ZERO;
        }
        stripped.parse().unwrap_or(Decimal::ZERO)
    }

    /// The raw value rendered for display.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl Default for RawPrice {
    fn default() -> Self {
        Self::Text("0".to_owned())
    }
}

impl From<&str> for RawPrice {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for RawPrice {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for RawPrice {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_normalize_currency_prefix_and_separator() {
        assert_eq!(RawPrice::from("KSh 1,200").normalized(), dec("1200"));
    }

    #[test]
    fn test_normalize_unit_suffix() {
        assert_eq!(RawPrice::from("12.50/bird").normalized(), dec("12.50"));
    }

    #[test]
    fn test_normalize_prose_is_zero() {
        assert_eq!(RawPrice::from("Contact for price").normalized(), Decimal::ZERO);
    }

    #[test]
    fn test_normalize_plain_number() {
        assert_eq!(RawPrice::Number(450.0).normalized(), dec("450"));
    }

    #[test]
    fn test_normalize_multiple_points_is_zero() {
        // Two decimal points cannot parse; treated as no price.
        assert_eq!(RawPrice::from("1.2.3").normalized(), Decimal::ZERO);
    }

    #[test]
    fn test_serde_accepts_number_or_string() {
        let n: RawPrice = serde_json::from_str("950").unwrap();
        assert_eq!(n.normalized(), dec("950"));
        let s: RawPrice = serde_json::from_str("\"KSh 950\"").unwrap();
        assert_eq!(s.normalized(), dec("950"));
    }

    #[test]
    fn test_default_is_zero() {
        assert_eq!(RawPrice::default().normalized(), Decimal::ZERO);
    }
}

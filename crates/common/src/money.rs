//! Price strings as the storefront renders them

use once_cell::sync::Lazy;
use regex::Regex;

static CURRENCY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$\d+\.\d{2}$").unwrap());

/// Parse "$1,234.56" into 1234.56
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    cleaned.trim().parse::<f64>().ok()
}

/// Strict "$12.34" form
pub fn is_currency_format(text: &str) -> bool {
    CURRENCY.is_match(text.trim())
}

/// Empty carts render their total as zero in either decimal style
pub fn is_zero_amount(text: &str) -> bool {
    text.contains("0.00") || text.contains("0,00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("$1,234.56", Some(1234.56) ; "thousands separator")]
    #[test_case(" $89.00 ", Some(89.0) ; "padded")]
    #[test_case("12", Some(12.0) ; "bare number")]
    #[test_case("$", None ; "symbol only")]
    #[test_case("Free", None ; "text")]
    fn test_parse_amount(input: &str, expected: Option<f64>) {
        assert_eq!(parse_amount(input), expected);
    }

    #[test_case("$0.00", true ; "zero")]
    #[test_case("$129.99", true ; "amount")]
    #[test_case("$1,299.99", false ; "separator")]
    #[test_case("129.99", false ; "no symbol")]
    #[test_case("$12.5", false ; "one decimal")]
    fn test_is_currency_format(input: &str, expected: bool) {
        assert_eq!(is_currency_format(input), expected);
    }

    #[test]
    fn test_is_zero_amount() {
        assert!(is_zero_amount("$0.00"));
        assert!(is_zero_amount("0,00 €"));
        assert!(!is_zero_amount("$19.99"));
    }
}

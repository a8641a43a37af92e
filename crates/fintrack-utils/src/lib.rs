//! Utility functions and helpers

use rust_decimal::{Decimal, RoundingStrategy};

/// Format a number with thousands separators
pub fn format_number<T: ToString>(n: T) -> String {
    let s = n.to_string();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    let grouped: String = result.chars().rev().collect();
    format!("{}{}", sign, grouped)
}

/// Round an amount half away from zero and render it with a fixed number of decimals
pub fn fixed_decimals(amount: Decimal, places: u32) -> String {
    let rounded = amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", places as usize, rounded)
}

/// Format an amount with thousands separators and a fixed number of decimals
pub fn format_amount(amount: Decimal, places: u32) -> String {
    let fixed = fixed_decimals(amount, places);
    match fixed.split_once('.') {
        Some((whole, fraction)) => format!("{}.{}", format_number(whole), fraction),
        None => format_number(fixed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(-1234), "-1,234");
    }

    #[test]
    fn test_fixed_decimals() {
        assert_eq!(fixed_decimals(Decimal::new(125, 1), 2), "12.50");
        assert_eq!(fixed_decimals(Decimal::new(12345, 3), 2), "12.35");
        assert_eq!(fixed_decimals(Decimal::new(7, 0), 0), "7");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::new(123456789, 2), 2), "1,234,567.89");
        assert_eq!(format_amount(Decimal::new(-250000, 2), 2), "-2,500.00");
        assert_eq!(format_amount(Decimal::new(42, 0), 0), "42");
    }
}

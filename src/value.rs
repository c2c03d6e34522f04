//! Price aggregation into the final value estimate.

use regex::Regex;

/// Floored arithmetic mean of the prices that parse as plain dollar amounts.
///
/// Currency signs and thousands separators are stripped first; anything that
/// is not a pure digit sequence afterwards ("N/A", empty text, ranges) is
/// excluded. No parsable prices at all yields 0.
pub fn average_price<'a, I>(prices: I) -> i64
where
    I: IntoIterator<Item = &'a str>,
{
    let digits = Regex::new(r"^\d+$").unwrap();

    let mut kept: Vec<i64> = Vec::new();
    for raw in prices {
        let cleaned = raw.replace('$', "").replace(',', "").trim().to_string();
        if digits.is_match(&cleaned) {
            if let Ok(value) = cleaned.parse::<i64>() {
                kept.push(value);
            }
        }
    }

    if kept.is_empty() {
        return 0;
    }
    kept.iter().sum::<i64>() / kept.len() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_formatted_prices() {
        assert_eq!(average_price(["$250,000", "$260,000"]), 255_000);
    }

    #[test]
    fn empty_input_yields_zero() {
        assert_eq!(average_price([]), 0);
    }

    #[test]
    fn unparsable_prices_are_excluded() {
        assert_eq!(average_price(["N/A"]), 0);
        assert_eq!(average_price(["$300,000", "N/A", ""]), 300_000);
        assert_eq!(average_price(["$1,200/mo", "$100"]), 100);
    }

    #[test]
    fn mean_is_floored() {
        assert_eq!(average_price(["$100", "$101"]), 100);
    }
}

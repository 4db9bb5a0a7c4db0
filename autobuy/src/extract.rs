//! Amount extraction from free-form step output
//!
//! The balance agent prints human-oriented log lines rather than a structured
//! result, so the amount is recovered by pattern. All recognised forms are
//! scanned together and the one that starts rightmost wins, which favours
//! final summary lines over intermediate values.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker an agent can print to report its result unambiguously
pub const AMOUNT_MARKER: &str = "AUTOBUY_AMOUNT=";

/// Digits optionally grouped by commas in threes
const DIGITS: &str = r"\d{1,3}(?:,\d{3})+|\d+";

static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    // Each alternative captures its digits in its own group
    let pattern = format!(
        r"(?i)AUTOBUY_AMOUNT=(\d+)|₩\s*({DIGITS})|({DIGITS})\s*(?:원|won\b|krw\b)"
    );
    Regex::new(&pattern).expect("amount pattern is a valid regex")
});

/// Extract the rightmost currency amount from `text`
///
/// Returns `None` when no amount is present, or when the rightmost match does
/// not fit in a `u64`. An earlier match is never used as a fallback.
pub fn extract_amount(text: &str) -> Option<u64> {
    let captures = AMOUNT_PATTERN.captures_iter(text).last()?;
    let digits = (1..=3).find_map(|group| captures.get(group))?.as_str();
    parse_grouped(digits)
}

fn parse_grouped(digits: &str) -> Option<u64> {
    let plain: String = digits.chars().filter(|c| *c != ',').collect();
    if plain.is_empty() {
        return None;
    }
    plain.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_match_wins() {
        let text = "Deposit Balance: 12,500원\nsome noise\nAvailable Amount: 9,000원\n";
        assert_eq!(extract_amount(text), Some(9000));
    }

    #[test]
    fn test_balance_agent_output() {
        let text = "Navigating to My Page...\n\
                    Current URL: https://m.example.test/mypage/home\n \
                    -> Found deposit balance: '15,000' (via #navTotalAmt)\n\
                    Deposit Balance: 15,000 won\n\
                    Available Amount: 15,000 won\n";
        assert_eq!(extract_amount(text), Some(15000));
    }

    #[test]
    fn test_no_marked_amount_is_absent() {
        assert_eq!(extract_amount(""), None);
        assert_eq!(extract_amount("Waiting for balance elements... 3 retries"), None);
        assert_eq!(extract_amount("Current URL: https://example.test/page/12500"), None);
    }

    #[test]
    fn test_marker_variants() {
        assert_eq!(extract_amount("balance 5000 KRW"), Some(5000));
        assert_eq!(extract_amount("balance 5000krw."), Some(5000));
        assert_eq!(extract_amount("Auto mode: 5 game(s) (₩5,000)"), Some(5000));
        assert_eq!(extract_amount("잔액 20,000 원"), Some(20000));
        assert_eq!(extract_amount("result AUTOBUY_AMOUNT=31000\n"), Some(31000));
    }

    #[test]
    fn test_structured_marker_competes_by_position() {
        let text = "AUTOBUY_AMOUNT=1000\nAvailable Amount: 2,000 won";
        assert_eq!(extract_amount(text), Some(2000));

        let text = "Available Amount: 2,000 won\nAUTOBUY_AMOUNT=1000";
        assert_eq!(extract_amount(text), Some(1000));
    }

    #[test]
    fn test_marker_must_be_a_whole_word() {
        assert_eq!(extract_amount("3 wonders of the world"), None);
    }

    #[test]
    fn test_overflow_of_rightmost_match_is_absent() {
        let text = "Deposit Balance: 100원\nAvailable: 99999999999999999999999원";
        assert_eq!(extract_amount(text), None);
    }

    #[test]
    fn test_zero_is_a_usable_amount() {
        assert_eq!(extract_amount("Available Amount: 0 won"), Some(0));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let text = "Deposit Balance: 12,500원\nAvailable Amount: 9,000원";
        assert_eq!(extract_amount(text), extract_amount(text));
    }

    #[test]
    fn test_parse_grouped() {
        assert_eq!(parse_grouped("1,234,567"), Some(1_234_567));
        assert_eq!(parse_grouped(","), None);
        assert_eq!(parse_grouped(""), None);
    }
}

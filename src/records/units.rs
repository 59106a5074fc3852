//! Base-unit arithmetic for wei-denominated decimal strings

use ethers_core::types::U256;

/// Decimals of the native currency on every supported network
pub const NATIVE_DECIMALS: u32 = 18;

/// True for a non-empty run of ASCII digits (no sign, no fraction)
pub fn is_base_units(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a base-unit decimal string
pub fn parse_base_units(s: &str) -> Option<U256> {
    if !is_base_units(s) {
        return None;
    }
    U256::from_dec_str(s).ok()
}

/// Render `amount / 10^decimals` with `places` fraction digits, rounding half up.
///
/// Exact integer arithmetic, so "1000000000000000000" + "2000000000000000000"
/// renders as "3.00" without float drift.
pub fn format_scaled(amount: U256, decimals: u32, places: u32) -> String {
    let places = places.min(decimals);
    let scale = U256::exp10((decimals - places) as usize);

    let mut rounded = amount / scale;
    let rem = amount % scale;
    if !scale.is_zero() && rem + rem >= scale {
        rounded = rounded.saturating_add(U256::one());
    }

    if places == 0 {
        return rounded.to_string();
    }

    let unit = U256::exp10(places as usize);
    let whole = rounded / unit;
    let frac = rounded % unit;
    format!(
        "{}.{:0>width$}",
        whole,
        frac.to_string(),
        width = places as usize
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei(s: &str) -> U256 {
        U256::from_dec_str(s).unwrap()
    }

    #[test]
    fn test_whole_ether() {
        let sum = wei("1000000000000000000") + wei("2000000000000000000");
        assert_eq!(format_scaled(sum, 18, 2), "3.00");
    }

    #[test]
    fn test_rounds_half_up() {
        assert_eq!(format_scaled(wei("5000000000000000"), 18, 2), "0.01");
        assert_eq!(format_scaled(wei("4999999999999999"), 18, 2), "0.00");
        assert_eq!(format_scaled(wei("1995000000000000000"), 18, 2), "2.00");
    }

    #[test]
    fn test_zero() {
        assert_eq!(format_scaled(U256::zero(), 18, 2), "0.00");
        assert_eq!(format_scaled(U256::zero(), 18, 0), "0");
    }

    #[test]
    fn test_base_unit_strings() {
        assert!(is_base_units("0"));
        assert!(is_base_units("300000000000000"));
        assert!(!is_base_units(""));
        assert!(!is_base_units("0.5"));
        assert!(!is_base_units("-1"));
        assert_eq!(parse_base_units("42"), Some(U256::from(42u64)));
        assert_eq!(parse_base_units("4e2"), None);
    }
}

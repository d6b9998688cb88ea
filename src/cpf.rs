//! CPF validation and formatting.
//!
//! A CPF is the 11-digit Brazilian taxpayer number. The last two digits
//! are check digits computed with a weighted sum mod 11 over the
//! preceding digits. All functions here are pure and never panic.

/// Strip everything except ASCII digits.
pub fn clean(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Full validity check: 11 digits, not all identical, both check digits
/// match the weighted-mod-11 computation.
pub fn is_valid(input: &str) -> bool {
    let digits = clean(input);
    if digits.len() != 11 {
        return false;
    }

    let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if d.len() != 11 {
        return false;
    }

    // Sequences like 000.000.000-00 pass the checksum but are reserved.
    if d.iter().all(|&x| x == d[0]) {
        return false;
    }

    check_digit(&d[..9], 10) == d[9] && check_digit(&d[..10], 11) == d[10]
}

/// Compute one check digit over `digits`, weighting from `start_weight`
/// down to 2. A remainder of 10 maps to 0.
fn check_digit(digits: &[u32], start_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &digit)| digit * (start_weight - i as u32))
        .sum();
    let digit = (sum * 10) % 11;
    if digit == 10 { 0 } else { digit }
}

/// Format a CPF as `XXX.XXX.XXX-XX`.
///
/// Anything that doesn't clean to exactly 11 digits is returned as the
/// cleaned digit string, unformatted.
pub fn format(input: &str) -> String {
    let digits = clean(input);
    if digits.len() != 11 {
        return digits;
    }
    format!(
        "{}.{}.{}-{}",
        &digits[..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // 111.444.777-35 is the canonical checksum-valid example.
    const VALID: &str = "11144477735";

    #[test]
    fn clean_strips_non_digits() {
        assert_eq!(clean("111.444.777-35"), VALID);
        assert_eq!(clean("abc 123"), "123");
        assert_eq!(clean(""), "");
        assert_eq!(clean("---"), "");
    }

    #[test]
    fn clean_is_idempotent() {
        let once = clean("111.444.777-35");
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn valid_cpf_passes() {
        assert!(is_valid(VALID));
        assert!(is_valid("111.444.777-35"));
        assert!(is_valid("52998224725"));
    }

    #[test]
    fn wrong_check_digits_fail() {
        assert!(!is_valid("11144477734"));
        assert!(!is_valid("11144477736"));
        assert!(!is_valid("52998224726"));
    }

    #[test]
    fn all_identical_digits_fail() {
        for d in 0..=9 {
            let cpf: String = std::iter::repeat_n(char::from_digit(d, 10).unwrap(), 11).collect();
            assert!(!is_valid(&cpf), "{cpf} should be invalid");
        }
    }

    #[test]
    fn wrong_length_fails() {
        assert!(!is_valid(""));
        assert!(!is_valid("1114447773"));
        assert!(!is_valid("111444777350"));
        assert!(!is_valid("abc"));
    }

    #[test]
    fn length_checked_after_cleaning() {
        // 11 characters but only 9 digits.
        assert!(!is_valid("111444777--"));
    }

    #[test]
    fn format_groups_eleven_digits() {
        assert_eq!(format(VALID), "111.444.777-35");
        assert_eq!(format("111.444.777-35"), "111.444.777-35");
    }

    #[test]
    fn format_shape() {
        let formatted = format(VALID);
        assert_eq!(formatted.len(), 14);
        let bytes: Vec<char> = formatted.chars().collect();
        assert_eq!(bytes[3], '.');
        assert_eq!(bytes[7], '.');
        assert_eq!(bytes[11], '-');
    }

    #[test]
    fn format_leaves_partial_input_unformatted() {
        assert_eq!(format("123"), "123");
        assert_eq!(format("12a3"), "123");
        assert_eq!(format(""), "");
    }

    #[test]
    fn remainder_ten_maps_to_zero() {
        // 123.456.789-09: the first check digit's weighted sum is 210,
        // (210 * 10) % 11 == 10, which must map to 0.
        assert!(is_valid("12345678909"));
    }
}

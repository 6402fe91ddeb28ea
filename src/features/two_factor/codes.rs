//! Local format checks for verification codes, recovery codes and phone
//! numbers. These only reject obviously malformed input before a request is
//! sent; the server remains the judge of correctness.

use crate::app_lib::AppError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Length of a one-time code from an authenticator app, SMS or email.
pub const OTP_CODE_LEN: usize = 6;
const RECOVERY_CODE_LEN: usize = 10;
const RECOVERY_CODE_GROUP_SIZE: usize = 5;

static OTP_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{6}$").expect("Failed to compile OTP code pattern"));

static PHONE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?[0-9][0-9 ().-]{6,20}$").expect("Failed to compile phone number pattern")
});

/// Normalizes a one-time code by dropping spaces and dashes.
///
/// # Errors
/// Returns `AppError::Validation` unless exactly six digits remain.
pub fn normalize_otp_code(input: &str) -> Result<String, AppError> {
    let normalized: String = input
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '-')
        .collect();

    if OTP_CODE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(AppError::Validation(format!(
            "Enter the {OTP_CODE_LEN}-digit verification code."
        )))
    }
}

/// Normalizes a recovery code to `XXXXX-XXXXX`, accepting any case and
/// separator.
///
/// # Errors
/// Returns `AppError::Validation` for wrong lengths or characters.
pub fn normalize_recovery_code(input: &str) -> Result<String, AppError> {
    let compact: String = input
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '-')
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    if compact.len() != RECOVERY_CODE_LEN || !compact.chars().all(|ch| ch.is_ascii_alphanumeric())
    {
        return Err(AppError::Validation(
            "Recovery codes look like ABCDE-12345.".to_string(),
        ));
    }

    let (head, tail) = compact.split_at(RECOVERY_CODE_GROUP_SIZE);
    Ok(format!("{head}-{tail}"))
}

/// Normalizes a phone number to `+` followed by digits.
///
/// # Errors
/// Returns `AppError::Validation` if the input is not a plausible number.
pub fn normalize_phone_number(input: &str) -> Result<String, AppError> {
    let trimmed = input.trim();
    if !PHONE_NUMBER.is_match(trimmed) {
        return Err(AppError::Validation("Enter a valid phone number.".to_string()));
    }

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if !(7..=15).contains(&digits.len()) {
        return Err(AppError::Validation("Enter a valid phone number.".to_string()));
    }
    Ok(format!("+{digits}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        assert!(OTP_CODE.is_match("123456"));
        assert!(PHONE_NUMBER.is_match("+1 555 123 4567"));
    }

    #[test]
    fn otp_codes_accept_separators() {
        assert_eq!(normalize_otp_code(" 123 456 ").ok(), Some("123456".to_string()));
        assert_eq!(normalize_otp_code("123-456").ok(), Some("123456".to_string()));
    }

    #[test]
    fn otp_codes_reject_bad_input() {
        for input in ["", "12345", "1234567", "12a456", "１２３４５６"] {
            assert!(
                matches!(normalize_otp_code(input), Err(AppError::Validation(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn recovery_codes_are_formatted() {
        assert_eq!(
            normalize_recovery_code("abcde12345").ok(),
            Some("ABCDE-12345".to_string())
        );
        assert_eq!(
            normalize_recovery_code(" ABCDE - 12345 ").ok(),
            Some("ABCDE-12345".to_string())
        );
        assert!(normalize_recovery_code("ABCDE-1234").is_err());
        assert!(normalize_recovery_code("ABCDE-1234!").is_err());
    }

    #[test]
    fn phone_numbers_are_normalized() {
        assert_eq!(
            normalize_phone_number("+1 (555) 010-9999").ok(),
            Some("+15550109999".to_string())
        );
        assert!(normalize_phone_number("call me").is_err());
        assert!(normalize_phone_number("+12").is_err());
    }
}

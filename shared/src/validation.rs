//! Validation utilities for the group-order marketplace
//!
//! Includes Taiwan-specific phone number handling.

// ============================================================================
// Account Validations
// ============================================================================

/// Validate account name (4-20 ASCII letters or digits)
pub fn validate_account(account: &str) -> Result<(), &'static str> {
    if account.len() < 4 {
        return Err("Account must be at least 4 characters");
    }
    if account.len() > 20 {
        return Err("Account must be at most 20 characters");
    }
    if !account.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Account must contain only letters and digits");
    }
    Ok(())
}

/// Validate password length (4-20 characters)
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    let len = password.chars().count();
    if !(4..=20).contains(&len) {
        return Err("Password must be between 4 and 20 characters");
    }
    Ok(())
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if validator::validate_email(email) {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

// ============================================================================
// Taiwan-Specific Validations
// ============================================================================

/// Country calling code prefix for Taiwan
pub const TAIWAN_CALLING_CODE: &str = "+886";

/// Convert `+8869XXXXXXXX` to the local `09XXXXXXXX` form; other input is returned unchanged
pub fn to_local_phone(phone: &str) -> String {
    match phone.strip_prefix(TAIWAN_CALLING_CODE) {
        Some(rest) => format!("0{}", rest),
        None => phone.to_string(),
    }
}

/// Convert `09XXXXXXXX` to the international `+8869XXXXXXXX` form; other input is returned unchanged
pub fn to_international_phone(phone: &str) -> String {
    if phone.starts_with("09") {
        format!("{}{}", TAIWAN_CALLING_CODE, &phone[1..])
    } else {
        phone.to_string()
    }
}

/// Validate Taiwan mobile number in either local or international form
pub fn validate_taiwan_mobile(phone: &str) -> Result<(), &'static str> {
    let local = to_local_phone(phone);
    if local.len() == 10 && local.starts_with("09") && local.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err("Invalid Taiwan mobile number")
    }
}

// ============================================================================
// Upload Validations
// ============================================================================

/// Largest accepted image upload in bytes
pub const MAX_IMAGE_BYTES: usize = 2800 * 2800;

/// Validate an uploaded image by content type and size
pub fn validate_image_upload(content_type: Option<&str>, size: usize) -> Result<(), &'static str> {
    if !content_type.is_some_and(|ct| ct.starts_with("image")) {
        return Err("Unsupported file format");
    }
    if size == 0 {
        return Err("Empty file");
    }
    if size > MAX_IMAGE_BYTES {
        return Err("File too large");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_round_trip_forms() {
        assert_eq!(to_international_phone("0912345678"), "+886912345678");
        assert_eq!(to_local_phone("+886912345678"), "0912345678");
        assert_eq!(to_local_phone("0912345678"), "0912345678");
        assert_eq!(to_international_phone("+886912345678"), "+886912345678");
    }

    #[test]
    fn test_taiwan_mobile() {
        assert!(validate_taiwan_mobile("0912345678").is_ok());
        assert!(validate_taiwan_mobile("+886912345678").is_ok());
        assert!(validate_taiwan_mobile("0212345678").is_err());
        assert!(validate_taiwan_mobile("09123").is_err());
    }

    #[test]
    fn test_account_rules() {
        assert!(validate_account("abcd").is_ok());
        assert!(validate_account("abc").is_err());
        assert!(validate_account("abc_def").is_err());
        assert!(validate_account(&"a".repeat(21)).is_err());
    }
}

// Client-side format checks
// Superficial validation to catch obvious mistakes before a request goes out;
// the server stays authoritative on what it accepts

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

// Separators people type into phone fields
static PHONE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-()]").unwrap());

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+?254[17]\d{8}|0[17]\d{8})$").unwrap());

/// Superficial email format check.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_PATTERN.is_match(email)
}

/// Superficial phone number check for the Kenyan formats the platform
/// accepts: `2547XXXXXXXX`, `+2547XXXXXXXX` or `07XXXXXXXX` (and the `1`
/// prefix networks). Spaces, dashes and parentheses are ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    let cleaned = PHONE_SEPARATORS.replace_all(phone, "");
    PHONE_PATTERN.is_match(&cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("admin@drivehub.test"));
        assert!(is_valid_email("user.name+tag@example.co.ke"));
        assert!(is_valid_email("a@b.co"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("user name@example.com"));
    }

    #[test]
    fn test_overlong_email_rejected() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(!is_valid_email(&email));
    }

    #[test]
    fn test_valid_phones() {
        assert!(is_valid_phone("0712345678"));
        assert!(is_valid_phone("0112345678"));
        assert!(is_valid_phone("254712345678"));
        assert!(is_valid_phone("+254712345678"));
        assert!(is_valid_phone("0712 345 678"));
        assert!(is_valid_phone("(071) 234-5678"));
    }

    #[test]
    fn test_invalid_phones() {
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("0812345678"));
        assert!(!is_valid_phone("07123456789"));
        assert!(!is_valid_phone("+1-555-0100"));
        assert!(!is_valid_phone("phone"));
    }
}

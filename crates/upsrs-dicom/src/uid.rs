//! UID validation and generation.

use crate::error::Error;

/// Maximum UID length per the standard.
pub const MAX_UID_LENGTH: usize = 64;

/// Whether a string is a valid UID: at most 64 characters of
/// dot-separated numeric components, none empty, no leading zeroes
/// except the single digit `0`.
pub fn is_valid_uid(uid: &str) -> bool {
    if uid.is_empty() || uid.len() > MAX_UID_LENGTH {
        return false;
    }
    uid.split('.').all(|component| {
        !component.is_empty()
            && component.chars().all(|c| c.is_ascii_digit())
            && (component.len() == 1 || !component.starts_with('0'))
    })
}

/// Validate a UID, returning it on success.
pub fn validate_uid(uid: &str) -> Result<&str, Error> {
    if is_valid_uid(uid) {
        Ok(uid)
    } else {
        Err(Error::InvalidUid(uid.to_string()))
    }
}

/// Generate a UID under the UUID-derived `2.25` root.
pub fn generate_uid() -> String {
    format!("2.25.{}", uuid::Uuid::new_v4().as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_uids() {
        assert!(is_valid_uid("1.2.840.10008.5.1.4.34.5"));
        assert!(is_valid_uid("1.2.3.4"));
        assert!(is_valid_uid("0.0.1"));
    }

    #[test]
    fn test_invalid_uids() {
        assert!(!is_valid_uid(""));
        assert!(!is_valid_uid("1..2"));
        assert!(!is_valid_uid("1.02.3"));
        assert!(!is_valid_uid("1.2.a"));
        assert!(!is_valid_uid(&"1.".repeat(40)));
    }

    #[test]
    fn test_generated_uids_are_valid_and_unique() {
        let a = generate_uid();
        let b = generate_uid();
        assert!(is_valid_uid(&a), "{a}");
        assert!(is_valid_uid(&b), "{b}");
        assert_ne!(a, b);
        assert!(a.starts_with("2.25."));
    }
}

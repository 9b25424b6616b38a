//! Shape rules for email addresses and usernames.
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::internal::AccountError;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$",
    )
    .expect("EMAIL_REGEX is a valid regex pattern")
});

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("USERNAME_REGEX is a valid regex pattern"));

static MENTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[^\w]|^)@(\w*)").expect("MENTION_REGEX is a valid regex pattern"));

/// Maximum allowed email length (RFC 5321)
const MAX_EMAIL_LENGTH: usize = 254;

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.len() <= MAX_EMAIL_LENGTH && EMAIL_REGEX.is_match(email)
}

pub fn validate_email(email: &str) -> Result<(), AccountError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AccountError::InvalidEmail(email.to_string()))
    }
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
}

/// Strip surrounding spaces and `@` characters
pub fn normalize_username(raw: &str) -> String {
    raw.trim_matches(|c: char| c == ' ' || c == '@').to_string()
}

/// Lowercase, with spaces and hyphens turned into underscores
pub fn scrub(text: &str) -> String {
    text.trim().replace([' ', '-'], "_").to_lowercase()
}

/// Candidate usernames in preference order: `firstname`, then `firstname_lastname`
pub fn username_suggestions(first_name: Option<&str>, last_name: Option<&str>) -> Vec<String> {
    let first = first_name.unwrap_or_default();
    let mut suggestions = vec![scrub(first)];
    suggestions.push(scrub(&format!("{} {}", first, last_name.unwrap_or_default())));
    suggestions.retain(|s| is_valid_username(s));
    suggestions.dedup();
    suggestions
}

/// `@username` tokens in free text
pub fn extract_mentions(text: &str) -> Vec<String> {
    MENTION_REGEX
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

/// `"first last"` with empty parts dropped
pub fn full_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("user+tag@mail.example.com"));
        assert!(is_valid_email(" padded@example.org "));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("Administrator"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@localhost"));
        assert!(matches!(validate_email("nope"), Err(AccountError::InvalidEmail(e)) if e == "nope"));
    }

    #[test]
    fn test_normalize_username_strips_spaces_and_at() {
        assert_eq!(normalize_username("  @ann_lee@ "), "ann_lee");
        assert_eq!(normalize_username("ann lee"), "ann lee");
    }

    #[test]
    fn test_username_charset() {
        assert!(is_valid_username("ann_lee2"));
        assert!(!is_valid_username("ann lee"));
        assert!(!is_valid_username("ann.lee"));
        assert!(!is_valid_username(""));
    }

    #[test]
    fn test_scrub() {
        assert_eq!(scrub("Mary-Jane Watson"), "mary_jane_watson");
    }

    #[test]
    fn test_username_suggestions() {
        assert_eq!(
            username_suggestions(Some("Ann"), Some("Lee")),
            vec!["ann".to_string(), "ann_lee".to_string()]
        );
        assert_eq!(username_suggestions(Some("Ann"), None), vec!["ann".to_string()]);
        assert!(username_suggestions(None, None).is_empty());
    }

    #[test]
    fn test_extract_mentions() {
        assert_eq!(
            extract_mentions("@ann please ping @bob_2, not mail@example.com"),
            vec!["ann".to_string(), "bob_2".to_string()]
        );
        assert!(extract_mentions("no mentions here").is_empty());
    }

    #[test]
    fn test_full_name_drops_empty_parts() {
        assert_eq!(full_name(Some("A"), None), "A");
        assert_eq!(full_name(Some("Ann"), Some("Lee")), "Ann Lee");
        assert_eq!(full_name(Some(""), Some("Lee")), "Lee");
        assert_eq!(full_name(None, None), "");
    }
}

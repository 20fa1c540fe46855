//! Input validation helpers shared by the form endpoints

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Loose email format check: something@something.tld, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Return the value when it is present and not only whitespace
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Trim an optional free-text field, mapping blank to `None`
pub fn trimmed(value: Option<&str>) -> Option<String> {
    non_blank(value).map(|v| v.trim().to_string())
}

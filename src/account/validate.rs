//! Pure format rules for email, username, and password. No I/O here; the
//! uniqueness check lives with the credential store.

use lazy_static::lazy_static;
use regex::Regex;

pub const EMAIL_INVALID: &str = "Enter a valid email address";
pub const EMAIL_TAKEN: &str = "This email is already registered";
pub const USERNAME_BLANK: &str = "Please, you must choose a username";
pub const USERNAME_CHARSET: &str =
    "Please choose another username, only letters, numbers, and ._- are allowed";
pub const PASSWORD_TOO_SHORT: &str = "Please choose another password, min 8 characters";
pub const PASSWORD_NO_UPPERCASE: &str = "Passwords must contain an uppercase letter";
pub const PASSWORD_NO_DIGIT: &str = "Passwords must contain a digit";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

/// Trim and lowercase, then check the address grammar. Returns the
/// normalized form stored and compared everywhere else.
pub fn validate_email(candidate: &str) -> Result<String, &'static str> {
    let email = candidate.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(EMAIL_INVALID);
    }
    Ok(email)
}

pub fn validate_username(candidate: &str) -> Result<String, &'static str> {
    let username = candidate.trim();
    if username.is_empty() {
        return Err(USERNAME_BLANK);
    }
    if !USERNAME_RE.is_match(username) {
        return Err(USERNAME_CHARSET);
    }
    Ok(username.to_string())
}

/// First failing rule wins.
pub fn validate_password(candidate: &str) -> Result<(), &'static str> {
    if candidate.chars().count() < 8 {
        return Err(PASSWORD_TOO_SHORT);
    }
    if !candidate.chars().any(|c| c.is_uppercase()) {
        return Err(PASSWORD_NO_UPPERCASE);
    }
    if !candidate.chars().any(|c| c.is_ascii_digit()) {
        return Err(PASSWORD_NO_DIGIT);
    }
    Ok(())
}

use std::sync::OnceLock;

use regex::Regex;

// local-part@domain with at least one dot in the domain
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(email: String) -> Result<EmailAddress, String> {
        if !email_regex().is_match(&email) {
            return Err(format!("{} email is not valid", email));
        }

        Ok(Self(email))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

    EMAIL_REGEX.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("Email pattern is a valid regex"))
}

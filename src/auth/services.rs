use lazy_static::lazy_static;
use regex::Regex;

pub const MAX_IDENTITY_LEN: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email.trim())
}

/// Letters, digits and underscores only.
pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// American format, `MM-DD-YYYY`.
pub(crate) fn is_valid_birthdate(date: &str) -> bool {
    lazy_static! {
        static ref DATE_RE: Regex =
            Regex::new(r"^(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])-\d{4}$").unwrap();
    }
    DATE_RE.is_match(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("trent@example.com"));
        assert!(is_valid_email("  a.b+c@sub.example.org "));
        assert!(!is_valid_email("trent@example"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn username_validation() {
        assert!(is_valid_username("tr3nt_w"));
        assert!(!is_valid_username("trent w"));
        assert!(!is_valid_username("trent-w"));
        assert!(!is_valid_username(""));
    }

    #[test]
    fn birthdate_validation() {
        assert!(is_valid_birthdate("01-31-2004"));
        assert!(!is_valid_birthdate("2004-01-31"));
        assert!(!is_valid_birthdate("13-01-2004"));
        assert!(!is_valid_birthdate(""));
    }
}

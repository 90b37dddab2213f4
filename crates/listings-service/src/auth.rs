//! Bearer-token authorization (spec §6 "Authorization", §9 open question).
//!
//! The header takes the shape `Authorization: Token <value>`; validity is
//! literal equality against a configured secret. Unlike the Python
//! original's variant that can fall through to an implicit `None`, this
//! always returns an explicit `bool`.

pub struct AuthChecker {
    secret: String,
}

impl AuthChecker {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// True iff `header` is `Token <secret>` (or just `<secret>`, the
    /// prefix is stripped rather than required).
    pub fn token_valid(&self, header: &str) -> bool {
        header.trim().strip_prefix("Token ").unwrap_or(header).trim() == self.secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_token_with_prefix_is_valid() {
        let checker = AuthChecker::new("secret123".to_string());
        assert!(checker.token_valid("Token secret123"));
    }

    #[test]
    fn matching_token_without_prefix_is_valid() {
        let checker = AuthChecker::new("secret123".to_string());
        assert!(checker.token_valid("secret123"));
    }

    #[test]
    fn mismatched_or_empty_token_is_invalid() {
        let checker = AuthChecker::new("secret123".to_string());
        assert!(!checker.token_valid("Token wrong"));
        assert!(!checker.token_valid(""));
    }
}

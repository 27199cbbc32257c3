//! API credential.

use std::fmt;

/// Bearer token for the generation service.
///
/// The value is only reachable through [`ApiKey::expose`]; `Debug` and
/// `Display` never print it.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting_never_leaks_the_key() {
        let key = ApiKey::new("msy_live_123");
        assert!(!format!("{key:?}").contains("msy_live_123"));
        assert!(!key.to_string().contains("msy_live_123"));
        assert_eq!(key.expose(), "msy_live_123");
    }

    #[test]
    fn blank_key_is_empty() {
        assert!(ApiKey::new("  ").is_empty());
        assert!(!ApiKey::new("k").is_empty());
    }
}

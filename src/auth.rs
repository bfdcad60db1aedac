use std::fmt;

/// Redmine REST API key, sent as `X-Redmine-API-Key`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

// Keep keys out of debug logs.
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let key = ApiKey::from("super-secret");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert_eq!(key.as_str(), "super-secret");
    }

    #[test]
    fn test_blank_key_is_empty() {
        assert!(ApiKey::from("  ").is_empty());
        assert!(!ApiKey::from("abc").is_empty());
    }
}

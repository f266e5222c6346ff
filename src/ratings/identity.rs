//! Rater identity resolution.

/// Resolves the caller to a stable rater identity.
pub trait IdentityProvider {
    fn rater_identity(&self) -> String;
}

/// A fixed identity, e.g. from a command-line flag.
#[derive(Debug, Clone)]
pub struct StaticIdentity(String);

impl StaticIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into().trim().to_string())
    }
}

impl IdentityProvider for StaticIdentity {
    fn rater_identity(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity_is_trimmed() {
        assert_eq!(StaticIdentity::new(" alice ").rater_identity(), "alice");
    }
}

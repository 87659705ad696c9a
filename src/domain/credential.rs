//! Per-instance bearer credential.

use std::fmt;

/// Bearer token shared by every role of an instance and its registry entry.
///
/// `Debug` is redacted so the token never lands in logs by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Expose the raw token for injection into env or request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let cred = Credential::new("secret-token");
        assert_eq!(format!("{cred:?}"), "Credential(***)");
        assert_eq!(cred.expose(), "secret-token");
    }
}

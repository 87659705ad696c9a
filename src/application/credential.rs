//! Per-instance credential generation.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

use crate::domain::Credential;

/// Length of generated tokens.
pub const TOKEN_LENGTH: usize = 32;

/// Generate a random alphanumeric token from the operating system's CSPRNG.
#[must_use]
pub fn generate() -> Credential {
    let token: String = OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect();
    Credential::new(token)
}

/// Use the supplied token when present, otherwise generate one.
#[must_use]
pub fn supplied_or_generate(supplied: Option<&str>) -> Credential {
    match supplied.map(str::trim).filter(|token| !token.is_empty()) {
        Some(token) => Credential::new(token),
        None => generate(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_is_fixed_length_alphanumeric() {
        let token = generate();
        assert_eq!(token.expose().len(), TOKEN_LENGTH);
        assert!(token.expose().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_tokens_differ() {
        assert_ne!(generate(), generate());
    }

    #[test]
    fn supplied_token_is_kept() {
        assert_eq!(supplied_or_generate(Some("abc")).expose(), "abc");
    }

    #[test]
    fn blank_supplied_token_is_replaced() {
        let token = supplied_or_generate(Some("  "));
        assert_eq!(token.expose().len(), TOKEN_LENGTH);
    }
}

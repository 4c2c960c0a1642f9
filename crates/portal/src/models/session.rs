//! Session-related types.
//!
//! Types stored in the session for authentication state.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use aegis_core::Email;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user.
/// The role is deliberately NOT here; it is resolved per request so that
/// grant changes take effect without a re-login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's display name at sign-in time.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// Profile photo URL, if any.
    pub photo_url: Option<String>,
    /// Identity-provider token, attached as a bearer on every user-scoped
    /// backend call. Debug output stays redacted.
    #[serde(with = "token_serde")]
    pub access_token: SecretString,
}

/// Session keys for authentication and pipeline data.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the quote handoff between quoting and applying.
    pub const QUOTE_HANDOFF: &str = "quote_handoff";
}

/// Serde round-trip for `SecretString`, which exposes nothing on its own.
///
/// Only the server-side session store ever sees the serialized form.
pub(crate) mod token_serde {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        token: &SecretString,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(token.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_current_user_round_trips_through_the_session_store() {
        let user = CurrentUser {
            name: "Maria Gomez".to_string(),
            email: Email::parse("maria@example.com").unwrap(),
            photo_url: None,
            access_token: SecretString::from("tok-123".to_string()),
        };

        let json = serde_json::to_string(&user).unwrap();
        let back: CurrentUser = serde_json::from_str(&json).unwrap();

        use secrecy::ExposeSecret;
        assert_eq!(back.email.as_str(), "maria@example.com");
        assert_eq!(back.access_token.expose_secret(), "tok-123");
    }

    #[test]
    fn test_debug_output_never_shows_the_token() {
        let user = CurrentUser {
            name: "Maria Gomez".to_string(),
            email: Email::parse("maria@example.com").unwrap(),
            photo_url: None,
            access_token: SecretString::from("tok-123".to_string()),
        };

        let debug = format!("{user:?}");
        assert!(!debug.contains("tok-123"));
    }
}

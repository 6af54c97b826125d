//! Identity-provider assertions.
//!
//! The provider hands the client a signed JWT. The client never verifies
//! it (the backend does); it only reads the payload for the profile hints
//! sent along with the assertion.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("credential is not a JWT")]
    Malformed,

    #[error("credential payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("credential payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("credential carries no email")]
    MissingEmail,
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// An undecoded credential plus the claims read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAssertion {
    /// Raw credential, forwarded to the backend as-is.
    pub credential: String,
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl IdentityAssertion {
    pub fn decode(credential: &str) -> Result<Self, IdentityError> {
        let credential = credential.trim();
        let mut parts = credential.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
            _ => return Err(IdentityError::Malformed),
        };
        // Some issuers pad the segments anyway.
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        let claims: Claims = serde_json::from_slice(&bytes)?;
        let email = claims
            .email
            .filter(|e| !e.is_empty())
            .ok_or(IdentityError::MissingEmail)?;

        Ok(Self {
            credential: credential.to_string(),
            subject: claims.sub,
            email,
            name: claims.name.filter(|n| !n.is_empty()),
            picture: claims.picture,
        })
    }

    /// Name to register under: the claimed name, or the email's local part.
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) => name,
            None => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

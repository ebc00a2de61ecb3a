use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::error;

use crate::services::auth::token::SessionToken;

#[derive(Debug, thiserror::Error)]
pub enum SessionTokenError {
    #[error("failed to sign session token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("session token rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),
    #[error("empty 'sub' claim")]
    EmptySubject,
}

/// HS256 signer/verifier for session tokens, keyed by the shared signing secret.
///
/// Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("validation", &self.validation)
            .finish()
    }
}

impl SessionCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 60;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn sign(&self, token: &SessionToken) -> Result<String, SessionTokenError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, token, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign session token");
            SessionTokenError::Sign(e)
        })
    }

    /// Signature + `exp` + required claims. A token that fails any check is rejected whole.
    pub fn verify(&self, raw: &str) -> Result<SessionToken, SessionTokenError> {
        let data = jsonwebtoken::decode::<SessionToken>(raw, &self.decoding_key, &self.validation)
            .map_err(SessionTokenError::Rejected)?;

        let claims = data.claims;
        if claims
            .subject_id
            .as_deref()
            .is_none_or(|sub| sub.trim().is_empty())
        {
            return Err(SessionTokenError::EmptySubject);
        }

        Ok(claims)
    }
}

//! Compact HS256 bearer token verification.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::auth::subject::TokenClaims;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("missing Authorization header")]
    Missing,
    #[error("Authorization header must use Bearer scheme")]
    NotBearer,
    #[error("malformed token")]
    Malformed,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token signing key rejected")]
    InvalidKey,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => TokenError::UnsupportedAlgorithm,
            ErrorKind::InvalidKeyFormat => TokenError::InvalidKey,
            _ => TokenError::Malformed,
        }
    }
}

/// Verifies HS256 tokens against a shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("leeway_secs", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        // `exp` is checked when present but not required
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Verify signature and expiry, then decode the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Sign `claims` into a compact token.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }
}

/// Pull the token out of an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, TokenError> {
    let value = header.ok_or(TokenError::Missing)?;
    match value.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("Bearer ") => {
            let token = value[7..].trim();
            if token.is_empty() {
                Err(TokenError::Missing)
            } else {
                Ok(token)
            }
        }
        _ => Err(TokenError::NotBearer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now_secs() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    fn claims(exp: Option<u64>) -> TokenClaims {
        TokenClaims {
            sub: Some(uuid::Uuid::new_v4().to_string()),
            roles: vec!["ROLE_PATIENT".into()],
            exp,
            ..Default::default()
        }
    }

    #[test]
    fn test_sign_then_verify() {
        let verifier = TokenVerifier::new("secret", 0);
        let original = claims(Some(now_secs() + 60));
        let decoded = verifier.verify(&verifier.sign(&original).unwrap()).unwrap();
        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.roles, original.roles);
    }

    #[test]
    fn test_exp_is_optional() {
        let verifier = TokenVerifier::new("secret", 0);
        let decoded = verifier.verify(&verifier.sign(&claims(None)).unwrap()).unwrap();
        assert_eq!(decoded.exp, None);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = TokenVerifier::new("secret", 0).sign(&claims(None)).unwrap();
        let err = TokenVerifier::new("other", 0).verify(&token).unwrap_err();
        assert_eq!(err, TokenError::BadSignature);
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let verifier = TokenVerifier::new("secret", 0);
        let token = verifier.sign(&claims(None)).unwrap();

        let mut admin = claims(None);
        admin.roles = vec!["ROLE_ADMIN".into()];
        let forged = TokenVerifier::new("attacker", 0).sign(&admin).unwrap();

        // genuine header and signature around the attacker's payload
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = forged.split('.').nth(1).unwrap();
        assert_eq!(verifier.verify(&parts.join(".")).unwrap_err(), TokenError::BadSignature);
    }

    #[test]
    fn test_expiry_with_leeway() {
        let past = now_secs() - 10;
        let strict = TokenVerifier::new("secret", 0);
        assert_eq!(strict.verify(&strict.sign(&claims(Some(past))).unwrap()).unwrap_err(), TokenError::Expired);

        let lenient = TokenVerifier::new("secret", 60);
        assert!(lenient.verify(&lenient.sign(&claims(Some(past))).unwrap()).is_ok());
    }

    #[test]
    fn test_malformed_tokens() {
        let verifier = TokenVerifier::new("secret", 0);
        assert_eq!(verifier.verify("abc").unwrap_err(), TokenError::Malformed);
        assert_eq!(verifier.verify("a.b.c.d").unwrap_err(), TokenError::Malformed);

        // {"alg":"none"} with an empty signature
        let none_alg = "eyJhbGciOiJub25lIn0.e30.";
        assert!(verifier.verify(none_alg).is_err());
    }

    #[test]
    fn test_other_algorithms_are_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims(None),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let err = TokenVerifier::new("secret", 0).verify(&token).unwrap_err();
        assert_eq!(err, TokenError::UnsupportedAlgorithm);
    }

    #[test]
    fn test_bearer_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(Some("bearer xyz")).unwrap(), "xyz");
        assert_eq!(bearer_token(None).unwrap_err(), TokenError::Missing);
        assert_eq!(bearer_token(Some("Bearer   ")).unwrap_err(), TokenError::Missing);
        assert_eq!(bearer_token(Some("Basic dXNlcg==")).unwrap_err(), TokenError::NotBearer);
    }
}

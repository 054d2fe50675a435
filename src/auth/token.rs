//! Signed session tokens
//!
//! Tokens are HS256 JWTs carrying the account id and username. The signing
//! secret is handed in at construction; rotating it invalidates every token
//! issued under the previous secret.

use crate::db::models::Account;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// Algorithms accepted on the verification side.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Token header read loosely, so algorithms jsonwebtoken does not model
/// (such as `none`) still surface by name.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Token failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("malformed token")]
    Malformed,

    #[error("unexpected signing method: {0}")]
    UnexpectedSigningMethod(String),

    #[error("token expired or signature invalid")]
    ExpiredOrInvalid,
}

impl TokenError {
    pub fn error_type(&self) -> &'static str {
        match self {
            TokenError::Signing(_) => "SigningError",
            TokenError::Malformed => "MalformedTokenError",
            TokenError::UnexpectedSigningMethod(_) => "UnexpectedSigningMethodError",
            TokenError::ExpiredOrInvalid => "ExpiredOrInvalidError",
        }
    }
}

/// Claims embedded in every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub id: i64,
    pub username: String,
    pub exp: i64,
}

/// Issues and verifies tokens with a fixed HMAC secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenCodec {
    /// Create a codec signing with `secret`, issuing tokens that live for `ttl`
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Lifetime of newly issued tokens
    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Issue a token for an account, expiring `ttl` from now
    pub fn issue(&self, account: &Account) -> Result<String, TokenError> {
        let exp = chrono::Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("expiration out of range".to_string()))?
            .timestamp();

        let claims = TokenClaims {
            id: account.id,
            username: account.username.clone(),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded claims
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let alg = signing_algorithm(token)?;

        let mut validation = Validation::new(alg);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => TokenError::Malformed,
                ErrorKind::InvalidAlgorithm => {
                    TokenError::UnexpectedSigningMethod(format!("{:?}", alg))
                }
                _ => TokenError::ExpiredOrInvalid,
            })?;

        // Valid only while now < exp
        if claims.exp <= chrono::Utc::now().timestamp() {
            return Err(TokenError::ExpiredOrInvalid);
        }

        Ok(claims)
    }
}

/// Read the header's `alg` and accept only the HMAC family
fn signing_algorithm(token: &str) -> Result<Algorithm, TokenError> {
    let encoded = match token.split('.').collect::<Vec<_>>().as_slice() {
        [header, _, _] => *header,
        _ => return Err(TokenError::Malformed),
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| TokenError::Malformed)?;
    let header: RawHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    match header.alg.as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(TokenError::UnexpectedSigningMethod(header.alg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn account(id: i64, username: &str) -> Account {
        Account {
            id,
            username: username.to_string(),
            password_hash: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret", chrono::Duration::hours(24))
    }

    #[test]
    fn test_issue_then_verify() {
        let codec = codec();
        let token = codec.issue(&account(7, "alice")).unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > chrono::Utc::now().timestamp());
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = TokenCodec::new("test-secret", chrono::Duration::seconds(-30));
        let token = codec.issue(&account(1, "alice")).unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::ExpiredOrInvalid));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = TokenCodec::new("another-secret", chrono::Duration::hours(1))
            .issue(&account(1, "alice"))
            .unwrap();

        assert_eq!(codec().verify(&token), Err(TokenError::ExpiredOrInvalid));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(codec().verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(codec().verify(""), Err(TokenError::Malformed));
        assert_eq!(codec().verify("a.b.c"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_non_hmac_algorithm_rejected() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"id":1,"username":"alice","exp":9999999999}"#);
        let token = format!("{}.{}.c2lnbmF0dXJl", header, payload);

        assert_eq!(
            codec().verify(&token),
            Err(TokenError::UnexpectedSigningMethod("RS256".to_string()))
        );
    }

    #[test]
    fn test_unsigned_token_reports_signing_method() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"id":1,"username":"alice","exp":9999999999}"#);
        let token = format!("{}.{}.", header, payload);

        assert_eq!(
            codec().verify(&token),
            Err(TokenError::UnexpectedSigningMethod("none".to_string()))
        );
    }

    #[test]
    fn test_token_expiring_this_second_rejected() {
        let claims = TokenClaims {
            id: 1,
            username: "alice".to_string(),
            exp: chrono::Utc::now().timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(codec().verify(&token), Err(TokenError::ExpiredOrInvalid));
    }

    #[test]
    fn test_other_hmac_variant_accepted() {
        let claims = TokenClaims {
            id: 3,
            username: "bob".to_string(),
            exp: chrono::Utc::now().timestamp() + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(codec().verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let codec = codec();
        let mut token = codec.issue(&account(1, "alice")).unwrap();
        let last = token.pop().unwrap();
        token.push(if last == 'A' { 'B' } else { 'A' });

        assert!(codec.verify(&token).is_err());
    }

    proptest! {
        #[test]
        fn prop_verify_returns_issued_identity(id in 1i64..i64::MAX, username in "[a-z][a-z0-9_]{0,31}") {
            let codec = codec();
            let token = codec.issue(&account(id, &username)).unwrap();
            let claims = codec.verify(&token).unwrap();
            prop_assert_eq!(claims.id, id);
            prop_assert_eq!(claims.username, username);
        }
    }
}

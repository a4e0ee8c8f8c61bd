//! Signed token issuance and verification (compact JWS, HS256).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use secrecy::{ExposeSecret, SecretString};

use crate::claims::{Claims, TokenSubject, validate_claims};
use crate::error::TokenError;

/// Shortest accepted signing secret, in bytes (the HMAC-SHA256 block of entropy).
pub const MIN_SECRET_LEN: usize = 32;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Clock skew beyond a day is a misconfiguration, not skew.
const MAX_LEEWAY_SECS: u64 = 86_400;

/// A freshly issued token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Issues and verifies integrity-protected claim sets.
///
/// Keys are derived once from the shared secret and never mutated, so one
/// codec can be shared by every worker without synchronisation.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    leeway: Duration,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &ALGORITHM)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &SecretString, leeway_secs: u64) -> Result<Self, TokenError> {
        let bytes = secret.expose_secret().as_bytes();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(TokenError::Key(format!(
                "secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        // Expiry is checked by `validate_claims` against an explicit clock.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
            leeway: Duration::seconds(leeway_secs.min(MAX_LEEWAY_SECS) as i64),
        })
    }

    pub fn issue(&self, subject: TokenSubject, ttl: Duration) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: TokenSubject,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims::new(subject, now, ttl);
        let token = jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        Ok(IssuedToken { token, claims })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token against an explicit clock.
    ///
    /// The MAC over the raw signing input is checked before anything is
    /// parsed, so any alteration of the token surfaces as `BadSignature`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let Some((signing_input, signature)) = token.rsplit_once('.') else {
            return Err(TokenError::Malformed("missing signature segment".to_string()));
        };

        let intact = jsonwebtoken::crypto::verify(
            signature,
            signing_input.as_bytes(),
            &self.decoding,
            ALGORITHM,
        )
        .unwrap_or(false);
        if !intact {
            return Err(TokenError::BadSignature);
        }

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        validate_claims(&claims, now, self.leeway)?;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tessera_core::{PrincipalId, TenantId};

    use crate::Role;

    const SECRET: &str = "test-secret-test-secret-test-secret!";

    fn codec() -> TokenCodec {
        TokenCodec::new(&SecretString::from(SECRET), 0).unwrap()
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            principal_id: PrincipalId::new(),
            role: Role::TenantOwner,
            tenant_id: Some(TenantId::new()),
            tenant_slug: Some("acme".to_string()),
        }
    }

    /// Flip one bit of the token's byte representation.
    fn flip_bit(token: &str, bit: usize) -> Vec<u8> {
        let mut bytes = token.as_bytes().to_vec();
        let idx = (bit / 8) % bytes.len();
        bytes[idx] ^= 1 << (bit % 8);
        bytes
    }

    #[test]
    fn issued_token_verifies_immediately() {
        let codec = codec();
        let subject = subject();
        let issued = codec.issue(subject.clone(), Duration::minutes(30)).unwrap();

        let claims = codec.verify(&issued.token).unwrap();
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.sub, subject.principal_id);
        assert_eq!(claims.tenant_id, subject.tenant_id);
        assert_eq!(claims.role, Role::TenantOwner);
    }

    #[test]
    fn token_expires_after_ttl() {
        let codec = codec();
        let now = Utc::now();
        let issued = codec.issue_at(subject(), Duration::seconds(60), now).unwrap();

        let start = issued.claims.issued_at;
        assert!(codec.verify_at(&issued.token, start + Duration::seconds(59)).is_ok());
        assert_eq!(
            codec.verify_at(&issued.token, start + Duration::seconds(60)),
            Err(TokenError::Expired)
        );
        assert_eq!(
            codec.verify_at(&issued.token, start + Duration::hours(2)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn foreign_key_is_bad_signature() {
        let other = TokenCodec::new(&SecretString::from("another-secret-another-secret-xx!"), 0)
            .unwrap();
        let issued = other.issue(subject(), Duration::minutes(5)).unwrap();
        assert_eq!(codec().verify(&issued.token), Err(TokenError::BadSignature));
    }

    #[test]
    fn unsigned_garbage_is_rejected() {
        let codec = codec();
        assert!(matches!(codec.verify(""), Err(TokenError::Malformed(_))));
        assert!(matches!(codec.verify("abc"), Err(TokenError::Malformed(_))));
        assert_eq!(codec.verify("abc.def"), Err(TokenError::BadSignature));
    }

    #[test]
    fn signed_but_wrong_payload_is_malformed() {
        let codec = codec();
        let token = jsonwebtoken::encode(
            &Header::new(ALGORITHM),
            &serde_json::json!({ "sub": "nope" }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(codec.verify(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = TokenCodec::new(&SecretString::from("short"), 0).unwrap_err();
        assert!(matches!(err, TokenError::Key(_)));
    }

    #[test]
    fn jti_is_unique() {
        let codec = codec();
        let s = subject();
        let t1 = codec.issue(s.clone(), Duration::minutes(1)).unwrap();
        let t2 = codec.issue(s, Duration::minutes(1)).unwrap();
        assert_ne!(t1.claims.jti, t2.claims.jti);
        assert_ne!(t1.token, t2.token);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn any_single_bit_flip_is_a_signature_failure(bit in 0usize..4096) {
            let codec = codec();
            let issued = codec.issue(subject(), Duration::minutes(5)).unwrap();
            let flipped = flip_bit(&issued.token, bit);
            if let Ok(tampered) = String::from_utf8(flipped) {
                prop_assert_eq!(codec.verify(&tampered), Err(TokenError::BadSignature));
            }
        }
    }
}

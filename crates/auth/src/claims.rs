use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tessera_core::{PrincipalId, TenantId};

use crate::Role;
use crate::error::TokenError;

/// Signed token payload.
///
/// Immutable once issued and never stored server-side. `role` and
/// `tenant_slug` are informational: authorization always re-reads the
/// principal and tenant from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    /// Role at issuance time.
    pub role: Role,

    /// Tenant the principal belonged to at issuance (`None` for platform admins).
    pub tenant_id: Option<TenantId>,

    /// Denormalised tenant slug for client convenience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_slug: Option<String>,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    /// Unique token id.
    pub jti: Uuid,
}

/// Who a token is being issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub principal_id: PrincipalId,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub tenant_slug: Option<String>,
}

impl Claims {
    pub fn new(subject: TokenSubject, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        // JWT timestamps have second precision; truncate so the claims we hand
        // back equal the claims a verifier will decode.
        let issued_at = DateTime::from_timestamp(issued_at.timestamp(), 0).unwrap_or(issued_at);
        Self {
            sub: subject.principal_id,
            role: subject.role,
            tenant_id: subject.tenant_id,
            tenant_slug: subject.tenant_slug,
            issued_at,
            expires_at: issued_at + ttl,
            jti: Uuid::new_v4(),
        }
    }
}

/// Deterministically validate the time window of decoded claims.
///
/// A token is valid while `issued_at - leeway <= now < expires_at`.
pub fn validate_claims(
    claims: &Claims,
    now: DateTime<Utc>,
    leeway: Duration,
) -> Result<(), TokenError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenError::Malformed(
            "invalid time window (exp <= iat)".to_string(),
        ));
    }
    if now + leeway < claims.issued_at {
        return Err(TokenError::Malformed("token issued in the future".to_string()));
    }
    if now >= claims.expires_at {
        return Err(TokenError::Expired);
    }
    Ok(())
}

//! Validated values shared across crates.
//!
//! Each type here can only be built through its parsing constructor (serde
//! included), so holding one is proof that the input was well-formed.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Normalised (trimmed, lowercased) email address.
///
/// Validation is deliberately shallow: one `@`, non-empty local part, a dot in
/// the domain. Deliverability is not our concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_lowercase();
        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(DomainError::validation("email must contain '@'"));
        };
        if local.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || normalized.chars().any(char::is_whitespace)
        {
            return Err(DomainError::validation(format!("invalid email '{}'", raw.trim())));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// Maximum slug length (one DNS label).
pub const MAX_SLUG_LEN: usize = 63;

/// Human-readable tenant handle used in addresses: `[a-z0-9-]{1,63}`, no
/// leading or trailing hyphen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantSlug(String);

impl TenantSlug {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() || raw.len() > MAX_SLUG_LEN {
            return Err(DomainError::validation(format!(
                "slug must be 1..={MAX_SLUG_LEN} characters"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(DomainError::validation(
                "slug must be lowercase alphanumeric with hyphens only",
            ));
        }
        if raw.starts_with('-') || raw.ends_with('-') {
            return Err(DomainError::validation("slug cannot start or end with '-'"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantSlug {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantSlug> for String {
    fn from(value: TenantSlug) -> Self {
        value.0
    }
}

//! Tenant context resolution from request paths.
//!
//! The resolver only derives the *claimed* tenant. It never checks that the
//! tenant exists; the access guard does that against the store.

/// Top-level segments owned by the platform itself.
pub const RESERVED_SEGMENTS: &[&str] = &[
    "api",
    "auth",
    "static",
    "assets",
    "health",
    "docs",
    "redoc",
    "openapi.json",
    "favicon.ico",
];

/// The tenant slug a request claims to address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantCandidate(String);

impl TenantCandidate {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TenantCandidate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a request path to an optional [`TenantCandidate`].
///
/// Two rules, in order:
/// 1. Declared mounts: for a mount `api/companies`, the segment right after
///    the mount is the candidate (`/api/companies/acme/users` → `acme`).
/// 2. Otherwise the first segment is the candidate unless it is reserved.
#[derive(Debug, Clone, Default)]
pub struct TenantResolver {
    mounts: Vec<Vec<String>>,
}

impl TenantResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a mount under which the next path segment names the tenant.
    pub fn mount(mut self, prefix: &str) -> Self {
        let segments: Vec<String> = segments(prefix).map(str::to_string).collect();
        if !segments.is_empty() {
            self.mounts.push(segments);
        }
        self
    }

    pub fn resolve(&self, path: &str) -> Option<TenantCandidate> {
        let parts: Vec<&str> = segments(path).collect();

        for mount in &self.mounts {
            let matches = parts.len() > mount.len()
                && mount.iter().zip(&parts).all(|(m, p)| m == p);
            if matches {
                return Some(TenantCandidate::new(parts[mount.len()]));
            }
        }

        let first = parts.first()?;
        if RESERVED_SEGMENTS.contains(first) {
            None
        } else {
            Some(TenantCandidate::new(*first))
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty())
}

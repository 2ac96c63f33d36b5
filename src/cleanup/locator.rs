// src/cleanup/locator.rs

use std::fmt;

use tracing::{debug, warn};

use crate::cleanup::model::{PackageSpec, RegistryType};
use crate::error::CleanupError;
use crate::sys::traits::RegistryApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointShape {
    /// Package owned by an organization.
    Org,
    /// Package owned by a named user account.
    User,
    /// Package owned by whoever the token belongs to.
    Viewer,
}

impl fmt::Display for EndpointShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndpointShape::Org => "org",
            EndpointShape::User => "user",
            EndpointShape::Viewer => "viewer",
        })
    }
}

/// Probe order per registry type. Container images pushed from CI are normally
/// org-owned; npm and maven packages published with a personal token are not.
pub fn shapes_for(registry: RegistryType) -> &'static [EndpointShape] {
    match registry {
        RegistryType::Container => &[EndpointShape::Org, EndpointShape::User, EndpointShape::Viewer],
        RegistryType::Npm | RegistryType::Maven => {
            &[EndpointShape::User, EndpointShape::Org, EndpointShape::Viewer]
        }
    }
}

pub fn endpoint_path(shape: EndpointShape, registry: RegistryType, owner: &str, name: &str) -> String {
    let kind = registry.package_type();
    let name = encode_name(name);
    match shape {
        EndpointShape::Org => format!("/orgs/{owner}/packages/{kind}/{name}/versions"),
        EndpointShape::User => format!("/users/{owner}/packages/{kind}/{name}/versions"),
        EndpointShape::Viewer => format!("/user/packages/{kind}/{name}/versions"),
    }
}

/// Repo-scoped container names (`repo/image`) and scoped npm names carry
/// characters that must be escaped inside a single path segment.
fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' => out.push_str("%2F"),
            '@' => out.push_str("%40"),
            ' ' => out.push_str("%20"),
            _ => out.push(c),
        }
    }
    out
}

/// Every `(variant, shape)` combination in probe order.
pub fn candidates(spec: &PackageSpec, owner: &str) -> Vec<(String, EndpointShape, String)> {
    spec.name_variants()
        .iter()
        .flat_map(|name| {
            shapes_for(spec.registry())
                .iter()
                .map(move |shape| (name.clone(), *shape, endpoint_path(*shape, spec.registry(), owner, name)))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedPackage {
    pub endpoint: String,
    pub name: String,
    pub shape: EndpointShape,
}

pub struct EndpointLocator<'a> {
    api: &'a dyn RegistryApi,
    owner: &'a str,
}

impl<'a> EndpointLocator<'a> {
    pub fn new(api: &'a dyn RegistryApi, owner: &'a str) -> Self {
        Self { api, owner }
    }

    /// Returns the first candidate whose version list responds. Read-only and
    /// safe to retry.
    ///
    /// Only a 404 moves on to the next candidate. Any other probe failure means
    /// the registry could not be asked, so probing stops with `Registry` instead
    /// of reporting a package that may well exist as missing.
    pub async fn locate(&self, spec: &PackageSpec) -> Result<LocatedPackage, CleanupError> {
        let mut attempted = Vec::new();

        for (name, shape, endpoint) in candidates(spec, self.owner) {
            match self.api.probe(&endpoint).await {
                Ok(count) => {
                    debug!(registry = %spec.registry(), %endpoint, count, "probe hit");
                    return Ok(LocatedPackage { endpoint, name, shape });
                }
                Err(e) if e.is_not_found() => {
                    debug!(registry = %spec.registry(), %endpoint, error = %e, "probe miss");
                    attempted.push(endpoint);
                }
                Err(e) => {
                    warn!(registry = %spec.registry(), %endpoint, error = %e, "probe failed");
                    return Err(CleanupError::Registry(format!("probe of {endpoint} failed: {e}")));
                }
            }
        }

        Err(CleanupError::PackageNotFound { package: spec.label().to_string(), attempted })
    }
}

//! Version range resolution against the registry.
//!
//! npm ranges are close to, but not exactly, what the `semver` crate
//! parses. The differences handled here:
//! - a bare version pins exactly when that version exists (the semver
//!   crate would treat `10.19.4` as `^10.19.4`)
//! - `||` separates alternatives
//! - hyphen ranges: `1.0.0 - 2.0.0`
//! - comparators separated by spaces instead of commas: `>=2.1.2 <3.0.0`
//!
//! Wildcards (`*`, `1.x`, `1.2.X`) are understood by the semver crate
//! directly.

use crate::error::InstallError;
use crate::registry::RegistryClient;
use semver::{Version, VersionReq};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Resolve the highest version of `name` satisfying `range`.
///
/// `name` is the full registry name (`@scope/name` for scoped packages).
/// Version keys in the listing that are not valid semver are skipped; the
/// registry is known to contain stray tags.
///
/// # Errors
/// Returns `METADATA_FETCH_FAILED` if the listing cannot be fetched,
/// `SPEC_INVALID` if the range cannot be parsed and
/// `NO_MATCHING_VERSION` if nothing satisfies it.
pub async fn resolve_version(
    client: &RegistryClient,
    name: &str,
    range: &str,
    cancel: &CancellationToken,
) -> Result<String, InstallError> {
    let packument = client.fetch_packument(name, cancel).await?;

    let mut versions: Vec<Version> = packument
        .get("versions")
        .and_then(serde_json::Value::as_object)
        .map(|obj| obj.keys().filter_map(|k| Version::parse(k).ok()).collect())
        .unwrap_or_default();
    versions.sort();

    let version = pick_highest(name, range, &versions)?;
    debug!(name = %name, range = %range, version = %version, "resolved version");
    Ok(version)
}

/// Pick the highest of `versions` (sorted ascending) satisfying `range`.
fn pick_highest(name: &str, range: &str, versions: &[Version]) -> Result<String, InstallError> {
    // An exact pin that exists in the listing wins outright.
    if let Ok(exact) = Version::parse(range.trim()) {
        if versions.contains(&exact) {
            return Ok(exact.to_string());
        }
    }

    let reqs = parse_range(range)?;
    for version in versions.iter().rev() {
        if reqs.iter().any(|req| req.matches(version)) {
            return Ok(version.to_string());
        }
    }

    Err(InstallError::no_matching_version(name, range))
}

/// Parse an npm range into one or more requirements (one per `||`
/// alternative).
fn parse_range(range: &str) -> Result<Vec<VersionReq>, InstallError> {
    let mut reqs = Vec::new();
    for alternative in range.split("||") {
        let alternative = alternative.trim();
        if alternative.is_empty() {
            continue;
        }
        if let Ok(req) = parse_constraint(alternative) {
            reqs.push(req);
        }
    }

    if reqs.is_empty() {
        return Err(InstallError::spec_invalid(format!(
            "invalid version range '{range}'"
        )));
    }
    Ok(reqs)
}

/// Parse a single (non-`||`) constraint, normalising npm syntax the
/// semver crate does not accept.
fn parse_constraint(constraint: &str) -> Result<VersionReq, semver::Error> {
    // Hyphen range: "1.0.0 - 2.0.0" means ">=1.0.0, <=2.0.0".
    if let Some((low, high)) = constraint.split_once(" - ") {
        return VersionReq::parse(&format!(">={}, <={}", low.trim(), high.trim()));
    }

    VersionReq::parse(&join_comparators(constraint))
}

/// npm separates ANDed comparators with spaces; the semver crate wants
/// commas. An operator may also be separated from its version
/// (">= 2.1.2"), so bare-operator tokens are merged with the token that
/// follows.
fn join_comparators(constraint: &str) -> String {
    let mut comparators: Vec<String> = Vec::new();
    for token in constraint.split_whitespace() {
        match comparators.last_mut() {
            Some(last) if last.chars().all(|c| "<>=~^".contains(c)) => last.push_str(token),
            _ => comparators.push(token.to_string()),
        }
    }
    comparators.join(", ")
}

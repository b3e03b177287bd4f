//! Package specifier parsing.
//!
//! A specifier is one of:
//! - `./pkg` or `../pkg`: a path relative to the install root
//! - `/abs/pkg`: an absolute path
//! - `name@range` / `@scope/name@range`: a registry package
//!
//! Registry specifiers must carry an explicit version range; bare names
//! and the `latest` tag are rejected.

use crate::error::InstallError;
use std::path::PathBuf;

/// A parsed package specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    /// Path relative to the install root.
    Local(PathBuf),
    /// Absolute path.
    Absolute(PathBuf),
    /// Registry package with a semver range.
    Registry {
        /// Scope including its leading `@` (e.g. `@types`), if scoped.
        scope: Option<String>,
        /// Bare package name without the scope.
        name: String,
        /// Raw version range as written.
        range: String,
    },
}

impl Specifier {
    /// Parse a raw specifier string.
    ///
    /// The version delimiter is the *last* `@` so scoped names like
    /// `@scope/name@1.0.0` split correctly.
    ///
    /// # Errors
    /// Returns `SPEC_INVALID` when the version is missing or empty, or
    /// when the range is the `latest` tag.
    pub fn parse(input: &str) -> Result<Self, InstallError> {
        if input.starts_with('.') {
            return Ok(Self::Local(PathBuf::from(input)));
        }
        if input.starts_with('/') {
            return Ok(Self::Absolute(PathBuf::from(input)));
        }

        let Some((name, range)) = input.rsplit_once('@') else {
            return Err(missing_version(input));
        };
        if name.is_empty() || range.is_empty() {
            return Err(missing_version(input));
        }
        if range == "latest" {
            return Err(InstallError::spec_invalid(format!(
                "unable to install {input} because tagged versions aren't supported"
            )));
        }

        let (scope, name) = match name.rsplit_once('/') {
            Some((scope, bare)) => (Some(scope.to_string()), bare.to_string()),
            None => (None, name.to_string()),
        };

        Ok(Self::Registry {
            scope,
            name,
            range: range.to_string(),
        })
    }

    /// Full registry name: `scope/name` for scoped packages, `name`
    /// otherwise. Also the package key for registry specifiers.
    #[must_use]
    pub fn full_name(scope: Option<&str>, name: &str) -> String {
        match scope {
            Some(scope) => format!("{scope}/{name}"),
            None => name.to_string(),
        }
    }
}

fn missing_version(input: &str) -> InstallError {
    InstallError::spec_invalid(format!(
        "unable to install {input} because it's missing the version (e.g. {input}@1.0.0)"
    ))
}

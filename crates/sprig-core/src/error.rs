//! Install engine error types.

use std::fmt;
use std::io;

/// Install error codes, grouped by cause.
pub mod codes {
    pub const SPEC_INVALID: &str = "SPEC_INVALID";
    pub const METADATA_FETCH_FAILED: &str = "METADATA_FETCH_FAILED";
    pub const NO_MATCHING_VERSION: &str = "NO_MATCHING_VERSION";
    pub const TARBALL_FETCH_FAILED: &str = "TARBALL_FETCH_FAILED";
    pub const ARCHIVE_MALFORMED: &str = "ARCHIVE_MALFORMED";
    pub const FS_ERROR: &str = "FS_ERROR";
    pub const MANIFEST_UNREADABLE: &str = "MANIFEST_UNREADABLE";
    pub const CANCELLED: &str = "CANCELLED";
}

/// Install engine error.
///
/// `Clone` because a single install result is shared between every task
/// that coalesced on the same package key.
#[derive(Debug, Clone)]
pub struct InstallError {
    code: &'static str,
    message: String,
}

impl InstallError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create an invalid specifier error.
    pub fn spec_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::SPEC_INVALID, msg)
    }

    /// Create a metadata fetch error.
    pub fn metadata_fetch(msg: impl Into<String>) -> Self {
        Self::new(codes::METADATA_FETCH_FAILED, msg)
    }

    /// Create a "no matching version" error.
    #[must_use]
    pub fn no_matching_version(name: &str, range: &str) -> Self {
        Self::new(
            codes::NO_MATCHING_VERSION,
            format!("no version of {name} satisfies range: {range}"),
        )
    }

    /// Create a tarball fetch error.
    pub fn tarball_fetch(msg: impl Into<String>) -> Self {
        Self::new(codes::TARBALL_FETCH_FAILED, msg)
    }

    /// Create a malformed archive error.
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::new(codes::ARCHIVE_MALFORMED, msg)
    }

    /// Create a filesystem error.
    pub fn fs(msg: impl Into<String>) -> Self {
        Self::new(codes::FS_ERROR, msg)
    }

    /// Create a manifest error.
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::new(codes::MANIFEST_UNREADABLE, msg)
    }

    /// Create a cancellation error.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(codes::CANCELLED, "install session cancelled")
    }

    /// Prefix the message with the specifier the error belongs to.
    #[must_use]
    pub fn for_package(self, spec: &str) -> Self {
        Self {
            code: self.code,
            message: format!("install {spec}: {}", self.message),
        }
    }
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for InstallError {}

impl From<io::Error> for InstallError {
    fn from(e: io::Error) -> Self {
        Self::new(codes::FS_ERROR, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_code() {
        let err = InstallError::spec_invalid("bad spec");
        assert_eq!(err.code(), codes::SPEC_INVALID);
        assert!(err.to_string().contains(codes::SPEC_INVALID));
        assert!(err.to_string().contains("bad spec"));
    }

    #[test]
    fn test_for_package_prefixes_message() {
        let err = InstallError::tarball_fetch("status 404").for_package("uid@2.0.0");
        assert_eq!(err.code(), codes::TARBALL_FETCH_FAILED);
        assert!(err.message().starts_with("install uid@2.0.0:"));
    }

    #[test]
    fn test_error_codes_uppercase() {
        let all_codes = [
            codes::SPEC_INVALID,
            codes::METADATA_FETCH_FAILED,
            codes::NO_MATCHING_VERSION,
            codes::TARBALL_FETCH_FAILED,
            codes::ARCHIVE_MALFORMED,
            codes::FS_ERROR,
            codes::MANIFEST_UNREADABLE,
            codes::CANCELLED,
        ];

        for code in all_codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "error code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }

    #[test]
    fn test_from_io_error() {
        let err = InstallError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.code(), codes::FS_ERROR);
    }
}

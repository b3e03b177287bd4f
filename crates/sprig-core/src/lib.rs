#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! Dependency materialisation engine.
//!
//! Populates a `node_modules` directory from package specifiers without
//! requiring npm to be installed, for embedding by a build tool that
//! needs JavaScript dependencies laid out conventionally before bundling.
//!
//! The pipeline per package: specifier parsing → version resolution
//! against the registry → tarball download and streaming extraction (or,
//! for local packages, manifest-driven packing) → recursive dependency
//! discovery. A session-scoped single-flight table guarantees each
//! package key installs at most once per [`install`] call.

pub mod config;
pub mod error;
pub mod install;
pub mod local;
pub mod manifest;
pub mod registry;
pub mod spec;
pub mod tarball;
pub mod version;

pub use config::Config;
pub use error::{codes, InstallError};
pub use install::install;
pub use manifest::Manifest;
pub use registry::{RegistryClient, DEFAULT_REGISTRY, REGISTRY_ENV};
pub use spec::Specifier;
pub use version::resolve_version;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Narrow package manifest readers.
//!
//! Two views of `package.json` are needed. Local packing reads the typed
//! subset below. Dependency recursion re-reads the installed manifest
//! through [`read_dependencies`], which only looks at the `dependencies`
//! map and tolerates whatever else the document contains; published
//! manifests routinely carry nested conditional `exports` that the typed
//! subset does not model.

use crate::error::InstallError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The subset of a package manifest consumed for local packing.
///
/// `exports` is modelled as a flat string map; conditional-export trees
/// are a known gap. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub name: String,
    pub main: Option<String>,
    pub browser: Option<String>,
    pub files: Vec<String>,
    pub imports: BTreeMap<String, BTreeMap<String, String>>,
    pub exports: BTreeMap<String, String>,
    pub dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// Read and parse a manifest file.
    ///
    /// # Errors
    /// Returns `MANIFEST_UNREADABLE` if the file is missing or does not
    /// match the modelled shape.
    pub fn read(path: &Path) -> Result<Self, InstallError> {
        let raw = fs::read(path)
            .map_err(|e| InstallError::manifest(format!("unable to read {}: {e}", path.display())))?;
        serde_json::from_slice(&raw)
            .map_err(|e| InstallError::manifest(format!("unable to parse {}: {e}", path.display())))
    }
}

/// Read only the `dependencies` map of a manifest.
///
/// # Errors
/// Returns `MANIFEST_UNREADABLE` if the file is missing, is not valid
/// JSON, or its `dependencies` values are not strings.
pub fn read_dependencies(path: &Path) -> Result<BTreeMap<String, String>, InstallError> {
    #[derive(Deserialize)]
    struct Dependencies {
        #[serde(default)]
        dependencies: BTreeMap<String, String>,
    }

    let raw = fs::read(path)
        .map_err(|e| InstallError::manifest(format!("unable to read {}: {e}", path.display())))?;
    let parsed: Dependencies = serde_json::from_slice(&raw)
        .map_err(|e| InstallError::manifest(format!("unable to parse {}: {e}", path.display())))?;
    Ok(parsed.dependencies)
}

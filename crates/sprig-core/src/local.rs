//! Local package installation.
//!
//! A limited rendition of npm's packing rules, sufficient for typical
//! frontend libraries: the manifest itself, `main`, `browser`, everything
//! under the `files` globs, and any path named by `exports`/`imports` are
//! copied into `node_modules`. Hidden names and npm's standard exclusion
//! set are skipped while walking `files`.

use crate::error::InstallError;
use crate::manifest::Manifest;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Base names never packed from a `files` walk.
///
/// Mirrors npm-packlist's fixed exclusions.
const DENY_LIST: [&str; 7] = [
    "node_modules",
    ".git",
    ".DS_Store",
    ".npmignore",
    ".gitignore",
    ".npmrc",
    "npm-debug.log",
];

/// A local package rooted at an absolute source directory.
#[derive(Debug, Clone)]
pub struct LocalPackage {
    manifest: Manifest,
    dir: PathBuf,
}

impl LocalPackage {
    /// Read a local package from `dir` (must already be absolute or
    /// resolved against the session root).
    ///
    /// # Errors
    /// Returns `MANIFEST_UNREADABLE` if `dir/package.json` is missing,
    /// malformed, or has no `name`.
    pub fn read(dir: &Path) -> Result<Self, InstallError> {
        let manifest = Manifest::read(&dir.join("package.json"))?;
        if manifest.name.is_empty() {
            return Err(InstallError::manifest(format!(
                "package.json in {} has no name",
                dir.display()
            )));
        }
        Ok(Self {
            manifest,
            dir: dir.to_path_buf(),
        })
    }

    /// The declared package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// Copy the package's file set into `{root}/node_modules/{name}`,
    /// returning the destination directory.
    ///
    /// # Errors
    /// Returns `FS_ERROR` if the walk or a copy fails, and `CANCELLED` if
    /// the token trips between files.
    pub fn pack_into(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, InstallError> {
        let files = self.file_set()?;
        let dest = root.join("node_modules").join(self.name());

        for rel in &files {
            if cancel.is_cancelled() {
                return Err(InstallError::cancelled());
            }
            copy_file(&self.dir.join(rel), &dest.join(rel))?;
        }

        debug!(name = %self.name(), dest = %dest.display(), files = files.len(), "copied local package");
        Ok(dest)
    }

    /// Compute the set of paths to pack, relative to the package root.
    fn file_set(&self) -> Result<BTreeSet<PathBuf>, InstallError> {
        let mut files = BTreeSet::new();
        files.insert(PathBuf::from("package.json"));

        if let Some(main) = &self.manifest.main {
            files.insert(clean_rel(main));
        }
        if let Some(browser) = &self.manifest.browser {
            files.insert(clean_rel(browser));
        }
        for targets in self.manifest.imports.values() {
            for target in targets.values() {
                files.insert(clean_rel(target));
            }
        }
        for target in self.manifest.exports.values() {
            files.insert(clean_rel(target));
        }

        for pattern in &self.manifest.files {
            self.collect_files_entry(pattern, &mut files)?;
        }

        Ok(files)
    }

    /// Expand one `files` entry: a literal file, a directory to walk, or
    /// a glob pattern.
    fn collect_files_entry(
        &self,
        raw: &str,
        out: &mut BTreeSet<PathBuf>,
    ) -> Result<(), InstallError> {
        let cleaned = clean_rel(raw);

        if raw.contains(['*', '?', '[']) {
            let pattern = self.dir.join(&cleaned);
            let matches = glob::glob(&pattern.to_string_lossy()).map_err(|e| {
                InstallError::fs(format!("invalid files pattern '{raw}': {e}"))
            })?;
            for path in matches.flatten() {
                if path.is_dir() {
                    self.walk(&path, out)?;
                } else {
                    self.push_allowed(&path, out);
                }
            }
            return Ok(());
        }

        let full = self.dir.join(&cleaned);
        if full.is_dir() {
            self.walk(&full, out)?;
        } else if full.is_file() {
            self.push_allowed(&full, out);
        }
        // A listed path that doesn't exist is simply not packed.
        Ok(())
    }

    /// Recursively collect files under `dir`, skipping excluded names
    /// without descending into excluded directories.
    fn walk(&self, dir: &Path, out: &mut BTreeSet<PathBuf>) -> Result<(), InstallError> {
        if is_excluded_name(dir.file_name().and_then(|n| n.to_str()).unwrap_or("")) {
            return Ok(());
        }
        let entries = fs::read_dir(dir).map_err(|e| {
            InstallError::fs(format!("unable to walk {}: {e}", dir.display()))
        })?;
        for entry in entries {
            let entry = entry
                .map_err(|e| InstallError::fs(format!("unable to walk {}: {e}", dir.display())))?;
            let name = entry.file_name();
            if is_excluded_name(&name.to_string_lossy()) {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                self.walk(&path, out)?;
            } else {
                self.push_allowed(&path, out);
            }
        }
        Ok(())
    }

    /// Insert `path` (absolute, under the package dir) unless any of its
    /// components is excluded.
    fn push_allowed(&self, path: &Path, out: &mut BTreeSet<PathBuf>) {
        let Ok(rel) = path.strip_prefix(&self.dir) else {
            return;
        };
        let excluded = rel
            .components()
            .any(|c| is_excluded_name(&c.as_os_str().to_string_lossy()));
        if !excluded {
            out.insert(rel.to_path_buf());
        }
    }
}

fn is_excluded_name(name: &str) -> bool {
    name.starts_with('.') || DENY_LIST.contains(&name)
}

/// Normalise a manifest path reference: drop `./` segments.
fn clean_rel(raw: &str) -> PathBuf {
    Path::new(raw)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), InstallError> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            InstallError::fs(format!("unable to make directory for {}: {e}", dst.display()))
        })?;
    }
    fs::copy(src, dst).map_err(|e| {
        InstallError::fs(format!(
            "unable to copy {} to {}: {e}",
            src.display(),
            dst.display()
        ))
    })?;
    Ok(())
}

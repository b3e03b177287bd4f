//! Concurrent install scheduling.
//!
//! One call to [`install`] is one session: a shared registry client, a
//! cancellation token, and a single-flight table keyed by package
//! identity. Top-level specifiers and each installed package's
//! dependencies fan out concurrently. A key is installed at most once per
//! session; later requests for the same key await the first flight and
//! observe its result. Two specifiers naming the same package at
//! different versions therefore collide and the first one wins.

use crate::error::InstallError;
use crate::local::LocalPackage;
use crate::manifest;
use crate::registry::RegistryClient;
use crate::spec::Specifier;
use crate::tarball::extract_tarball;
use crate::version::resolve_version;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Concurrent installs per fan-out level.
const MAX_CONCURRENT_INSTALLS: usize = 32;

/// A shared install result: the first task to claim a key runs the
/// install under its cell, everyone else awaits it.
type Flight = Arc<OnceCell<Result<(), InstallError>>>;

struct Session {
    root: PathBuf,
    registry: RegistryClient,
    cancel: CancellationToken,
    inflight: Mutex<HashMap<String, Flight>>,
}

/// Install `specifiers` into `{root}/node_modules`.
///
/// An empty specifier list installs the dependencies declared by
/// `{root}/package.json`; a dependency range that is a path (starts with
/// `.` or `/`) is treated as a local specifier. All scheduled work is
/// awaited before returning; the first error observed wins.
///
/// # Errors
/// Returns the first [`InstallError`] produced by any scheduled install,
/// or `CANCELLED` once `cancel` trips.
pub async fn install<S: AsRef<str>>(
    root: &Path,
    specifiers: &[S],
    cancel: &CancellationToken,
) -> Result<(), InstallError> {
    let session = Arc::new(Session {
        root: root.to_path_buf(),
        registry: RegistryClient::from_env()?,
        cancel: cancel.clone(),
        inflight: Mutex::new(HashMap::new()),
    });

    let specs: Vec<String> = if specifiers.is_empty() {
        root_manifest_specifiers(root)?
    } else {
        specifiers.iter().map(|s| s.as_ref().to_string()).collect()
    };

    debug!(root = %root.display(), count = specs.len(), "starting install session");
    install_all(&session, specs, &[]).await
}

/// Zero-specifier mode: derive the initial set from the root manifest.
fn root_manifest_specifiers(root: &Path) -> Result<Vec<String>, InstallError> {
    let deps = manifest::read_dependencies(&root.join("package.json"))?;
    Ok(deps
        .into_iter()
        .map(|(name, range)| {
            if range.starts_with('.') || range.starts_with('/') {
                range
            } else {
                format!("{name}@{range}")
            }
        })
        .collect())
}

/// Fan a set of specifiers out and wait for all of them; the first error
/// is returned after every install settles.
fn install_all<'a>(
    session: &'a Arc<Session>,
    specs: Vec<String>,
    ancestors: &'a [String],
) -> BoxFuture<'a, Result<(), InstallError>> {
    Box::pin(async move {
        let results: Vec<Result<(), InstallError>> = stream::iter(specs)
            .map(move |spec| async move { install_one(session, &spec, ancestors).await })
            .buffer_unordered(MAX_CONCURRENT_INSTALLS)
            .collect()
            .await;
        results.into_iter().collect()
    })
}

/// Install a single specifier through the single-flight table.
async fn install_one(
    session: &Arc<Session>,
    spec: &str,
    ancestors: &[String],
) -> Result<(), InstallError> {
    if session.cancel.is_cancelled() {
        return Err(InstallError::cancelled());
    }

    let package = resolve_package(session, spec)
        .await
        .map_err(|e| e.for_package(spec))?;
    let key = package.key();

    // A dependency cycle would make a flight await itself. A key that is
    // already an ancestor of this install is being handled further up the
    // chain, so it is skipped here.
    if ancestors.iter().any(|ancestor| *ancestor == key) {
        debug!(key = %key, "dependency cycle broken");
        return Ok(());
    }

    let flight = {
        let mut inflight = session.inflight.lock().await;
        match inflight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!(key = %key, spec = %spec, "already scheduled, awaiting existing install");
                Arc::clone(entry.get())
            }
            Entry::Vacant(entry) => Arc::clone(entry.insert(Flight::default())),
        }
    };

    flight
        .get_or_init(|| async {
            let mut chain = ancestors.to_vec();
            chain.push(key);
            package
                .install(session, &chain)
                .await
                .map_err(|e| e.for_package(spec))
        })
        .await
        .clone()
}

/// Resolve a specifier to an installable package. Registry version
/// resolution happens here, outside the single-flight table; only the
/// install path is coalesced.
async fn resolve_package(session: &Arc<Session>, spec: &str) -> Result<Package, InstallError> {
    match Specifier::parse(spec)? {
        Specifier::Local(path) => {
            // Relative paths resolve against the session root, not the
            // working directory.
            let dir = session.root.join(path);
            Ok(Package::Local(LocalPackage::read(&dir)?))
        }
        Specifier::Absolute(path) => Ok(Package::Local(LocalPackage::read(&path)?)),
        Specifier::Registry { scope, name, range } => {
            let full_name = Specifier::full_name(scope.as_deref(), &name);
            let version =
                resolve_version(&session.registry, &full_name, &range, &session.cancel).await?;
            Ok(Package::Registry(RegistryPackage {
                scope,
                name,
                version,
            }))
        }
    }
}

enum Package {
    Registry(RegistryPackage),
    Local(LocalPackage),
}

impl Package {
    /// Session-scoped identity used for de-duplication.
    fn key(&self) -> String {
        match self {
            Self::Registry(pkg) => pkg.key(),
            Self::Local(pkg) => pkg.name().to_string(),
        }
    }

    /// Materialise the package on disk, then recurse into its
    /// dependencies.
    async fn install(&self, session: &Arc<Session>, chain: &[String]) -> Result<(), InstallError> {
        let dir = match self {
            Self::Registry(pkg) => pkg.fetch_into(session).await?,
            Self::Local(pkg) => {
                let pkg = pkg.clone();
                let root = session.root.clone();
                let cancel = session.cancel.clone();
                tokio::task::spawn_blocking(move || pkg.pack_into(&root, &cancel))
                    .await
                    .map_err(|e| InstallError::fs(format!("packing task failed: {e}")))??
            }
        };
        install_dependencies(session, &dir, chain).await
    }
}

/// A registry package pinned to a concrete version.
struct RegistryPackage {
    scope: Option<String>,
    name: String,
    version: String,
}

impl RegistryPackage {
    fn key(&self) -> String {
        Specifier::full_name(self.scope.as_deref(), &self.name)
    }

    fn tarball_url(&self, base_url: &str) -> String {
        match &self.scope {
            None => format!(
                "{base_url}/{name}/-/{name}-{version}.tgz",
                name = self.name,
                version = self.version
            ),
            Some(scope) => format!(
                "{base_url}/{scope}/{name}/-/{name}-{version}.tgz",
                name = self.name,
                version = self.version
            ),
        }
    }

    fn install_dir(&self, root: &Path) -> PathBuf {
        let node_modules = root.join("node_modules");
        match &self.scope {
            None => node_modules.join(&self.name),
            Some(scope) => node_modules.join(scope).join(&self.name),
        }
    }

    /// Download and extract the tarball, returning the install directory.
    async fn fetch_into(&self, session: &Arc<Session>) -> Result<PathBuf, InstallError> {
        let url = self.tarball_url(session.registry.base_url());
        let bytes = session.registry.fetch_tarball(&url, &session.cancel).await?;

        let dest = self.install_dir(&session.root);
        let extract_dest = dest.clone();
        let cancel = session.cancel.clone();
        // Decompression is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || extract_tarball(&bytes, &extract_dest, &cancel))
            .await
            .map_err(|e| InstallError::archive(format!("extraction task failed: {e}")))??;

        Ok(dest)
    }
}

/// Re-read the installed manifest and schedule its dependencies.
async fn install_dependencies(
    session: &Arc<Session>,
    dir: &Path,
    chain: &[String],
) -> Result<(), InstallError> {
    let deps = manifest::read_dependencies(&dir.join("package.json"))?;
    if deps.is_empty() {
        return Ok(());
    }
    let specs: Vec<String> = deps
        .into_iter()
        .map(|(name, range)| format!("{name}@{range}"))
        .collect();
    install_all(session, specs, chain).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DEFAULT_REGISTRY;

    fn registry(scope: Option<&str>, name: &str, version: &str) -> RegistryPackage {
        RegistryPackage {
            scope: scope.map(String::from),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_tarball_url_unscoped() {
        let pkg = registry(None, "svelte", "3.42.3");
        assert_eq!(
            pkg.tarball_url(DEFAULT_REGISTRY),
            "https://registry.npmjs.org/svelte/-/svelte-3.42.3.tgz"
        );
    }

    #[test]
    fn test_tarball_url_scoped() {
        let pkg = registry(Some("@stripe"), "stripe-js", "2.1.11");
        assert_eq!(
            pkg.tarball_url(DEFAULT_REGISTRY),
            "https://registry.npmjs.org/@stripe/stripe-js/-/stripe-js-2.1.11.tgz"
        );
    }

    #[test]
    fn test_install_dir() {
        let root = Path::new("/work");
        assert_eq!(
            registry(None, "uid", "2.0.0").install_dir(root),
            Path::new("/work/node_modules/uid")
        );
        assert_eq!(
            registry(Some("@lukeed"), "uuid", "2.0.1").install_dir(root),
            Path::new("/work/node_modules/@lukeed/uuid")
        );
    }

    #[test]
    fn test_registry_key() {
        assert_eq!(registry(None, "uid", "2.0.0").key(), "uid");
        assert_eq!(
            registry(Some("@lukeed"), "uuid", "2.0.1").key(),
            "@lukeed/uuid"
        );
    }
}

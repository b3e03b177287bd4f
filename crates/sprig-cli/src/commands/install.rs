//! `sprig install` command implementation.

use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use sprig_core::{install, Config, InstallError};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Install result for JSON output.
#[derive(Serialize)]
struct InstallJsonResult {
    ok: bool,
    root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(config: &Config, specifiers: &[String], json: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let cancel = CancellationToken::new();

    let result: std::result::Result<(), InstallError> =
        runtime.block_on(install(&config.root, specifiers, &cancel));

    match result {
        Ok(()) => {
            if json {
                let output = InstallJsonResult {
                    ok: true,
                    root: config.root.to_string_lossy().into_owned(),
                    code: None,
                    error: None,
                };
                println!("{}", serde_json::to_string(&output).into_diagnostic()?);
            } else {
                info!(root = %config.root.display(), "install complete");
                println!("installed into {}", config.root.join("node_modules").display());
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let output = InstallJsonResult {
                    ok: false,
                    root: config.root.to_string_lossy().into_owned(),
                    code: Some(e.code().to_string()),
                    error: Some(e.message().to_string()),
                };
                println!("{}", serde_json::to_string(&output).into_diagnostic()?);
                std::process::exit(1);
            }
            Err(miette!("{e}"))
        }
    }
}

//! `sprig resolve` command implementation.

use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use sprig_core::{resolve_version, RegistryClient};
use tokio_util::sync::CancellationToken;

/// Resolve result for JSON output.
#[derive(Serialize)]
struct ResolveJsonResult {
    ok: bool,
    name: String,
    range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(name: &str, range: &str, json: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let cancel = CancellationToken::new();

    let result = runtime.block_on(async {
        let client = RegistryClient::from_env()?;
        resolve_version(&client, name, range, &cancel).await
    });

    match result {
        Ok(version) => {
            if json {
                let output = ResolveJsonResult {
                    ok: true,
                    name: name.to_string(),
                    range: range.to_string(),
                    version: Some(version),
                    code: None,
                    error: None,
                };
                println!("{}", serde_json::to_string(&output).into_diagnostic()?);
            } else {
                println!("{version}");
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let output = ResolveJsonResult {
                    ok: false,
                    name: name.to_string(),
                    range: range.to_string(),
                    version: None,
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

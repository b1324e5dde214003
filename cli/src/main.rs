//! Manifold CLI - batch entry point.
//!
//! Reads a JSON batch file of `{pkg, cmd, data}` entries, assembles the
//! packages each entry names (descriptors live under the configured packages
//! directory), and executes the commands in order. Results are printed to
//! stdout as JSON, one line per entry; logs go to stderr so the output stream
//! stays machine-readable.
//!
//! ```text
//! manifold <batch.json> [--config <manifold.toml>]
//! ```

mod sources;

use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use manifold_core::{FsDescriptorLoader, Runtime, RuntimeConfig};
use manifold_types::RunItem;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

struct CliArgs {
    batch_path: String,
    config_path: Option<String>,
}

const USAGE: &str = "usage: manifold <batch.json> [--config <manifold.toml>]";

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut batch_path = None;
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => bail!("{USAGE}"),
            "--config" => {
                let Some(path) = args.next() else {
                    bail!("--config requires a path\n{USAGE}");
                };
                config_path = Some(path);
            }
            _ if arg.starts_with('-') => bail!("unknown flag {arg}\n{USAGE}"),
            _ => {
                if batch_path.replace(arg).is_some() {
                    bail!("expected a single batch file\n{USAGE}");
                }
            }
        }
    }

    let Some(batch_path) = batch_path else {
        bail!("missing batch file\n{USAGE}");
    };
    Ok(CliArgs {
        batch_path,
        config_path,
    })
}

/// Load the runtime configuration, falling back to `./manifold.toml` when no
/// path is given and to the built-in defaults when neither exists.
fn load_config(path: Option<&str>) -> Result<RuntimeConfig> {
    let path = match path {
        Some(explicit) => explicit.to_string(),
        None => {
            let default = "manifold.toml".to_string();
            if !fs::exists(&default).unwrap_or(false) {
                return Ok(RuntimeConfig::default());
            }
            default
        }
    };
    let text = fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
    toml::from_str(&text).with_context(|| format!("parsing config {path}"))
}

fn load_batch(path: &str) -> Result<Vec<RunItem>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading batch file {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing batch file {path}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = parse_args(env::args().skip(1))?;
    let config = load_config(args.config_path.as_deref())?;
    let batch = load_batch(&args.batch_path)?;
    tracing::info!(
        entries = batch.len(),
        packages = %config.packages_directory,
        "running batch"
    );

    let catalog = sources::builtin_catalog(&config);
    let runtime = Runtime::new(config, Arc::new(FsDescriptorLoader), Arc::new(catalog))?;

    let results = runtime.run(&batch).await?;
    for result in results {
        println!("{result}");
    }
    Ok(())
}

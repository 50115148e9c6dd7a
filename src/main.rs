// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, bail, Context, Result};
use permute::backends::DirectoryProvider;
use permute::config::consts::DEFAULT_CONFIG_FILE;
use permute::config::{load_project_config, DocumentKind, LogFormat, OutputFormat, ProjectConfig};
use permute::engine::{bind_documents, BoundDocument};
use permute::errors::Diagnostic;
use permute::store::{collect_documents, Store};
use permute::traits::DocumentProvider;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: permute [--config FILE] [--format json|yaml] [PROJECT_DIR] [ENTRY ...]";

/// Command line arguments; anything not given falls back to the settings file.
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    format: Option<OutputFormat>,
    project_dir: Option<PathBuf>,
    entries: Vec<String>,
}

fn parse_args(raw: &[String]) -> Result<Args> {
    let mut args = Args::default();
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().ok_or_else(|| anyhow!("--config needs a file"))?;
                args.config = Some(PathBuf::from(value));
            }
            "--format" => {
                let value = iter.next().ok_or_else(|| anyhow!("--format needs a value"))?;
                args.format = Some(value.parse()?);
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("unknown option '{}'\n{}", flag, USAGE),
            positional if args.project_dir.is_none() => {
                args.project_dir = Some(PathBuf::from(positional))
            }
            entry => args.entries.push(entry.to_string()),
        }
    }
    Ok(args)
}

/// Read the settings named on the command line, else `permute.toml` in the project directory.
fn project_config(args: &Args) -> Result<(ProjectConfig, PathBuf)> {
    let base = args.project_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let path = match &args.config {
        Some(path) => path.clone(),
        None => base.join(DEFAULT_CONFIG_FILE),
    };
    if args.config.is_none() && !path.exists() {
        return Ok((ProjectConfig::default(), base));
    }
    let config = load_project_config(&path)?;
    let settings_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    Ok((config, settings_dir))
}

fn init_tracing(config: &ProjectConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn render(bound: &[BoundDocument], format: OutputFormat, pretty: bool) -> Result<String> {
    let graphs: Vec<_> = bound.iter().filter_map(|b| b.result.as_ref().ok()).collect();
    let text = match format {
        OutputFormat::Json if pretty => serde_json::to_string_pretty(&graphs)?,
        OutputFormat::Json => serde_json::to_string(&graphs)?,
        OutputFormat::Yaml => serde_yaml::to_string(&graphs)?,
    };
    Ok(text)
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("error: {}", diagnostic);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let raw: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&raw)?;
    let (config, settings_dir) = project_config(&args)?;
    init_tracing(&config);

    // An explicit project directory wins over the root named by an explicit settings file
    let root = match (&args.project_dir, &args.config) {
        (Some(dir), Some(_)) => dir.clone(),
        _ => settings_dir.join(&config.project.root),
    };
    let provider = DirectoryProvider::new(root.clone());

    let mut entries = if args.entries.is_empty() {
        config.project.entries.clone()
    } else {
        args.entries.clone()
    };
    let bind_everything = entries.is_empty();
    if bind_everything {
        entries = provider
            .modules()
            .with_context(|| format!("cannot list documents under {}", root.display()))?;
    }

    let documents = match collect_documents(&provider, &entries) {
        Ok(documents) => documents,
        Err(diagnostics) => {
            report(&diagnostics);
            bail!("{} document(s) could not be collected", diagnostics.len());
        }
    };

    let mains: Vec<_> = documents
        .iter()
        .filter(|d| d.kind() == DocumentKind::Main)
        .filter(|d| bind_everything || entries.contains(&d.module))
        .cloned()
        .collect();
    if mains.is_empty() {
        bail!("no process documents to bind under {}", root.display());
    }

    let store = match Store::load_with_depth(documents, config.resolver.max_depth) {
        Ok(store) => Arc::new(store),
        Err(diagnostics) => {
            report(&diagnostics);
            bail!("declarations failed to load with {} error(s)", diagnostics.len());
        }
    };

    let bound = bind_documents(store, mains).await;
    let format = args.format.unwrap_or(config.output.format);
    println!("{}", render(&bound, format, config.output.pretty)?);

    let failed: Vec<&BoundDocument> = bound.iter().filter(|b| !b.is_ok()).collect();
    for document in &failed {
        if let Err(diagnostics) = &document.result {
            report(diagnostics);
        }
    }
    if !failed.is_empty() {
        bail!("{} of {} document(s) failed to bind", failed.len(), bound.len());
    }
    Ok(())
}

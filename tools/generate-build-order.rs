//! Generate the file push order for a sequentially loaded script project
//!
//! Reads a module manifest (or scans the sources for module definitions),
//! orders the files so every module loads after its dependencies and writes
//! the result into the deployment document's `filePushOrder`.
//!
//! Usage:
//!   generate-build-order --manifest modules.json --output appsscript.json
//!   generate-build-order --scan src/ --dot graph.dot --dry-run

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};

use modgraph::module::build::{
    to_dot, BuildOrderGenerator, DeploymentDocument, Manifest, ManifestValidator, SourceScanner,
};
use modgraph::utils::{env_path, init_logging, init_logging_from_config};
use modgraph::{ModgraphConfig, CONFIG_ENV_VAR};

#[derive(Parser, Debug)]
#[command(name = "generate-build-order", version, about)]
struct Args {
    /// Module manifest (JSON or TOML)
    #[arg(long, conflicts_with = "scan")]
    manifest: Option<PathBuf>,

    /// Scan this directory for module definitions instead of reading a manifest
    #[arg(long)]
    scan: Option<PathBuf>,

    /// Deployment document to update
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Configuration file (defaults to $MODGRAPH_CONFIG)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Also write the dependency graph in Graphviz format
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Print the order without writing the deployment document
    #[arg(long)]
    dry_run: bool,

    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config_path = args.config.clone().or_else(|| env_path(CONFIG_ENV_VAR));
    let config = match &config_path {
        Some(path) => ModgraphConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ModgraphConfig::default(),
    };

    if args.verbose {
        init_logging(Some("debug"));
    } else {
        init_logging_from_config(config.logging.as_ref());
    }

    let manifest = load_manifest(&args, &config)?;
    info!("Loaded {} manifest entries", manifest.len());

    let validator = ManifestValidator::new();
    validator
        .validate(&manifest)
        .into_result()
        .context("Manifest is invalid")?;
    for warning in validator.lint(&manifest) {
        warn!("{}", warning);
    }

    let generator = BuildOrderGenerator::from_config(&config.build, config.aliases.to_table())?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.build.deployment_file));
    let mut document = DeploymentDocument::load(&output)?;
    let prior = document.push_order();

    if let Some(dot_path) = &args.dot {
        std::fs::write(dot_path, to_dot(&generator.graph(&manifest)))
            .with_context(|| format!("Failed to write {}", dot_path.display()))?;
        info!("Dependency graph written to {}", dot_path.display());
    }

    let order = generator
        .generate(&manifest, &prior)
        .context("Build order generation failed")?;

    for dropped in &order.dropped {
        println!(
            "dropped dependency: {} -> {}",
            dropped.module, dropped.dependency
        );
    }
    for (i, file) in order.files.iter().enumerate() {
        println!("{:>4}  {}", i + 1, file);
    }

    if args.dry_run {
        info!("Dry run, {} left untouched", output.display());
        return Ok(());
    }

    document.set_push_order(&order.files);
    document.save()?;
    info!(
        "Wrote {} files to {} in {}",
        order.files.len(),
        modgraph::module::build::PUSH_ORDER_KEY,
        output.display()
    );
    Ok(())
}

fn load_manifest(args: &Args, config: &ModgraphConfig) -> Result<Manifest> {
    let manifest_path = args
        .manifest
        .clone()
        .or_else(|| config.build.manifest.as_ref().map(PathBuf::from));
    let scan_dir = args.scan.clone().or_else(|| {
        manifest_path
            .is_none()
            .then(|| config.build.scan_dir.as_ref().map(PathBuf::from))
            .flatten()
    });

    if let Some(dir) = scan_dir {
        return SourceScanner::new(&dir)
            .with_extensions(config.build.extensions.iter().map(String::as_str))
            .scan()
            .with_context(|| format!("Failed to scan {}", dir.display()));
    }

    let path = manifest_path
        .context("No manifest given (use --manifest, --scan or build.manifest in the config)")?;
    Manifest::from_file(&path).with_context(|| format!("Failed to read {}", path.display()))
}

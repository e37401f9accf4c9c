//! Manifest Merge CLI
//!
//! Entry point for the `manifest-merge` command-line tool.

use clap::{Args, Parser, Subcommand};
use manifest_merge::{
    EffectiveConfig, EffectiveManifest, FsResolver, Manifest, ManifestError, Merged, ProjectFile,
    SourceLocation,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_PROJECT_FILE: &str = "manifest.toml";

#[derive(Parser)]
#[command(name = "manifest-merge")]
#[command(about = "Compose manifests from attributes, sections and other manifests", version)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective manifest
    Effective {
        #[command(flatten)]
        merge: MergeArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Write the effective manifest to a file (atomically)
    Write {
        #[command(flatten)]
        merge: MergeArgs,

        /// Destination file
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// Parse a manifest file and print a summary
    Check {
        /// Manifest file to check
        file: PathBuf,

        /// Maximum line width the file was written with
        #[arg(long)]
        line_width: Option<usize>,
    },
}

#[derive(Args)]
struct MergeArgs {
    /// Path to project file (default: manifest.toml if present)
    #[arg(long, short = 'p')]
    project: Option<PathBuf>,

    /// Main attribute, applied after the project file (repeatable)
    #[arg(long = "attr", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    attrs: Vec<(String, String)>,

    /// Manifest file merged after the project's sources (repeatable)
    #[arg(long = "from", value_name = "PATH")]
    from: Vec<PathBuf>,

    /// Maximum physical line width in bytes
    #[arg(long)]
    line_width: Option<usize>,

    /// Line ending (crlf, lf)
    #[arg(long)]
    line_ending: Option<String>,

    /// Resolve merge sources one after another
    #[arg(long)]
    sequential: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", s))
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Effective { merge, json } => run_effective(&merge, json),
        Commands::Write { merge, output } => run_write(&merge, &output),
        Commands::Check { file, line_width } => run_check(&file, line_width),
    }
}

fn run_effective(args: &MergeArgs, json_output: bool) {
    let (manifest, config) = exit_on_error(build_manifest(args));
    let merged = exit_on_error(manifest.merge());

    if json_output {
        let output = exit_on_error(to_json_report(&merged, &config));
        println!("{}", output);
        return;
    }

    let bytes = exit_on_error(merged.manifest.to_bytes(&config.format));
    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout.write_all(&bytes).and_then(|()| stdout.flush()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

fn run_write(args: &MergeArgs, output: &Path) {
    let (manifest, _config) = exit_on_error(build_manifest(args));
    exit_on_error(manifest.write_to_path(output));
    eprintln!("Wrote {}", output.display());
}

fn run_check(file: &Path, line_width: Option<usize>) {
    let cli_overrides = line_width.map(|width| serde_json::json!({"format": {"line_width": width}}));
    let user_config = EffectiveConfig::default_user_config_path();
    let config = exit_on_error(
        EffectiveConfig::build(user_config.as_deref(), None, cli_overrides).map_err(ManifestError::from),
    );

    let bytes = match fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {}", file.display(), e);
            process::exit(1);
        }
    };

    let effective = match EffectiveManifest::parse(&bytes, &config.format) {
        Ok(effective) => effective,
        Err(e) => {
            eprintln!("{}: {}", file.display(), e);
            process::exit(1);
        }
    };

    println!("Manifest valid: {}", file.display());
    println!();
    println!("  Main attributes: {}", effective.main_attributes().len());
    if !effective.sections().is_empty() {
        let names: Vec<&str> = effective.sections().keys().map(String::as_str).collect();
        println!("  Sections: {}", names.join(", "));
    }
    if let Ok(digest) = effective.sha256(&config.format) {
        println!("  SHA-256: {}", digest);
    }
}

/// Assemble the manifest described by the project file and CLI flags.
fn build_manifest(args: &MergeArgs) -> Result<(Manifest, EffectiveConfig), ManifestError> {
    let project = load_project(args.project.as_deref())?;

    let user_config = EffectiveConfig::default_user_config_path();
    let config = EffectiveConfig::build(user_config.as_deref(), project.as_ref(), cli_overrides(args))?;

    let cwd = std::env::current_dir().map_err(|source| ManifestError::Io {
        context: "reading current directory".to_string(),
        source,
    })?;
    let base_dir = project
        .as_ref()
        .and_then(ProjectFile::base_dir)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| cwd.clone(), Path::to_path_buf);

    let mut manifest = Manifest::with_default_version()
        .with_options(config.format)
        .with_parallel_resolution(config.parallel)
        .with_resolver(Arc::new(FsResolver::new(base_dir)));

    if let Some(ref project) = project {
        project.apply_to(&mut manifest)?;
    }
    if !args.attrs.is_empty() {
        manifest.attributes(args.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    }
    for path in &args.from {
        // --from paths are relative to where the tool runs, not the project
        let path = if path.is_absolute() { path.clone() } else { cwd.join(path) };
        manifest.merge_from(SourceLocation::new(path.to_string_lossy()));
    }

    Ok((manifest, config))
}

fn load_project(path: Option<&Path>) -> Result<Option<ProjectFile>, ManifestError> {
    match path {
        Some(path) => Ok(Some(ProjectFile::from_file(path)?)),
        None => {
            let default = Path::new(DEFAULT_PROJECT_FILE);
            if default.exists() {
                Ok(Some(ProjectFile::from_file(default)?))
            } else {
                Ok(None)
            }
        }
    }
}

fn cli_overrides(args: &MergeArgs) -> Option<serde_json::Value> {
    let mut format = serde_json::Map::new();
    if let Some(width) = args.line_width {
        format.insert("line_width".to_string(), width.into());
    }
    if let Some(ref ending) = args.line_ending {
        format.insert("line_ending".to_string(), ending.clone().into());
    }

    let mut overrides = serde_json::Map::new();
    if !format.is_empty() {
        overrides.insert("format".to_string(), serde_json::Value::Object(format));
    }
    if args.sequential {
        overrides.insert("merge".to_string(), serde_json::json!({"parallel": false}));
    }

    if overrides.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(overrides))
    }
}

fn to_json_report(merged: &Merged, config: &EffectiveConfig) -> Result<String, ManifestError> {
    let sha256 = merged.manifest.sha256(&config.format)?;
    let report = serde_json::json!({
        "main": merged.manifest.main_attributes(),
        "sections": merged.manifest.sections(),
        "sources": merged.sources,
        "sha256": sha256,
        "config_sources": config.sources,
    });
    serde_json::to_string_pretty(&report).map_err(|e| ManifestError::Io {
        context: "serializing output".to_string(),
        source: e.into(),
    })
}

fn exit_on_error<T>(result: Result<T, ManifestError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

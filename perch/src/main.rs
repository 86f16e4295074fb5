// SPDX-License-Identifier: AGPL-3.0-or-later
//! Kea-Perch: Cloud resource graph builder for the Kea ecosystem
//!
//! Command-line adapter around the synthesis pipeline.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kea_perch::{
    config::SAMPLE_CONFIG,
    stack::{self, bucket_name, subject_pattern, Context, GithubProviderLookup, ResourceGraph},
    Config,
};

/// Kea-Perch: The Landing Ledge
///
/// Derives a restricted storage bucket and a GitHub OIDC role from a project
/// configuration and emits the resource graph for a deployment engine.
#[derive(Parser, Debug)]
#[command(name = "perch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "perch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Target account id (overrides the configuration file)
    #[arg(long)]
    account_id: Option<String>,

    /// Target region (overrides the configuration file)
    #[arg(long)]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize the resource graph
    #[command(alias = "synthesize")]
    Synth {
        /// Write the graph to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show the exported identifiers
    Outputs {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate the configuration without synthesizing
    Validate,

    /// Print the CI role's trust policy document
    TrustPolicy,

    /// Show configuration
    Config,

    /// Initialize a new perch configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so synthesized JSON on stdout stays clean
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Version => {
            println!("Kea-Perch v{}", env!("CARGO_PKG_VERSION"));
            println!("The Landing Ledge for the Kea Ecosystem");
            Ok(())
        }

        Commands::Init { force } => init_config(&cli.config, *force).await,

        Commands::Config => show_config(&cli.config),

        Commands::Validate => validate_config(&cli),

        Commands::Synth { out } => synth(&cli, out.as_deref()).await,

        Commands::Outputs { format } => show_outputs(&cli, *format),

        Commands::TrustPolicy => show_trust_policy(&cli),
    }
}

/// Load the configuration file and resolve the deployment context
fn load(cli: &Cli) -> anyhow::Result<(Config, Context)> {
    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let ctx = config
        .context(cli.account_id.as_deref(), cli.region.as_deref())
        .context("Invalid deployment context")?;
    Ok((config, ctx))
}

/// Run the full pipeline
fn build_graph(cli: &Cli) -> anyhow::Result<ResourceGraph> {
    let (config, ctx) = load(cli)?;
    let graph = stack::synthesize(&config.project, &ctx, &GithubProviderLookup)
        .context("Synthesis failed")?;
    Ok(graph)
}

/// Initialize a new configuration file
async fn init_config(config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    tokio::fs::write(config_path, SAMPLE_CONFIG).await?;
    info!("Created configuration file: {}", config_path.display());
    println!("Created configuration file: {}", config_path.display());
    Ok(())
}

/// Show the current configuration
fn show_config(config_path: &Path) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("No configuration file found. Sample configuration:");
        println!();
        println!("{}", SAMPLE_CONFIG);
        return Ok(());
    }

    let config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Validate the configuration file
fn validate_config(cli: &Cli) -> anyhow::Result<()> {
    info!("Validating configuration: {}", cli.config.display());

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let project = stack::validate(&config.project).context("Project validation failed")?;

    println!("Configuration for project '{}' is valid", project.project_id());
    println!();
    println!("  Bucket: {}", bucket_name(project.project_id()));
    println!(
        "  Subject: {}",
        subject_pattern(project.github_repo_owner(), project.github_repo_name())
    );
    println!("  Versioning: {}", project.enable_versioning());
    println!("  Encryption: {}", project.enable_encryption());
    println!("  Policies: {}", project.managed_policies().join(", "));

    Ok(())
}

/// Synthesize and emit the resource graph
async fn synth(cli: &Cli, out: Option<&Path>) -> anyhow::Result<()> {
    let graph = build_graph(cli)?;
    let json = graph.to_json()?;
    let fingerprint = graph.fingerprint()?;

    match out {
        Some(path) => {
            tokio::fs::write(path, &json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Wrote resource graph to {} ({} resources)",
                path.display(),
                graph.nodes().len()
            );
            for node in graph.nodes() {
                let origin = if node.resource.is_managed() {
                    "managed"
                } else {
                    "existing"
                };
                println!(
                    "  - {} ({}, {})",
                    node.logical_id,
                    node.resource.kind(),
                    origin
                );
            }
            println!("Fingerprint: {}", fingerprint);
        }
        None => println!("{}", json),
    }

    info!(fingerprint = %fingerprint, "Synthesis complete");
    Ok(())
}

/// Show the exported identifiers
fn show_outputs(cli: &Cli, format: OutputFormat) -> anyhow::Result<()> {
    let graph = build_graph(cli)?;
    let outputs = graph.outputs();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outputs)?),
        OutputFormat::Text => {
            for (name, value) in outputs.iter() {
                println!("{} = {}", name, value);
            }
        }
    }

    Ok(())
}

/// Print the trust policy document of the CI role
fn show_trust_policy(cli: &Cli) -> anyhow::Result<()> {
    let graph = build_graph(cli)?;
    let role = graph
        .role()
        .context("Resource graph has no role node")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&role.trust_policy_document())?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["perch", "version"]).unwrap();
        match cli.command {
            Commands::Version => {}
            _ => panic!("Expected Version command"),
        }
    }

    #[test]
    fn test_cli_synth_out() {
        let cli = Cli::try_parse_from(["perch", "synth", "--out", "graph.json"]).unwrap();
        match cli.command {
            Commands::Synth { out } => assert_eq!(out, Some(PathBuf::from("graph.json"))),
            _ => panic!("Expected Synth command"),
        }
    }

    #[test]
    fn test_cli_context_overrides() {
        let cli = Cli::try_parse_from([
            "perch",
            "--account-id",
            "123456789012",
            "--region",
            "eu-west-1",
            "outputs",
        ])
        .unwrap();
        assert_eq!(cli.account_id.as_deref(), Some("123456789012"));
        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_cli_json_format() {
        let cli = Cli::try_parse_from(["perch", "outputs", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Outputs { format } => assert_eq!(format, OutputFormat::Json),
            _ => panic!("Expected Outputs command"),
        }
    }

    #[test]
    fn test_cli_format_scoped_to_outputs() {
        assert!(Cli::try_parse_from(["perch", "--format", "json", "validate"]).is_err());
        assert!(Cli::try_parse_from(["perch", "validate", "--format", "json"]).is_err());
    }

    #[test]
    fn test_cli_default_config_path() {
        let cli = Cli::try_parse_from(["perch", "validate"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("perch.toml"));
    }
}

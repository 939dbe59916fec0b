//! targeted-id command-line tool.
//!
//! Provides subcommands for generating a starter configuration, validating
//! a configuration file, and deriving tokens for a request state offline
//! (useful for checking what a given user/SP pair will receive before a
//! change goes live).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use targetedid_core::config::ModuleConfig;
use targetedid_core::generator::{TargetedIdGenerator, OUTPUT_ATTRIBUTE};
use targetedid_core::state::AttributeValues;
use targetedid_core::RequestState;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// targeted-id command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "targetedid",
    version,
    about = "Derive and inspect pseudonymous targeted-ID attribute values"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        global = true,
        default_value = "/etc/targetedid/config.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./targetedid.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file and summarize the configured values.
    Validate,

    /// Derive tokens for a request state read from a JSON file.
    Derive {
        /// Path to the request-state JSON file.
        #[arg(short, long)]
        state: PathBuf,

        /// Print the full mutated request state as JSON instead of just
        /// the derived tokens.
        #[arg(long)]
        json: bool,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // Minimal logging for CLI; RUST_LOG raises it when debugging a config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => cmd_validate(&cli.config),
        Commands::Derive { state, json } => cmd_derive(&cli.config, &state, json),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# targeted-id configuration
# Each [[values]] block derives one independently configured token per request.

# Salt mixed into every hashed payload. Keep it secret and stable:
# changing it changes every identifier this deployment has ever issued.
salt = "change-me"

# Digest algorithm: sha1, sha224, sha256, sha384, or sha512.
hash_function = "sha256"

# Candidate paths identifying the authenticated user, in order of preference.
user_id = ["Attributes/eduPersonPrincipalName", "Attributes/uid", "UserID"]

# Candidate paths identifying the requesting service.
target_id = ["saml:RequesterID", "core:SP"]

# Candidate paths identifying this identity provider.
source_id = ["Attributes/schacHomeOrganization", "core:IdP"]

[[values]]
name = "default"

# A second value released only to matching services, as a SAML NameID:
#[[values]]
#name = "edugain"
#if_target = ['^https://sp\.edugain\.org/']
#prefix = "urn:geant:edugain:"
#name_id = true
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file and set a real salt");
    println!(
        "  2. Validate with: targetedid validate --config {}",
        output.display()
    );
    println!(
        "  3. Try it out: targetedid derive --config {} --state request.json",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config =
        ModuleConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    let generator = match TargetedIdGenerator::new(&config) {
        Ok(generator) => {
            println!("  [OK] All values compiled");
            generator
        }
        Err(e) => {
            println!("  [FAIL] {}", e);
            anyhow::bail!("configuration validation failed");
        }
    };

    println!();
    println!("Configuration summary:");
    for named in generator.values() {
        let cfg = &named.config;
        let fields: Vec<&str> = cfg.fields.iter().map(|field| field.name()).collect();
        println!("  value '{}':", named.name);
        println!(
            "    hash          : {}",
            cfg.hash_function
                .map_or("disabled".to_string(), |algorithm| algorithm.to_string())
        );
        println!("    fields        : {}", fields.join(", "));
        println!("    separator     : {:?}", cfg.field_separator);
        println!(
            "    salt          : {}",
            if cfg.salt.is_empty() { "NOT SET" } else { "set" }
        );
        println!(
            "    user filter   : {}",
            describe_filter(cfg.if_user.as_ref().map(Vec::len))
        );
        println!(
            "    target filter : {}",
            describe_filter(cfg.if_target.as_ref().map(Vec::len))
        );
        println!("    transforms    : {}", cfg.target_transform.len());
        println!(
            "    prefix        : {}",
            if cfg.prefix.is_empty() { "none" } else { cfg.prefix.as_str() }
        );
        println!("    name_id       : {}", cfg.name_id);
    }
    println!();
    println!("Configuration is valid.");

    Ok(())
}

fn describe_filter(patterns: Option<usize>) -> String {
    match patterns {
        Some(count) => format!("{} pattern(s)", count),
        None => "none".to_string(),
    }
}

fn cmd_derive(config_path: &Path, state_path: &Path, as_json: bool) -> Result<()> {
    let config =
        ModuleConfig::load_from_file(config_path).context("failed to load configuration")?;
    let generator =
        TargetedIdGenerator::new(&config).context("failed to compile configuration")?;

    let contents = std::fs::read_to_string(state_path)
        .with_context(|| format!("failed to read request state from {}", state_path.display()))?;
    let mut state: RequestState =
        serde_json::from_str(&contents).context("failed to parse request state JSON")?;

    generator.process(&mut state);

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&state).context("failed to serialize request state")?
        );
        return Ok(());
    }

    match state.attribute(OUTPUT_ATTRIBUTE) {
        Some(AttributeValues::Many(values)) if !values.is_empty() => {
            for value in values {
                println!("{}", value);
            }
        }
        Some(AttributeValues::One(value)) => println!("{}", value),
        _ => println!("No values derived (all filtered out)."),
    }

    Ok(())
}

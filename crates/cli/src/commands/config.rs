// Path: crates/cli/src/commands/config.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_types::config::ClientConfig;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
pub struct ConfigCmdArgs {
    #[clap(subcommand)]
    pub command: ConfigSubCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubCommands {
    /// Write a default client.toml.
    New {
        #[clap(long, default_value = "client.toml")]
        out: PathBuf,
        /// Overwrite an existing file.
        #[clap(long)]
        force: bool,
    },
    /// Load a client.toml and check it for semantic errors.
    Check { file: PathBuf },
}

pub fn run(args: ConfigCmdArgs) -> Result<()> {
    match args.command {
        ConfigSubCommands::New { out, force } => write_default(&out, force),
        ConfigSubCommands::Check { file } => {
            let cfg = load(&file)?;
            println!(
                "{} is valid: channel '{}', contract '{}', endpoint {}, policy {:?}",
                file.display(),
                cfg.channel_id,
                cfg.contract_id,
                cfg.profile.endpoint,
                cfg.policy
            );
            Ok(())
        }
    }
}

/// Reads and validates a client configuration file.
pub fn load(path: &Path) -> Result<ClientConfig> {
    let cfg = ClientConfig::from_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

fn write_default(out: &Path, force: bool) -> Result<()> {
    if out.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", out.display());
    }
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&ClientConfig::default())?;
    fs::write(out, text).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("Generated {}", out.display());
    Ok(())
}

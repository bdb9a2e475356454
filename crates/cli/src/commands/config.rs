use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Subcommand;

use lfc_core::config::HashCheckPolicy;

use super::{open_repo, Context};

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print a configuration key's current value.
    Get { key: String },
    /// Set a configuration key.
    Set { key: String, value: String },
}

const KEYS: &[&str] = &["default-remote", "auto-pull", "hash-check", "umask"];

pub fn run(ctx: &Context, action: ConfigAction) -> Result<ExitCode> {
    let (repo, _cache) = open_repo()?;
    let mut config = repo.config()?;

    match action {
        ConfigAction::Get { key } => {
            let value = match key.as_str() {
                "default-remote" => config.default_remote.clone().unwrap_or_default(),
                "auto-pull" => config.auto_pull.to_string(),
                "hash-check" => format!("{:?}", config.hash_check).to_lowercase(),
                "umask" => config.umask.map(|u| u.to_string()).unwrap_or_default(),
                other => bail!("unknown config key '{other}' (expected one of {KEYS:?})"),
            };
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            match key.as_str() {
                "default-remote" => config.default_remote = Some(value.clone()),
                "auto-pull" => config.auto_pull = value.parse().map_err(|_| anyhow::anyhow!("auto-pull expects true/false"))?,
                "hash-check" => {
                    config.hash_check = match value.as_str() {
                        "always" => HashCheckPolicy::Always,
                        "size" => HashCheckPolicy::Size,
                        "never" => HashCheckPolicy::Never,
                        other => bail!("invalid hash-check value '{other}' (expected always/size/never)"),
                    }
                }
                "umask" => {
                    config.umask = Some(u32::from_str_radix(value.trim_start_matches("0o"), 8)
                        .map_err(|_| anyhow::anyhow!("umask expects an octal value, e.g. 022"))?)
                }
                other => bail!("unknown config key '{other}' (expected one of {KEYS:?})"),
            }
            repo.save_config(&config)?;
            if !ctx.quiet {
                println!("set {key} = {value}");
            }
        }
    }

    Ok(super::exit::success())
}

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};

use super::{open_repo, Context};
use crate::style;

#[derive(Subcommand, Debug)]
pub enum RemoteAction {
    /// Add a new remote.
    Add {
        name: String,
        url: String,
        #[arg(long)]
        default: bool,
    },
    /// Remove a remote.
    Remove { name: String },
    /// List configured remotes.
    List,
    /// Change a remote's URL.
    SetUrl { name: String, url: String },
}

pub fn run(ctx: &Context, action: RemoteAction) -> Result<ExitCode> {
    let (repo, _cache) = open_repo()?;

    match action {
        RemoteAction::Add { name, url, default } => {
            repo.remote_add(&name, &url, default)?;
            if !ctx.quiet {
                println!("{}", style::success(&format!("added remote '{name}' -> {url}")));
            }
        }
        RemoteAction::Remove { name } => {
            repo.remote_remove(&name)?;
            if !ctx.quiet {
                println!("{}", style::success(&format!("removed remote '{name}'")));
            }
        }
        RemoteAction::List => {
            let remotes = repo.remote_list()?;
            if remotes.is_empty() {
                println!("{}", style::dim("no remotes configured"));
            } else {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL).set_header(vec!["NAME", "URL"]);
                for (name, spec) in remotes {
                    table.add_row(vec![name, spec.url]);
                }
                println!("{table}");
            }
        }
        RemoteAction::SetUrl { name, url } => {
            repo.remote_set_url(&name, &url)?;
            if !ctx.quiet {
                println!("{}", style::success(&format!("'{name}' now points to {url}")));
            }
        }
    }

    Ok(super::exit::success())
}

use std::process::ExitCode;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};

use lfc_core::pointer;
use lfc_core::reconciler::Reconciler;

use super::{open_repo, Context};
use crate::style;

pub fn run(ctx: &Context) -> Result<ExitCode> {
    let (repo, cache) = open_repo()?;
    let config = repo.config()?;
    let reconciler = Reconciler::new(repo.root(), &cache, config.hash_check);

    let sidecars: Vec<_> = repo
        .walk_tracked_files()
        .into_iter()
        .filter(|p| pointer::is_sidecar(p))
        .collect();

    let entries = reconciler.status(&sidecars);

    if entries.is_empty() {
        if !ctx.quiet {
            println!("{}", style::dim("no tracked files"));
        }
        return Ok(super::exit::success());
    }

    if ctx.quiet {
        for entry in &entries {
            println!("{}\t{}\t{}", entry.path.display(), entry.status.label(), entry.hash);
        }
        return Ok(super::exit::success());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["PATH", "STATUS", "HASH"]);
    for entry in &entries {
        table.add_row(vec![
            entry.path.display().to_string(),
            style::reconcile_status(entry.status.label()),
            entry.hash[..12].to_string(),
        ]);
    }
    println!("{table}");

    Ok(super::exit::success())
}

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;

use lfc_core::pointer;
use lfc_core::reconciler::Reconciler;

use super::{open_repo, relative_to_repo, Context};
use crate::style;

pub fn run(ctx: &Context, paths: &[PathBuf]) -> Result<ExitCode> {
    let (repo, cache) = open_repo()?;
    let config = repo.config()?;
    let reconciler = Reconciler::new(repo.root(), &cache, config.hash_check).with_umask(config.umask);

    let targets = if paths.is_empty() {
        repo.walk_tracked_files()
            .into_iter()
            .filter(|p| pointer::is_sidecar(p))
            .filter_map(|p| pointer::original_of(&p))
            .collect()
    } else {
        paths
            .iter()
            .map(|p| relative_to_repo(&repo, p))
            .collect::<Result<Vec<_>>>()?
    };

    let mut any_missing = false;
    for original in &targets {
        match reconciler.checkout(original) {
            Ok(Some(method)) => {
                if !ctx.quiet {
                    println!("{}", style::success(&format!("{} ({:?})", original.display(), method)));
                }
            }
            Ok(None) => {
                if !ctx.quiet {
                    println!("{}", style::dim(&format!("{} (already materialized)", original.display())));
                }
            }
            Err(lfc_core::errors::ReconcileError::MissingBlob { .. }) => {
                any_missing = true;
                eprintln!("{}", style::warn(&format!("{} is not in the local cache (run 'lfc pull')", original.display())));
            }
            Err(e) => return Err(e.into()),
        }
    }

    if any_missing {
        Ok(super::exit::transfer_failure())
    } else {
        Ok(super::exit::success())
    }
}

use std::env;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use lfc_core::Repository;

use super::Context;
use crate::style;

pub fn run(ctx: &Context) -> Result<ExitCode> {
    let cwd = env::current_dir().context("failed to determine current directory")?;
    let repo = Repository::init(&cwd).context("failed to initialize LFC repository")?;

    if !ctx.quiet {
        println!("{}", style::success(&format!("initialized LFC repository at {}", repo.root().display())));
    }
    Ok(super::exit::success())
}

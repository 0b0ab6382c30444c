//! Workflow init step.
//!
//! Init writes a request stub whose roots sit under the current directory so
//! a new user can edit paths in place.
use crate::cli::InitArgs;
use crate::settings::request_stub;
use anyhow::{anyhow, Context, Result};
use std::fs;

/// Write a run request stub to `--out`.
pub fn run_init(args: &InitArgs) -> Result<()> {
    if args.out.exists() && !args.force {
        return Err(anyhow!(
            "request already exists at {} (use --force to overwrite)",
            args.out.display()
        ));
    }
    let cwd = std::env::current_dir().context("resolve current directory")?;
    let text = request_stub(&cwd)?;
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&args.out, text.as_bytes())
        .with_context(|| format!("write {}", args.out.display()))?;
    println!("wrote {}", args.out.display());
    Ok(())
}

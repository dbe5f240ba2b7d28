//! Workspace automation for sqltag.
//!
//! Run with `cargo xtask <command>`.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

const CRATES: &[&str] = &["sqltag-pool", "sqltag-template", "sqltag-client"];

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for sqltag")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format check, clippy, tests and docs
    Ci,
    /// Check formatting
    Fmt {
        /// Rewrite files instead of checking
        #[arg(long)]
        fix: bool,
    },
    /// Lint every target with warnings denied
    Clippy,
    /// Run tests, optionally for a single crate
    Test {
        /// Crate to test
        #[arg(short, long)]
        package: Option<String>,
    },
    /// Build documentation with broken links denied
    Doc,
    /// Remove build artifacts
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(workspace_root()?);

    match cli.command {
        Command::Ci => {
            fmt(&sh, false)?;
            clippy(&sh)?;
            test(&sh, None)?;
            doc(&sh)?;
            println!("ci: all checks passed");
        }
        Command::Fmt { fix } => fmt(&sh, fix)?,
        Command::Clippy => clippy(&sh)?,
        Command::Test { package } => test(&sh, package.as_deref())?,
        Command::Doc => doc(&sh)?,
        Command::Clean => cmd!(sh, "cargo clean").run()?,
    }

    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;

    let manifest = String::from_utf8(output.stdout).context("invalid UTF-8 in cargo output")?;
    PathBuf::from(manifest.trim())
        .parent()
        .map(PathBuf::from)
        .context("manifest path has no parent")
}

fn fmt(sh: &Shell, fix: bool) -> Result<()> {
    if fix {
        cmd!(sh, "cargo fmt --all").run()?;
    } else {
        cmd!(sh, "cargo fmt --all -- --check").run()?;
    }
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo clippy --workspace --all-targets -- -D warnings").run()?;
    Ok(())
}

fn test(sh: &Shell, package: Option<&str>) -> Result<()> {
    match package {
        Some(name) if !CRATES.contains(&name) => {
            bail!(
                "unknown crate `{name}`, expected one of: {}",
                CRATES.join(", ")
            )
        }
        Some(name) => cmd!(sh, "cargo test -p {name}").run()?,
        None => cmd!(sh, "cargo test --workspace").run()?,
    }
    Ok(())
}

fn doc(sh: &Shell) -> Result<()> {
    let _flags = sh.push_env("RUSTDOCFLAGS", "-D rustdoc::broken_intra_doc_links");
    cmd!(sh, "cargo doc --workspace --no-deps").run()?;
    Ok(())
}

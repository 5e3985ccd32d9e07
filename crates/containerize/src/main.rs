//! Run a host command inside a container with its paths mounted

use anyhow::{Context, Result};
use clap::Parser;
use command_virtualizer::{Command, PathContext};
use tracing::{Level, debug};

mod spec;

use spec::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let spec = spec::build(&cli)?;
    let outer = spec
        .wrap(PathContext::global())
        .context("Failed to wrap command for the container")?;
    debug!(command = %outer, "built container command");

    if cli.dry_run {
        return print(&outer, cli.json);
    }

    let code = smol::block_on(run(&outer))?;
    std::process::exit(code);
}

fn print(outer: &Command, json: bool) -> Result<()> {
    let info = outer.start_info(&PathContext::new())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        let mut line = info.program.clone();
        for arg in &info.args {
            line.push(' ');
            line.push_str(arg);
        }
        println!("{line}");
    }
    Ok(())
}

async fn run(outer: &Command) -> Result<i32> {
    let status = outer
        .prepare()?
        .status()
        .await
        .with_context(|| format!("Failed to run {}", outer))?;
    Ok(status.code().unwrap_or(1))
}

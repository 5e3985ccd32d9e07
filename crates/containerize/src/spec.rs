//! Command-line options and their translation into a container spec

use anyhow::{Context, Result, bail};
use clap::Parser;
use command_virtualizer::{Arg, Command, ContainerRun, ContainerSpec, MountNaming};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "containerize")]
#[command(about = "Run a host command inside a container with its paths mounted")]
#[command(version)]
pub struct Cli {
    /// YAML container spec to load instead of --image and a trailing command
    #[arg(short, long, conflicts_with_all = ["image", "command"])]
    pub file: Option<PathBuf>,

    /// Image to run
    #[arg(long, required_unless_present = "file")]
    pub image: Option<String>,

    /// Target platform; labels containing "windows" select Windows path rules
    #[arg(long, default_value = "linux")]
    pub platform: String,

    /// Container engine binary
    #[arg(long, env = "CONTAINER_ENGINE")]
    pub engine: Option<String>,

    /// Keep stdin open
    #[arg(short, long)]
    pub interactive: bool,

    /// Allocate a pseudo-TTY
    #[arg(short, long)]
    pub tty: bool,

    /// Remove the container on exit
    #[arg(long)]
    pub rm: bool,

    /// Give extended privileges to the container
    #[arg(long)]
    pub privileged: bool,

    /// Mount the container's root filesystem read-only
    #[arg(long)]
    pub read_only: bool,

    /// Extra volume, passed verbatim after the discovered mounts
    #[arg(short = 'v', long = "volume")]
    pub volumes: Vec<String>,

    /// Publish a port
    #[arg(short = 'p', long = "publish")]
    pub publish: Vec<String>,

    /// Expose a port
    #[arg(long)]
    pub expose: Vec<String>,

    /// Environment variable of the inner command (KEY=VALUE)
    #[arg(short, long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Host working directory of the inner command
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,

    /// Treat arguments that name existing host files as paths
    #[arg(long)]
    pub detect_paths: bool,

    /// Number mounts sequentially instead of randomly
    #[arg(long)]
    pub sequential_names: bool,

    /// Print the container command instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// Print the dry run as JSON
    #[arg(long, requires = "dry_run")]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,

    /// Program and arguments to run inside the container
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required_unless_present = "file"
    )]
    pub command: Vec<String>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

/// Build the container spec described by the command line
pub fn build(cli: &Cli) -> Result<ContainerSpec> {
    if let Some(file) = &cli.file {
        let mut spec = ContainerSpec::from_file(file)
            .with_context(|| format!("Failed to load {}", file.display()))?;
        if let Some(engine) = &cli.engine {
            spec.container.engine = Some(engine.clone());
        }
        return Ok(spec);
    }

    let Some(image) = &cli.image else {
        bail!("--image is required without --file");
    };
    let Some((program, args)) = cli.command.split_first() else {
        bail!("no command given");
    };

    let mut run = ContainerRun::new(image)
        .with_platform(&cli.platform)
        .with_interactive(cli.interactive)
        .with_tty(cli.tty)
        .with_auto_remove(cli.rm)
        .with_privileged(cli.privileged)
        .with_read_only(cli.read_only);
    run.engine = cli.engine.clone();
    run.volumes = cli.volumes.clone();
    run.publish = cli.publish.clone();
    run.expose = cli.expose.clone();
    if cli.sequential_names {
        run.naming = MountNaming::Sequential;
    }

    let is_host_path = |value: &str| cli.detect_paths && Path::new(value).exists();
    let mut inner = if is_host_path(program) && program.contains(std::path::MAIN_SEPARATOR) {
        Command::host_program(program)
    } else {
        Command::new(program)
    };
    inner = inner
        .add_args(args.iter().map(|arg| {
            if is_host_path(arg) {
                Arg::path(arg)
            } else {
                Arg::from(arg)
            }
        }))
        .add_env(cli.env.iter().cloned());
    if let Some(dir) = &cli.workdir {
        inner = inner.with_working_dir(dir);
    }

    let spec = ContainerSpec::new(run, inner);
    spec.validate()?;
    Ok(spec)
}

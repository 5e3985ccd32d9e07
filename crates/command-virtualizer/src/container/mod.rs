//! Re-targeting host commands to run inside a container.
//!
//! [`ContainerRun`] describes a `docker run` style invocation. Wrapping an
//! inner [`Command`](crate::Command) resolves all of its path-bearing fields
//! through a fresh [`ContainerPathResolver`], so every host path the command
//! touches is given a synthetic container path and mounted there.
//!
//! # Example
//!
//! ```rust
//! use command_virtualizer::{Command, ContainerRun, PathContext};
//!
//! let inner = Command::new("/usr/bin/whoami");
//! let outer = ContainerRun::new("ubuntu")
//!     .with_interactive(true)
//!     .with_auto_remove(true)
//!     .wrap(&inner, &PathContext::new())?;
//!
//! let args: Vec<String> = outer.args().iter().map(|a| a.to_string()).collect();
//! assert_eq!(args, ["run", "--interactive", "--rm", "ubuntu", "/usr/bin/whoami"]);
//! # Ok::<(), command_virtualizer::Error>(())
//! ```

mod map;
mod wrapper;

pub use map::{ContainerPathResolver, IDENTIFIER_LEN, MountNaming, PathMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Target platform assumed when none is given
pub const DEFAULT_PLATFORM: &str = "linux";

/// Container engine binary used when none is configured
pub fn default_engine() -> &'static str {
    if cfg!(windows) { "docker.exe" } else { "docker" }
}

/// Options of a container engine `run` invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContainerRun {
    /// Image to run
    pub image: String,
    /// Target platform label, only used to pick path formatting rules
    pub platform: String,
    /// Engine binary; [`default_engine`] when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Keep stdin open (`--interactive`)
    pub interactive: bool,
    /// Allocate a pseudo-TTY (`--tty`)
    pub tty: bool,
    /// Extended privileges (`--privileged`)
    pub privileged: bool,
    /// Read-only root filesystem (`--read-only`)
    pub read_only: bool,
    /// Remove the container on exit (`--rm`)
    pub auto_remove: bool,
    /// Caller-supplied `host:container` volumes, passed verbatim
    pub volumes: Vec<String>,
    /// Container name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Container hostname
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// User to run as
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Entrypoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    /// CPU limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<String>,
    /// Memory limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    /// Network to connect to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Container labels
    pub labels: IndexMap<String, String>,
    /// Exposed ports
    pub expose: Vec<String>,
    /// Published ports
    pub publish: Vec<String>,
    /// Generic `--mount` strings
    pub mounts: Vec<String>,
    /// Arguments placed right before the image
    pub extra_args: Vec<String>,
    /// Environment of the engine process itself
    pub vars: IndexMap<String, String>,
    /// How synthetic container paths are named
    pub naming: MountNaming,
}

impl Default for ContainerRun {
    fn default() -> Self {
        Self {
            image: String::new(),
            platform: DEFAULT_PLATFORM.to_string(),
            engine: None,
            interactive: false,
            tty: false,
            privileged: false,
            read_only: false,
            auto_remove: false,
            volumes: Vec::new(),
            name: None,
            hostname: None,
            user: None,
            entrypoint: None,
            cpus: None,
            memory: None,
            network: None,
            labels: IndexMap::new(),
            expose: Vec::new(),
            publish: Vec::new(),
            mounts: Vec::new(),
            extra_args: Vec::new(),
            vars: IndexMap::new(),
            naming: MountNaming::Random,
        }
    }
}

impl ContainerRun {
    /// Create a run of `image` with every option off
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// The engine binary that will be invoked
    pub fn engine(&self) -> &str {
        self.engine.as_deref().unwrap_or(default_engine())
    }

    /// Set the target platform label
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Set the engine binary
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Enable interactive mode
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Enable TTY allocation
    pub fn with_tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// Run privileged
    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Mount the root filesystem read-only
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Remove the container when it exits
    pub fn with_auto_remove(mut self, auto_remove: bool) -> Self {
        self.auto_remove = auto_remove;
        self
    }

    /// Add a caller-supplied volume, given as `host:container[:opts]`
    pub fn with_volume(mut self, volume: impl Into<String>) -> Self {
        self.volumes.push(volume.into());
        self
    }

    /// Set the container name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the container hostname
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the user to run as
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Override the image entrypoint
    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    /// Limit CPUs
    pub fn with_cpus(mut self, cpus: impl Into<String>) -> Self {
        self.cpus = Some(cpus.into());
        self
    }

    /// Limit memory
    pub fn with_memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = Some(memory.into());
        self
    }

    /// Connect to a network
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Add a container label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Expose a port
    pub fn with_expose(mut self, port: impl Into<String>) -> Self {
        self.expose.push(port.into());
        self
    }

    /// Publish a port
    pub fn with_publish(mut self, mapping: impl Into<String>) -> Self {
        self.publish.push(mapping.into());
        self
    }

    /// Add a generic `--mount` string
    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mounts.push(mount.into());
        self
    }

    /// Add an argument placed right before the image
    pub fn with_extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Set an environment variable of the engine process
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Choose how synthetic container paths are named
    pub fn with_naming(mut self, naming: MountNaming) -> Self {
        self.naming = naming;
        self
    }
}

//! Re-target host commands to run inside containers
//!
//! This crate models an invocable process as an immutable [`Command`] and
//! wraps it into a container engine invocation. Every host path the inner
//! command depends on is discovered through a scoped [`PathContext`],
//! given a synthetic container path and mounted there, so the wrapped
//! command sees the same files inside the container.

#![warn(missing_docs)]

pub mod args;
pub mod command;
pub mod config;
pub mod container;
pub mod error;
pub mod layered;
pub mod path;
pub mod resolver;

pub use args::ArgList;
pub use command::{Arg, Command, StartInfo};
pub use config::ContainerSpec;
pub use container::{ContainerPathResolver, ContainerRun, MountNaming, PathMap};
pub use error::{Error, Result};
pub use layered::{CommandLayer, LayerStack};
pub use path::{PathStyle, format_host_path};
pub use resolver::{PathContext, PathResolver, Resolution, ResolverScope};

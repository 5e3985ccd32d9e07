//! Layered command wrapping.
//!
//! A [`CommandLayer`] turns one command into another that runs it in some
//! other context. A [`LayerStack`] applies several layers in order, so the
//! first layer added ends up innermost.
//!
//! # Example
//!
//! ```rust
//! use command_virtualizer::layered::LayerStack;
//! use command_virtualizer::{Command, ContainerRun, PathContext};
//!
//! let stack = LayerStack::new()
//!     .with_layer(ContainerRun::new("rust:1").with_auto_remove(true));
//!
//! let outer = stack.apply(&Command::new("cargo").add_args(["--version"]), &PathContext::new())?;
//! assert_eq!(outer.args().last().map(|a| a.to_string()).as_deref(), Some("--version"));
//! # Ok::<(), command_virtualizer::Error>(())
//! ```

use crate::command::Command;
use crate::container::ContainerRun;
use crate::error::Result;
use crate::resolver::PathContext;

/// Trait for layers that wrap a command into another command
pub trait CommandLayer: Send + Sync + std::fmt::Debug {
    /// Wrap `command`, resolving its paths through `context`
    fn wrap_command(&self, command: &Command, context: &PathContext) -> Result<Command>;

    /// Get a description of this layer for debugging
    fn description(&self) -> String;
}

impl CommandLayer for ContainerRun {
    fn wrap_command(&self, command: &Command, context: &PathContext) -> Result<Command> {
        self.wrap(command, context)
    }

    fn description(&self) -> String {
        format!("{} run {}", self.engine(), self.image)
    }
}

/// Ordered stack of layers applied innermost first
#[derive(Debug, Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn CommandLayer>>,
}

impl LayerStack {
    /// Create an empty stack; applying it returns the command unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer wrapping everything added before it
    pub fn with_layer<L: CommandLayer + 'static>(mut self, layer: L) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Get the number of layers in the stack
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Get descriptions of all layers for debugging
    pub fn layer_descriptions(&self) -> Vec<String> {
        self.layers.iter().map(|layer| layer.description()).collect()
    }

    /// Apply all layers to `command`
    pub fn apply(&self, command: &Command, context: &PathContext) -> Result<Command> {
        self.layers
            .iter()
            .try_fold(command.clone(), |cmd, layer| layer.wrap_command(&cmd, context))
    }
}

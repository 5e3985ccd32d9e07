//! Command type describing an invocable process
//!
//! A [`Command`] is an immutable value: every modifier takes `&self` and
//! returns a new command, leaving the receiver untouched. Arguments remember
//! whether they carry a host path so that a wrapper can re-target them
//! through a [`PathContext`].

use crate::error::{Error, Result};
use crate::resolver::PathContext;
use async_process::Command as AsyncCommand;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

/// How many non-flag arguments a synthesized label shows
const LABEL_ARGS: usize = 2;

/// A single argument of a command
///
/// Serialized as a plain string for literals and as a map with `path` (and
/// optionally `prefix`) for path-bearing arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ArgRepr", into = "ArgRepr")]
pub enum Arg {
    /// Passed through verbatim
    Literal(String),
    /// A host path, resolved through the active path context
    Path(PathBuf),
    /// A host path glued to a fixed prefix, e.g. `--output=<path>`
    Prefixed {
        /// Text placed in front of the resolved path
        prefix: String,
        /// The host path
        path: PathBuf,
    },
}

impl Arg {
    /// A host path argument
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Arg::Path(path.into())
    }

    /// A host path argument with a literal prefix
    pub fn prefixed(prefix: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Arg::Prefixed {
            prefix: prefix.into(),
            path: path.into(),
        }
    }

    /// Whether this argument carries a host path
    pub fn is_path(&self) -> bool {
        !matches!(self, Arg::Literal(_))
    }

    /// The effective argument string under `context`
    pub fn resolve(&self, context: &PathContext) -> Result<String> {
        match self {
            Arg::Literal(value) => Ok(value.clone()),
            Arg::Path(path) => context.resolve(path),
            Arg::Prefixed { prefix, path } => Ok(format!("{}{}", prefix, context.resolve(path)?)),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Literal(value) => f.write_str(value),
            Arg::Path(path) => write!(f, "{}", path.display()),
            Arg::Prefixed { prefix, path } => write!(f, "{}{}", prefix, path.display()),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ArgRepr {
    Literal(String),
    Path {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
        path: PathBuf,
    },
}

impl From<ArgRepr> for Arg {
    fn from(repr: ArgRepr) -> Self {
        match repr {
            ArgRepr::Literal(value) => Arg::Literal(value),
            ArgRepr::Path { prefix: None, path } => Arg::Path(path),
            ArgRepr::Path {
                prefix: Some(prefix),
                path,
            } => Arg::Prefixed { prefix, path },
        }
    }
}

impl From<Arg> for ArgRepr {
    fn from(arg: Arg) -> Self {
        match arg {
            Arg::Literal(value) => ArgRepr::Literal(value),
            Arg::Path(path) => ArgRepr::Path { prefix: None, path },
            Arg::Prefixed { prefix, path } => ArgRepr::Path {
                prefix: Some(prefix),
                path,
            },
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Literal(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Literal(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::Literal(value.clone())
    }
}

/// A command to be executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Command {
    /// The program to execute; a [`Arg::Path`] program is re-targeted like any path
    executable: Arg,
    /// The arguments to pass to the program
    #[serde(default)]
    args: Vec<Arg>,
    /// Environment assignments in order; later entries shadow earlier ones
    #[serde(default)]
    env: Vec<(String, String)>,
    /// Working directory for the command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    working_dir: Option<PathBuf>,
    /// Human-readable label for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl Command {
    /// Create a command running `program` as given (looked up where it runs)
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_executable(Arg::Literal(program.into()))
    }

    /// Create a command whose program is a host path
    pub fn host_program(path: impl Into<PathBuf>) -> Self {
        Self::with_executable(Arg::Path(path.into()))
    }

    fn with_executable(executable: Arg) -> Self {
        Self {
            executable,
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            label: None,
        }
    }

    /// Append arguments
    pub fn add_args<I, A>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let mut next = self.clone();
        next.args.extend(args.into_iter().map(Into::into));
        next
    }

    /// Remove every argument whose text equals one of `values`
    pub fn remove_args<I, S>(&self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values: Vec<S> = values.into_iter().collect();
        let mut next = self.clone();
        next.args
            .retain(|arg| !values.iter().any(|v| arg.to_string() == v.as_ref()));
        next
    }

    /// Append environment assignments
    pub fn add_env<I, K, V>(&self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut next = self.clone();
        next.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        next
    }

    /// Remove every environment assignment matching one of `vars` by name and value
    pub fn remove_env<I, K, V>(&self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let vars: Vec<(K, V)> = vars.into_iter().collect();
        let mut next = self.clone();
        next.env.retain(|(name, value)| {
            !vars
                .iter()
                .any(|(k, v)| name == k.as_ref() && value == v.as_ref())
        });
        next
    }

    /// Set the working directory; an empty path clears it
    pub fn with_working_dir(&self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let mut next = self.clone();
        next.working_dir = (!dir.as_os_str().is_empty()).then(|| dir.to_path_buf());
        next
    }

    /// Set the label; an empty label falls back to the synthesized one
    pub fn with_label(&self, label: impl Into<String>) -> Self {
        let label = label.into();
        let mut next = self.clone();
        next.label = (!label.is_empty()).then_some(label);
        next
    }

    /// Get the executable
    pub fn executable(&self) -> &Arg {
        &self.executable
    }

    /// Get the arguments
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Get the environment assignments
    pub fn envs(&self) -> &[(String, String)] {
        &self.env
    }

    /// Get the working directory
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// The explicit label, or one made from the program name and leading arguments
    pub fn label(&self) -> Cow<'_, str> {
        if let Some(label) = &self.label {
            return Cow::Borrowed(label.as_str());
        }
        let program = self.executable.to_string();
        let name = program
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(program.as_str())
            .to_string();
        let significant = self
            .args
            .iter()
            .map(Arg::to_string)
            .filter(|arg| !arg.starts_with('-'))
            .take(LABEL_ARGS);
        Cow::Owned(
            std::iter::once(name)
                .chain(significant)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    /// Resolve program, arguments and working directory through `context`.
    ///
    /// Every path-bearing field is handed to the context, which is how a
    /// registered resolver learns about the host paths this command touches.
    pub fn start_info(&self, context: &PathContext) -> Result<StartInfo> {
        let program = self.executable.resolve(context)?;
        if program.is_empty() {
            return Err(Error::invalid_argument("command executable must not be empty"));
        }
        let args = self
            .args
            .iter()
            .map(|arg| arg.resolve(context))
            .collect::<Result<Vec<_>>>()?;
        let working_dir = self
            .working_dir
            .as_ref()
            .map(|dir| context.resolve(dir))
            .transpose()?;

        Ok(StartInfo {
            program,
            args,
            working_dir,
            env: self.env.clone(),
        })
    }

    /// Prepare this command for execution on the host with the process-wide context
    pub fn prepare(&self) -> Result<AsyncCommand> {
        Ok(self.start_info(PathContext::global())?.prepare())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Fully resolved launch parameters of a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartInfo {
    /// Program to execute
    pub program: String,
    /// Resolved arguments
    pub args: Vec<String>,
    /// Resolved working directory
    pub working_dir: Option<String>,
    /// Environment assignments in order
    pub env: Vec<(String, String)>,
}

impl StartInfo {
    /// Convert to an `async_process::Command`
    pub fn prepare(&self) -> AsyncCommand {
        let mut cmd = AsyncCommand::new(&self.program);
        cmd.args(&self.args);

        // Applied in order, so later entries shadow earlier ones
        for (key, val) in &self.env {
            cmd.env(key, val);
        }

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_creation() {
        let cmd = Command::new("echo");
        assert_eq!(cmd.executable(), &Arg::from("echo"));
        assert!(cmd.args().is_empty());
        assert!(cmd.working_dir().is_none());
    }

    #[test]
    fn test_modifiers_do_not_touch_receiver() {
        let base = Command::new("ls").add_args(["-la"]);
        let more = base
            .add_args(["/tmp"])
            .add_env([("KEY", "VALUE")])
            .with_working_dir("/srv")
            .with_label("listing");

        assert_eq!(base.args(), &[Arg::from("-la")]);
        assert!(base.envs().is_empty());
        assert!(base.working_dir().is_none());
        assert_eq!(base.label(), "ls");

        assert_eq!(more.args().len(), 2);
        assert_eq!(more.envs(), &[("KEY".to_string(), "VALUE".to_string())]);
        assert_eq!(more.working_dir(), Some(Path::new("/srv")));
        assert_eq!(more.label(), "listing");
    }

    #[test]
    fn test_add_then_remove_restores_args() {
        let base = Command::new("dotnet").add_args(["build", "--no-restore"]);
        let round = base.add_args(["-v", "quiet"]).remove_args(["-v", "quiet"]);
        assert_eq!(round.args(), base.args());
    }

    #[test]
    fn test_remove_args_removes_all_occurrences() {
        let cmd = Command::new("tool")
            .add_args(["a", "b", "a"])
            .add_args([Arg::path("/a")])
            .remove_args(["a", "/a"]);
        assert_eq!(cmd.args(), &[Arg::from("b")]);
    }

    #[test]
    fn test_env_keeps_order_and_duplicates() {
        let cmd = Command::new("env")
            .add_env([("A", "1"), ("B", "2"), ("A", "3")])
            .remove_env([("A", "1")]);
        assert_eq!(
            cmd.envs(),
            &[
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "3".to_string())
            ]
        );
    }

    #[test]
    fn test_empty_working_dir_and_label_clear() {
        let cmd = Command::new("x").with_working_dir("/a").with_label("named");
        let cleared = cmd.with_working_dir("").with_label("");
        assert!(cleared.working_dir().is_none());
        assert_eq!(cleared.label(), "x");
    }

    #[test]
    fn test_synthesized_label() {
        let cmd = Command::host_program("/usr/share/dotnet/dotnet")
            .add_args(["build", "--configuration", "Release"])
            .add_args([Arg::path("/src/App.sln")]);
        assert_eq!(cmd.label(), "dotnet build Release");
        assert_eq!(cmd.to_string(), "dotnet build Release");
    }

    #[test]
    fn test_start_info_resolves_path_fields() {
        let context = PathContext::new().with_base_dir("/home/u");
        let cmd = Command::new("tool")
            .add_args([Arg::from("--flag"), Arg::path("src/../lib"), Arg::prefixed("--out=", "bin")])
            .with_working_dir("work")
            .add_env([("MODE", "fast")]);

        let info = cmd.start_info(&context).unwrap();
        assert_eq!(info.program, "tool");
        assert_eq!(info.args, vec!["--flag", "/home/u/lib", "--out=/home/u/bin"]);
        assert_eq!(info.working_dir.as_deref(), Some("/home/u/work"));
        assert_eq!(info.env, vec![("MODE".to_string(), "fast".to_string())]);
    }

    #[test]
    fn test_start_info_rejects_empty_program() {
        let context = PathContext::new();
        assert!(matches!(
            Command::new("").start_info(&context),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_command_prepare() {
        let cmd = Command::new("echo").add_args(["hello", "world"]);
        let _async_cmd = cmd.prepare().unwrap();
    }
}

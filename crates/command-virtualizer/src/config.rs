//! YAML container specs: container options plus the command to run inside

use crate::command::{Arg, Command};
use crate::container::ContainerRun;
use crate::error::{Error, Result};
use crate::resolver::PathContext;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A complete wrapping request
///
/// ```yaml
/// container:
///   image: ubuntu
///   platform: linux
///   auto-remove: true
/// command:
///   executable: make
///   args:
///     - -C
///     - path: ./src
///   working-dir: ./src
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container engine options
    pub container: ContainerRun,
    /// The command to run inside the container
    pub command: Command,
}

impl ContainerSpec {
    /// Bundle options and inner command
    pub fn new(container: ContainerRun, command: Command) -> Self {
        Self { container, command }
    }

    /// Parse a YAML spec from a string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let spec: ContainerSpec = serde_yaml::from_str(content)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a YAML spec file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check both halves of the spec
    pub fn validate(&self) -> Result<()> {
        self.container.validate()?;
        if let Arg::Literal(program) = self.command.executable() {
            if program.trim().is_empty() {
                return Err(Error::invalid_argument("command executable must not be empty"));
            }
        }
        Ok(())
    }

    /// Produce the engine command for this spec
    pub fn wrap(&self, context: &PathContext) -> Result<Command> {
        self.container.wrap(&self.command, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MountNaming;
    use std::io::Write;

    const SPEC: &str = r#"
container:
  image: mcr.microsoft.com/dotnet/sdk:8.0
  platform: linux
  engine: docker
  auto-remove: true
  naming: sequential
  volumes:
    - nuget:/root/.nuget
  vars:
    DOCKER_BUILDKIT: "1"
command:
  executable: dotnet
  args:
    - build
    - path: /home/u/src/App.sln
    - prefix: "-p:OutputPath="
      path: /home/u/out
  env:
    - [DOTNET_CLI_TELEMETRY_OPTOUT, "1"]
  working-dir: /home/u/src
"#;

    #[test]
    fn test_parse_spec() {
        let spec = ContainerSpec::from_yaml_str(SPEC).unwrap();
        assert_eq!(spec.container.image, "mcr.microsoft.com/dotnet/sdk:8.0");
        assert!(spec.container.auto_remove);
        assert!(!spec.container.interactive);
        assert_eq!(spec.container.naming, MountNaming::Sequential);
        assert_eq!(spec.container.vars.get("DOCKER_BUILDKIT").map(String::as_str), Some("1"));

        assert_eq!(
            spec.command.args(),
            &[
                Arg::from("build"),
                Arg::path("/home/u/src/App.sln"),
                Arg::prefixed("-p:OutputPath=", "/home/u/out"),
            ]
        );
        assert_eq!(spec.command.working_dir(), Some(Path::new("/home/u/src")));
    }

    #[test]
    fn test_wrap_spec() {
        let spec = ContainerSpec::from_yaml_str(SPEC).unwrap();
        let outer = spec.wrap(&PathContext::new()).unwrap();
        let args: Vec<String> = outer.args().iter().map(Arg::to_string).collect();

        assert_eq!(
            args,
            [
                "run", "--rm",
                "--volume", "/home/u/src/App.sln:/.00000001",
                "--volume", "/home/u/out:/.00000002",
                "--volume", "/home/u/src:/.00000003",
                "--volume", "nuget:/root/.nuget",
                "--env", "DOTNET_CLI_TELEMETRY_OPTOUT=1",
                "--workdir", "/.00000003",
                "mcr.microsoft.com/dotnet/sdk:8.0",
                "dotnet", "build", "/.00000001", "-p:OutputPath=/.00000002",
            ]
        );
    }

    #[test]
    fn test_defaults_and_missing_image() {
        let spec = ContainerSpec::from_yaml_str("container:\n  image: alpine\ncommand:\n  executable: sh\n").unwrap();
        assert_eq!(spec.container.platform, "linux");
        assert_eq!(spec.container.naming, MountNaming::Random);

        let missing = ContainerSpec::from_yaml_str("container: {}\ncommand:\n  executable: sh\n");
        assert!(matches!(missing, Err(Error::InvalidArgument { .. })));

        let malformed = ContainerSpec::from_yaml_str("container: [");
        assert!(matches!(malformed, Err(Error::Yaml(_))));
    }

    #[test]
    fn test_yaml_round_trip_keeps_path_flags() {
        let spec = ContainerSpec::new(
            ContainerRun::new("alpine"),
            Command::new("cat").add_args([Arg::path("/etc/hosts")]),
        );
        let parsed = ContainerSpec::from_yaml_str(&spec.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn test_command_keys_are_kebab_case() {
        let spec = ContainerSpec::new(
            ContainerRun::new("alpine").with_read_only(true),
            Command::new("ls").with_working_dir("/srv"),
        );
        let yaml = spec.to_yaml().unwrap();
        assert!(yaml.contains("working-dir: /srv"));
        assert!(yaml.contains("read-only: true"));
        assert!(!yaml.contains("working_dir"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SPEC.as_bytes()).unwrap();
        let spec = ContainerSpec::from_file(file.path()).unwrap();
        assert_eq!(spec.command.executable(), &Arg::from("dotnet"));
    }
}

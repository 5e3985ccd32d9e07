//! Building the engine invocation around an inner command

use super::{ContainerPathResolver, ContainerRun};
use crate::args::{ArgList, key_value};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::path::{PathStyle, format_host_path};
use crate::resolver::PathContext;
use std::sync::Arc;
use tracing::debug;

impl ContainerRun {
    /// Check the options before wrapping
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(Error::invalid_argument("container image must not be empty"));
        }
        if self.engine.as_deref().is_some_and(str::is_empty) {
            return Err(Error::invalid_argument("container engine must not be empty"));
        }
        Ok(())
    }

    /// Wrap `inner` so that it runs inside this container.
    ///
    /// The inner command's path-bearing fields are resolved through
    /// `context` while a fresh [`ContainerPathResolver`] is registered on it.
    /// Each host path seen gets a synthetic container path and one
    /// `--volume` mount; the resolver is unregistered before this returns,
    /// whether or not resolution succeeded.
    pub fn wrap(&self, inner: &Command, context: &PathContext) -> Result<Command> {
        self.validate()?;

        let style = PathStyle::from_platform(&self.platform);
        let resolver = Arc::new(ContainerPathResolver::new(style, self.naming));
        let start = {
            let _scope = context.register(resolver.clone());
            inner.start_info(context)?
        };
        let mounts = resolver.snapshot();
        debug!(
            image = %self.image,
            command = %inner,
            mounts = mounts.len(),
            "wrapped command for container"
        );

        let mut args = ArgList::new();
        args.push("run")
            .switch("--interactive", self.interactive)
            .switch("--tty", self.tty)
            .switch("--privileged", self.privileged)
            .switch("--read-only", self.read_only)
            .switch("--rm", self.auto_remove);

        for (host, container) in mounts.iter() {
            let host = format_host_path(host, &self.platform);
            args.option("--volume", format!("{host}:{container}"));
        }
        args.repeated("--volume", &self.volumes);

        args.option_opt("--name", self.name.as_ref())
            .option_opt("--hostname", self.hostname.as_ref())
            .option_opt("--user", self.user.as_ref())
            .option_opt("--entrypoint", self.entrypoint.as_ref())
            .option_opt("--cpus", self.cpus.as_ref())
            .option_opt("--memory", self.memory.as_ref())
            .option_opt("--network", self.network.as_ref())
            .repeated("--label", self.labels.iter().map(|(k, v)| key_value(k, v)))
            .repeated("--expose", &self.expose)
            .repeated("--publish", &self.publish)
            .repeated("--mount", &self.mounts)
            .repeated("--env", start.env.iter().map(|(k, v)| key_value(k, v)))
            .option_opt("--workdir", start.working_dir.as_ref())
            .extend(self.extra_args.iter().cloned());

        args.push(self.image.as_str()).push(start.program).extend(start.args);

        Ok(Command::new(self.engine())
            .add_args(args)
            .add_env(self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .with_label(format!("{} in {}", inner.label(), self.image)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Arg;
    use crate::container::MountNaming;

    fn texts(command: &Command) -> Vec<String> {
        command.args().iter().map(Arg::to_string).collect()
    }

    #[test]
    fn test_wrap_without_paths() {
        let context = PathContext::new();
        let outer = ContainerRun::new("ubuntu")
            .with_engine("docker")
            .with_auto_remove(true)
            .with_interactive(true)
            .wrap(&Command::new("/usr/bin/whoami"), &context)
            .unwrap();

        assert_eq!(outer.executable(), &Arg::from("docker"));
        assert_eq!(texts(&outer), ["run", "--interactive", "--rm", "ubuntu", "/usr/bin/whoami"]);
        assert_eq!(context.depth(), 0);
    }

    #[test]
    fn test_wrap_rejects_empty_image() {
        let context = PathContext::new();
        let result = ContainerRun::new("  ").wrap(&Command::new("true"), &context);
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_wrap_releases_scope_on_failure() {
        let context = PathContext::new();
        let inner = Command::new("cat").add_args([Arg::path("/../etc/passwd")]);
        let result = ContainerRun::new("alpine").wrap(&inner, &context);

        assert!(matches!(result, Err(Error::InvalidPath { .. })));
        assert_eq!(context.depth(), 0);
    }

    #[test]
    fn test_wrap_rejects_colon_in_host_path() {
        let context = PathContext::new();
        let inner = Command::new("cat").add_args([Arg::path("/data/a:b")]);
        let result = ContainerRun::new("alpine").wrap(&inner, &context);

        assert!(matches!(result, Err(Error::InvalidPath { .. })));
        assert_eq!(context.depth(), 0);

        let inner = Command::new("type").add_args([Arg::path(r"C:\work\a:b")]);
        let result = ContainerRun::new("servercore")
            .with_platform("windows-containers")
            .wrap(&inner, &context);

        assert!(matches!(result, Err(Error::InvalidPath { .. })));
        assert_eq!(context.depth(), 0);
    }

    #[test]
    fn test_option_order() {
        let context = PathContext::new();
        let inner = Command::new("make")
            .add_args([Arg::from("-C"), Arg::path("/src")])
            .add_env([("CC", "clang")])
            .with_working_dir("/src");
        let outer = ContainerRun::new("builder")
            .with_engine("podman")
            .with_tty(true)
            .with_privileged(true)
            .with_read_only(true)
            .with_volume("cache:/cache")
            .with_name("build-1")
            .with_memory("2g")
            .with_label("team", "core")
            .with_publish("8080:80")
            .with_extra_arg("--init")
            .with_var("DOCKER_HOST", "unix:///run/podman.sock")
            .with_naming(MountNaming::Sequential)
            .wrap(&inner, &context)
            .unwrap();

        assert_eq!(outer.executable(), &Arg::from("podman"));
        assert_eq!(
            texts(&outer),
            [
                "run", "--tty", "--privileged", "--read-only",
                "--volume", "/src:/.00000001",
                "--volume", "cache:/cache",
                "--name", "build-1",
                "--memory", "2g",
                "--label", "team=core",
                "--publish", "8080:80",
                "--env", "CC=clang",
                "--workdir", "/.00000001",
                "--init",
                "builder", "make", "-C", "/.00000001",
            ]
        );
        assert_eq!(
            outer.envs(),
            &[("DOCKER_HOST".to_string(), "unix:///run/podman.sock".to_string())]
        );
        assert_eq!(outer.label(), "make /src in builder");
    }
}

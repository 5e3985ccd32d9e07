//! Host path normalization and platform-specific mount formatting
//!
//! Everything here is string manipulation only: nothing touches the
//! filesystem. Paths may be POSIX-style (`/home/u/src`) or carry a Windows
//! drive letter (`C:\work\proj`) regardless of the host the code runs on,
//! since the host and the container target can differ.

use crate::error::{Error, Result};

/// Path conventions of the environment a container runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// Windows containers: drive-rooted paths, host paths passed through
    Windows,
    /// Linux and every other target
    Posix,
}

impl PathStyle {
    /// Select the style for a target platform label.
    ///
    /// Any label containing `windows` (case-insensitive) is a Windows
    /// target, e.g. `windows-containers` or `Windows/amd64`.
    pub fn from_platform(platform: &str) -> Self {
        if platform.to_ascii_lowercase().contains("windows") {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }

    /// Root under which synthetic container paths are created
    pub fn container_root(self) -> &'static str {
        match self {
            PathStyle::Windows => "c:",
            PathStyle::Posix => "",
        }
    }
}

/// Format a host path for the left-hand side of a mount argument.
///
/// Windows targets get the path unchanged. POSIX targets get the drive
/// letter stripped, backslashes turned into slashes and exactly one
/// leading slash.
pub fn format_host_path(path: &str, platform: &str) -> String {
    match PathStyle::from_platform(platform) {
        PathStyle::Windows => path.to_string(),
        PathStyle::Posix => {
            let without_drive = match drive_prefix(path) {
                Some(drive) => &path[drive.len()..],
                None => path,
            };
            let converted = without_drive.replace('\\', "/");
            format!("/{}", converted.trim_start_matches('/'))
        }
    }
}

/// Reject host paths that cannot be expressed as a `host:container` mount.
///
/// The mount syntax splits on `:`, so a colon is only allowed as part of a
/// leading drive letter. POSIX targets drop the drive letter when formatting,
/// which leaves the same rule for both styles.
pub fn check_mount_source(path: &str, style: PathStyle) -> Result<()> {
    let rest = match drive_prefix(path) {
        Some(drive) => &path[drive.len()..],
        None => path,
    };
    if rest.contains(':') {
        let target = match style {
            PathStyle::Windows => "Windows",
            PathStyle::Posix => "POSIX",
        };
        return Err(Error::invalid_path(
            path,
            format!("contains ':' and cannot be mounted into a {target} container"),
        ));
    }
    Ok(())
}

/// Normalize a path string to an absolute path.
///
/// `.` and empty components are dropped and `..` pops the previous
/// component. Relative paths are joined onto `base_dir`, which must itself
/// be absolute. Drive-letter paths are rejoined with `\`, all others with `/`.
pub fn normalize(path: &str, base_dir: Option<&str>) -> Result<String> {
    if path.is_empty() {
        return Err(Error::invalid_path(path, "path is empty"));
    }
    if path.contains('\0') {
        return Err(Error::invalid_path(path, "path contains a NUL byte"));
    }

    if let Some(drive) = drive_prefix(path) {
        let rest = &path[drive.len()..];
        if !rest.starts_with(['\\', '/']) {
            return Err(Error::invalid_path(
                path,
                "drive-relative paths are not supported",
            ));
        }
        let parts = collapse(path, rest.split(['\\', '/']))?;
        return Ok(format!("{}\\{}", drive, parts.join("\\")));
    }

    if path.starts_with('/') {
        let parts = collapse(path, path.split('/'))?;
        return Ok(format!("/{}", parts.join("/")));
    }

    match base_dir {
        Some(base) => {
            let base = normalize(base, None)?;
            let separator = if drive_prefix(&base).is_some() { '\\' } else { '/' };
            normalize(&format!("{base}{separator}{path}"), None)
        }
        None => Err(Error::invalid_path(
            path,
            "relative path without a base directory",
        )),
    }
}

/// Whether `path` is rooted, either at `/` or at a drive letter
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || drive_prefix(path).is_some()
}

/// Returns the `X:` prefix of a drive-letter path
fn drive_prefix(path: &str) -> Option<&str> {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        Some(&path[..2])
    } else {
        None
    }
}

fn collapse<'a>(original: &str, components: impl Iterator<Item = &'a str>) -> Result<Vec<&'a str>> {
    let mut parts = Vec::new();
    for component in components {
        match component {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::invalid_path(
                        original,
                        "escapes the filesystem root",
                    ));
                }
            }
            other => parts.push(other),
        }
    }
    Ok(parts)
}

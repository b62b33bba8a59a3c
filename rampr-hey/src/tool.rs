use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const HEY_COMMAND: &str = "hey";

/// Location of the `hey` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeyTool {
    path: PathBuf,
}

impl HeyTool {
    /// Uses `explicit` when given, otherwise searches `PATH`.
    pub fn detect(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(Error::ToolNotFound(path.to_path_buf()));
            }
            return Ok(Self {
                path: path.to_path_buf(),
            });
        }

        which(HEY_COMMAND)
            .map(|path| Self { path })
            .ok_or_else(|| Error::MissingTool(HEY_COMMAND.to_string()))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn which(name: &str) -> Option<PathBuf> {
    find_in_path(&std::env::var_os("PATH")?, name)
}

/// First executable `name` in a `PATH`-style list. Empty entries are skipped rather than
/// read as the current directory.
fn find_in_path(path: &OsStr, name: &str) -> Option<PathBuf> {
    std::env::split_paths(path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(format!("{name}.exe")), dir.join(name)]
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;

    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

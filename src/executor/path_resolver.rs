use std::path::{Path, PathBuf};
use nix::sys::stat::{stat, Mode, SFlag};
use nix::unistd::{getegid, geteuid};
use thiserror::Error;
use tracing::debug;

/// Directories probed, in order, for a bare program name.
pub const DEFAULT_SEARCH_DIRS: [&str; 3] = ["/usr/local/bin", "/bin", "/usr/bin"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{0}: command not found")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    search_dirs: Vec<PathBuf>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver {
    pub fn new() -> Self {
        Self::with_search_dirs(DEFAULT_SEARCH_DIRS)
    }

    pub fn with_search_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        PathResolver {
            search_dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// A name with a `/` in it is only checked in place; anything else is
    /// looked up in the search directories.
    pub fn resolve(&self, command: &str) -> Option<PathBuf> {
        if command.contains('/') {
            let path = Path::new(command);
            return is_executable_regular_file(path).then(|| path.to_path_buf());
        }

        self.search_dirs
            .iter()
            .map(|dir| dir.join(command))
            .find(|candidate| is_executable_regular_file(candidate))
    }

    /// Returns `argv` with element 0 replaced by the resolved path.
    pub fn resolve_argv(&self, argv: &[String]) -> Result<Vec<String>, ResolveError> {
        let Some(name) = argv.first() else {
            return Err(ResolveError::NotFound(String::new()));
        };
        let path = self
            .resolve(name)
            .ok_or_else(|| ResolveError::NotFound(name.clone()))?;
        debug!(command = %name, path = %path.display(), "resolved");

        let mut resolved = Vec::with_capacity(argv.len());
        resolved.push(path.to_string_lossy().into_owned());
        resolved.extend_from_slice(&argv[1..]);
        Ok(resolved)
    }
}

/// Checks the execute bit of the first ownership class that applies to the
/// effective user: owner, then group, then other. A matching class without
/// the bit is final, even if a later class would grant execution.
pub fn is_executable_regular_file(path: &Path) -> bool {
    let Ok(st) = stat(path) else {
        return false;
    };
    if SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT != SFlag::S_IFREG {
        return false;
    }

    let perms = Mode::from_bits_truncate(st.st_mode);
    let bit = if st.st_uid == geteuid().as_raw() {
        Mode::S_IXUSR
    } else if st.st_gid == getegid().as_raw() {
        Mode::S_IXGRP
    } else {
        Mode::S_IXOTH
    };
    perms.contains(bit)
}

//! Finding the XFOIL executable.

use crate::engine::{Error, Result};
use std::path::PathBuf;

#[cfg(target_os = "macos")]
const MACOS_APP_BINARY: &str = "/Applications/Xfoil.app/Contents/Resources/xfoil";
#[cfg(target_os = "macos")]
const MACOS_XQUARTZ: &str = "/opt/X11/bin/xquartz";

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "xfoil.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "xfoil";

/// Resolves the path of the XFOIL binary a session will launch.
pub trait ExecutableLocator: Send + Sync {
    fn locate(&self) -> Result<PathBuf>;
}

/// Always returns the same path, checking only that it exists.
#[derive(Debug, Clone)]
pub struct FixedLocator(pub PathBuf);

impl ExecutableLocator for FixedLocator {
    fn locate(&self) -> Result<PathBuf> {
        if self.0.is_file() {
            Ok(self.0.clone())
        } else {
            Err(Error::ExecutableNotFound(format!(
                "{} does not exist",
                self.0.display()
            )))
        }
    }
}

/// Explicit path if given, otherwise the conventional install location for this platform.
#[derive(Debug, Clone, Default)]
pub struct PlatformLocator {
    explicit: Option<PathBuf>,
}

impl PlatformLocator {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }

    #[cfg(windows)]
    fn platform_default(&self) -> Result<PathBuf> {
        let beside_binary = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(EXECUTABLE_NAME)));
        beside_binary
            .into_iter()
            .chain(std::iter::once(PathBuf::from(EXECUTABLE_NAME)))
            .find(|p| p.is_file())
            .ok_or_else(|| {
                Error::ExecutableNotFound(format!(
                    "put {} in the same folder as xfoil-runner",
                    EXECUTABLE_NAME
                ))
            })
    }

    #[cfg(target_os = "macos")]
    fn platform_default(&self) -> Result<PathBuf> {
        let app = PathBuf::from(MACOS_APP_BINARY);
        if !app.is_file() {
            return Err(Error::ExecutableNotFound(
                "Xfoil.app is not installed".to_string(),
            ));
        }
        if !PathBuf::from(MACOS_XQUARTZ).is_file() {
            tracing::warn!("X11/XQuartz not installed, XFOIL only works headless");
        }
        Ok(app)
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn platform_default(&self) -> Result<PathBuf> {
        let path_var = std::env::var_os("PATH").unwrap_or_default();
        search_path(&path_var, EXECUTABLE_NAME).ok_or_else(|| {
            Error::ExecutableNotFound(format!(
                "no '{}' on PATH, pass --xfoil or set XFOIL_PATH",
                EXECUTABLE_NAME
            ))
        })
    }
}

impl ExecutableLocator for PlatformLocator {
    fn locate(&self) -> Result<PathBuf> {
        let path = match &self.explicit {
            Some(path) => FixedLocator(path.clone()).locate()?,
            None => self.platform_default()?,
        };
        tracing::debug!(path = %path.display(), "resolved XFOIL executable");
        Ok(path)
    }
}

/// First `name` found in the directories of a `PATH`-style list.
#[cfg_attr(any(windows, target_os = "macos"), allow(dead_code))]
fn search_path(path_var: &std::ffi::OsStr, name: &str) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

//! Run-at-login registration and single-instance handling.
//!
//! Every operation is idempotent: registering twice leaves one entry,
//! unregistering something that is not there is a logged no-op.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod instances;

#[cfg(windows)]
pub mod windows;

#[derive(Error, Debug)]
pub enum AutostartError {
    #[error("Command failed: {0}")]
    CommandError(String),
    #[error("Platform not supported")]
    UnsupportedPlatform,
    #[error("IO Error: {0}")]
    StdIo(#[from] std::io::Error),
}

/// What gets launched at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutostartEntry {
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl AutostartEntry {
    /// `<this executable> watch --hidden`
    pub fn for_current_exe(name: &str) -> Result<Self, AutostartError> {
        Ok(Self {
            name: name.to_string(),
            program: std::env::current_exe()?,
            args: vec!["watch".to_string(), "--hidden".to_string()],
        })
    }

    /// Program and arguments as one shell-style line, quoting where needed.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .map(|part| quote(&part))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(part: &str) -> String {
    if part.is_empty() || part.contains(char::is_whitespace) {
        format!("\"{}\"", part)
    } else {
        part.to_string()
    }
}

#[async_trait]
pub trait Autostart: Send + Sync {
    async fn is_registered(&self) -> Result<bool, AutostartError>;

    /// Create or overwrite the entry.
    async fn ensure_registered(&self, entry: &AutostartEntry) -> Result<(), AutostartError>;

    /// Remove the entry. Returns whether there was one.
    async fn ensure_unregistered(&self) -> Result<bool, AutostartError>;
}

// Factory function to get the platform-specific registration
pub fn platform_autostart(name: &str) -> Result<Box<dyn Autostart>, AutostartError> {
    #[cfg(windows)]
    {
        Ok(Box::new(windows::RunKey::new(name)))
    }

    #[cfg(target_os = "macos")]
    {
        let agents = dirs::home_dir()
            .ok_or(AutostartError::UnsupportedPlatform)?
            .join("Library/LaunchAgents");
        Ok(Box::new(file::FileAutostart::launch_agent(agents, name)))
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        let autostart = dirs::config_dir()
            .ok_or(AutostartError::UnsupportedPlatform)?
            .join("autostart");
        Ok(Box::new(file::FileAutostart::xdg(autostart, name)))
    }

    #[cfg(not(any(windows, unix)))]
    {
        let _ = name;
        Err(AutostartError::UnsupportedPlatform)
    }
}

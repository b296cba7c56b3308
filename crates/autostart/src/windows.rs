use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::{Autostart, AutostartEntry, AutostartError};

const RUN_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Run";

/// A value under the current user's `Run` key, managed through `reg.exe`.
pub struct RunKey {
    name: String,
}

impl RunKey {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    async fn reg(&self, args: &[&str]) -> Result<std::process::Output, AutostartError> {
        Ok(Command::new("reg").args(args).output().await?)
    }
}

#[async_trait]
impl Autostart for RunKey {
    async fn is_registered(&self) -> Result<bool, AutostartError> {
        let output = self.reg(&["query", RUN_KEY, "/v", &self.name]).await?;
        Ok(output.status.success())
    }

    async fn ensure_registered(&self, entry: &AutostartEntry) -> Result<(), AutostartError> {
        let command_line = entry.command_line();
        let output = self
            .reg(&["add", RUN_KEY, "/v", &self.name, "/t", "REG_SZ", "/d", &command_line, "/f"])
            .await?;

        if output.status.success() {
            info!("Registry key set to run at startup");
            Ok(())
        } else {
            Err(AutostartError::CommandError(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ))
        }
    }

    async fn ensure_unregistered(&self) -> Result<bool, AutostartError> {
        if !self.is_registered().await? {
            info!("App was not configured to run at startup, ignoring step");
            return Ok(false);
        }

        let output = self.reg(&["delete", RUN_KEY, "/v", &self.name, "/f"]).await?;
        if output.status.success() {
            info!("Removed registry key to run at startup");
            Ok(true)
        } else {
            Err(AutostartError::CommandError(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ))
        }
    }
}

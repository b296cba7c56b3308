//! Autostart entries that are plain files: XDG `.desktop` entries on
//! Linux and friends, LaunchAgent plists on macOS.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use crate::{Autostart, AutostartEntry, AutostartError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFormat {
    Desktop,
    LaunchAgent,
}

#[derive(Debug, Clone)]
pub struct FileAutostart {
    path: PathBuf,
    format: EntryFormat,
}

impl FileAutostart {
    /// `<dir>/<name>.desktop`, where `dir` is usually `~/.config/autostart`.
    pub fn xdg(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.desktop", name)),
            format: EntryFormat::Desktop,
        }
    }

    /// `<dir>/<name>.plist`, where `dir` is usually `~/Library/LaunchAgents`.
    pub fn launch_agent(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.plist", name)),
            format: EntryFormat::LaunchAgent,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, entry: &AutostartEntry) -> String {
        match self.format {
            EntryFormat::Desktop => format!(
                "[Desktop Entry]\n\
                 Type=Application\n\
                 Name={name}\n\
                 Exec={exec}\n\
                 NoDisplay=true\n\
                 X-GNOME-Autostart-enabled=true\n",
                name = entry.name,
                exec = desktop_exec(entry),
            ),
            EntryFormat::LaunchAgent => {
                let args: String = std::iter::once(entry.program.to_string_lossy().to_string())
                    .chain(entry.args.iter().cloned())
                    .map(|arg| format!("        <string>{}</string>\n", xml_escape(&arg)))
                    .collect();
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
{args}    </array>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#,
                    label = xml_escape(&entry.name),
                    args = args,
                )
            }
        }
    }
}

/// `Exec=` value per the Desktop Entry rules: reserved characters force
/// double quotes, `"`, `` ` ``, `$` and `\` are backslash-escaped inside
/// them, `%` is doubled, and the string-level escape then doubles every
/// backslash.
fn desktop_exec(entry: &AutostartEntry) -> String {
    const RESERVED: &[char] = &[
        '"', '\'', '\\', '>', '<', '~', '|', '&', ';', '$', '*', '?', '#', '(', ')', '`',
    ];

    std::iter::once(entry.program.to_string_lossy().to_string())
        .chain(entry.args.iter().cloned())
        .map(|arg| {
            let arg = arg.replace('%', "%%");
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains(RESERVED) {
                let mut quoted = String::from("\"");
                for c in arg.chars() {
                    if matches!(c, '"' | '`' | '$' | '\\') {
                        quoted.push('\\');
                    }
                    quoted.push(c);
                }
                quoted.push('"');
                quoted
            } else {
                arg
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\\', "\\\\")
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl Autostart for FileAutostart {
    async fn is_registered(&self) -> Result<bool, AutostartError> {
        Ok(fs::try_exists(&self.path).await?)
    }

    async fn ensure_registered(&self, entry: &AutostartEntry) -> Result<(), AutostartError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, self.render(entry)).await?;
        info!("Autostart entry written to {}", self.path.display());
        Ok(())
    }

    async fn ensure_unregistered(&self) -> Result<bool, AutostartError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Removed autostart entry {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("App was not configured to run at startup, ignoring step");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry() -> AutostartEntry {
        AutostartEntry {
            name: "edgent".to_string(),
            program: PathBuf::from("/opt/My Tools/edgent"),
            args: vec!["watch".to_string(), "--hidden".to_string()],
        }
    }

    #[tokio::test]
    async fn desktop_entry_registers_and_unregisters() {
        let dir = tempdir().unwrap();
        let autostart = FileAutostart::xdg(dir.path().join("autostart"), "edgent");

        assert!(!autostart.is_registered().await.unwrap());
        autostart.ensure_registered(&entry()).await.unwrap();
        assert!(autostart.is_registered().await.unwrap());

        let written = std::fs::read_to_string(autostart.path()).unwrap();
        assert!(written.starts_with("[Desktop Entry]\n"));
        assert!(written.contains("Exec=\"/opt/My Tools/edgent\" watch --hidden\n"));

        assert!(autostart.ensure_unregistered().await.unwrap());
        assert!(!autostart.is_registered().await.unwrap());
    }

    #[test]
    fn exec_escapes_reserved_characters() {
        let entry = AutostartEntry {
            name: "edgent".to_string(),
            program: PathBuf::from("/opt/100% $tools/edgent"),
            args: vec!["watch".to_string(), "--hidden".to_string()],
        };

        assert_eq!(desktop_exec(&entry), r#""/opt/100%% \\$tools/edgent" watch --hidden"#);
    }

    #[test]
    fn exec_quotes_backslashes_twice_over() {
        let entry = AutostartEntry {
            name: "edgent".to_string(),
            program: PathBuf::from(r"/opt/a\b/edgent"),
            args: vec![],
        };

        assert_eq!(desktop_exec(&entry), r#""/opt/a\\\\b/edgent""#);
    }

    #[tokio::test]
    async fn registering_again_replaces_a_stale_entry() {
        let dir = tempdir().unwrap();
        let autostart = FileAutostart::xdg(dir.path(), "edgent");
        std::fs::write(autostart.path(), "[Desktop Entry]\nExec=/old/edgent\n").unwrap();

        autostart.ensure_registered(&entry()).await.unwrap();
        autostart.ensure_registered(&entry()).await.unwrap();

        let written = std::fs::read_to_string(autostart.path()).unwrap();
        assert!(!written.contains("/old/edgent"));
        assert_eq!(written.matches("Exec=").count(), 1);
    }

    #[tokio::test]
    async fn unregistering_nothing_is_fine() {
        let dir = tempdir().unwrap();
        let autostart = FileAutostart::xdg(dir.path(), "edgent");

        assert!(!autostart.ensure_unregistered().await.unwrap());
        assert!(!autostart.ensure_unregistered().await.unwrap());
    }

    #[tokio::test]
    async fn launch_agent_lists_every_argument() {
        let dir = tempdir().unwrap();
        let autostart = FileAutostart::launch_agent(dir.path(), "edgent");
        let mut entry = entry();
        entry.args.push("a&b".to_string());

        autostart.ensure_registered(&entry).await.unwrap();

        let plist = std::fs::read_to_string(autostart.path()).unwrap();
        assert!(autostart.path().ends_with("edgent.plist"));
        assert!(plist.contains("<string>/opt/My Tools/edgent</string>"));
        assert!(plist.contains("<string>--hidden</string>"));
        assert!(plist.contains("<string>a&amp;b</string>"));
        assert!(plist.contains("<key>RunAtLoad</key>"));
    }
}

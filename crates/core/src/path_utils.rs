//! Path utilities for Edgent
//!
//! Resolves the app root and the well-known desktop folders that get watched.

use std::path::PathBuf;

/// Expands tilde (~) in paths to the user's home directory.
/// Examples:
/// "~/.edgent" -> "/home/alice/.edgent"
/// "/tmp/foo" -> "/tmp/foo" (no change)
pub fn expand_tilde(path: &str) -> String {
    let Some(rest) = path.strip_prefix('~') else {
        return path.to_string();
    };

    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home.to_string_lossy().to_string(),
        Some(home) if rest.starts_with('/') || rest.starts_with('\\') => {
            format!("{}{}", home.to_string_lossy(), rest)
        }
        _ => path.to_string(),
    }
}

/// Resolves the Edgent app root (logs, .env) using the EDGENT_ROOT env var.
/// Handles absolute paths, tilde expansion, and names relative to home.
pub fn get_app_root() -> PathBuf {
    match std::env::var("EDGENT_ROOT") {
        Ok(root) if root.starts_with('~') => PathBuf::from(expand_tilde(&root)),
        Ok(root) if PathBuf::from(&root).is_absolute() => PathBuf::from(root),
        Ok(root) => home_or_dot().join(root),
        Err(_) => dirs::data_local_dir()
            .map(|dir| dir.join("edgent"))
            .unwrap_or_else(|| home_or_dot().join(".edgent")),
    }
}

fn home_or_dot() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// The current user's desktop folder.
///
/// `dirs` only reports it when the platform (or `user-dirs.dirs` on Linux)
/// knows about it, so fall back to `$HOME/Desktop`.
pub fn user_desktop_dir() -> Option<PathBuf> {
    dirs::desktop_dir().or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
}

/// The desktop shared by all users. Only Windows has one.
#[cfg(windows)]
pub fn common_desktop_dir() -> Option<PathBuf> {
    let public = std::env::var_os("PUBLIC")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Users\Public"));
    Some(public.join("Desktop"))
}

#[cfg(not(windows))]
pub fn common_desktop_dir() -> Option<PathBuf> {
    None
}

/// Every desktop folder a shortcut can be dropped into, user's first.
pub fn desktop_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::with_capacity(2);
    for dir in [user_desktop_dir(), common_desktop_dir()].into_iter().flatten() {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

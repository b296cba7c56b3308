//! Keeping a single live watcher: find and end the others, start a fresh
//! one detached from the console.

use std::process::{Command, Stdio};

use sysinfo::System;
use tracing::{info, warn};

use crate::AutostartError;

/// File name of the running executable, as the OS lists it among processes.
pub fn current_process_name() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.file_name()?.to_string_lossy().to_string())
}

/// End every other process running this executable. Returns how many.
pub fn kill_other_instances() -> usize {
    match current_process_name() {
        Some(name) => kill_others_named(&name),
        None => {
            warn!("Cannot resolve own executable name, no instances ended");
            0
        }
    }
}

pub fn kill_others_named(name: &str) -> usize {
    let me = sysinfo::get_current_pid().ok();
    let mut system = System::new();
    system.refresh_processes();

    let mut ended = 0;
    for process in system.processes_by_exact_name(name) {
        if Some(process.pid()) == me {
            continue;
        }
        if process.kill() {
            info!("Ended process with Id {}", process.pid());
            ended += 1;
        } else {
            warn!("Could not end process with Id {}", process.pid());
        }
    }
    ended
}

/// Launch this executable again with `args`, with no console attached.
pub fn spawn_detached(args: &[&str]) -> Result<u32, AutostartError> {
    let mut command = Command::new(std::env::current_exe()?);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(DETACHED_PROCESS | CREATE_NO_WINDOW);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a Ctrl-C in the launching terminal misses it
        command.process_group(0);
    }

    let child = command.spawn()?;
    info!("Instance started (pid {})", child.id());
    Ok(child.id())
}

//! Process plumbing — detached spawning and pid liveness.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::application::ports::{DetachedCommand, LivenessCheck, ProcessSpawner};
use crate::domain::LaunchError;

// ── Liveness ──────────────────────────────────────────────────────────────────

/// Signal-0 liveness: the pid is alive if the kernel knows it.
pub struct SystemLiveness;

#[cfg(unix)]
impl LivenessCheck for SystemLiveness {
    fn is_alive(&self, pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        if raw <= 0 {
            return false;
        }
        // EPERM: exists but belongs to someone else.
        matches!(kill(Pid::from_raw(raw), None), Ok(()) | Err(Errno::EPERM))
    }
}

#[cfg(not(unix))]
impl LivenessCheck for SystemLiveness {
    fn is_alive(&self, _pid: u32) -> bool {
        false
    }
}

// ── Detached spawn ────────────────────────────────────────────────────────────

/// Starts a child in its own process group with stdin closed and both
/// output streams appended to a log file. The child is never waited on by
/// the caller; a reaper thread collects its exit status.
pub struct DetachedSpawner;

impl ProcessSpawner for DetachedSpawner {
    fn spawn_detached(&self, command: &DetachedCommand) -> Result<u32, LaunchError> {
        let (stdout, stderr) = open_log(&command.log_path)?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| {
            LaunchError::Spawn(format!("{}: {e}", command.program.display()))
        })?;
        let pid = child.id();
        debug!(pid, program = %command.program.display(), "detached process started");

        // Reap so the child never lingers as a zombie while the agent lives.
        let spawned = std::thread::Builder::new()
            .name("outpost-reaper".to_string())
            .spawn(move || match child.wait() {
                Ok(status) => debug!(pid, %status, "detached process exited"),
                Err(e) => warn!(pid, error = %e, "cannot reap detached process"),
            });
        if let Err(e) = spawned {
            warn!(pid, error = %e, "no reaper thread for detached process");
        }
        Ok(pid)
    }
}

fn open_log(path: &Path) -> Result<(std::fs::File, std::fs::File), LaunchError> {
    let write_err = |source| LaunchError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let stdout = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;
    let stderr = stdout.try_clone().map_err(write_err)?;
    Ok((stdout, stderr))
}

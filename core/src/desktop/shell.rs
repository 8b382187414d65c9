use std::process::{Command, Stdio};
use tracing::{debug, warn};

use super::{DesktopError, ShellLauncher};

/// Runs lines through `cmd /c` on Windows and `sh -c` elsewhere
pub struct SystemShell;

impl SystemShell {
    #[cfg(windows)]
    fn command(line: &str) -> Command {
        use std::os::windows::process::CommandExt;

        let mut cmd = Command::new("cmd");
        // cmd parses its own command line; quoting through arg() would break `start ... "x"`.
        cmd.raw_arg(format!("/c \"{}\"", line));
        cmd
    }

    #[cfg(not(windows))]
    fn command(line: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(line);
        cmd
    }
}

impl ShellLauncher for SystemShell {
    fn launch(&self, line: &str) -> Result<(), DesktopError> {
        let mut child = Self::command(line)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| DesktopError::Launch {
                line: line.to_string(),
                source,
            })?;

        debug!(pid = child.id(), line, "Launched shell process");

        // Reap in the background so long-running daemons don't collect zombies.
        let reaper = std::thread::Builder::new()
            .name("commanddb-reaper".to_string())
            .spawn(move || {
                let _ = child.wait();
            });
        if let Err(e) = reaper {
            warn!(error = %e, "Could not start reaper thread; child left unreaped");
        }

        Ok(())
    }
}

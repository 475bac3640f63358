use std::fs::{self, OpenOptions};
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::PidFileError;

/// PID file held for as long as the server runs.
///
/// Acquiring the guard refuses to overwrite a file that names a live
/// process, replaces stale files, and writes the current process id. The
/// file is removed when the guard drops.
#[derive(Debug)]
pub struct PidFile {
    path: Utf8PathBuf,
    pid: u32,
}

impl PidFile {
    /// Writes the current process id to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::AlreadyRunning`] when the existing file names
    /// a live process, and IO errors when the file cannot be replaced or
    /// written.
    pub fn acquire(path: &Utf8Path) -> Result<Self, PidFileError> {
        if let Some(pid) = read_pid(path) {
            if check_process(pid)? {
                info!(
                    target: PROCESS_TARGET,
                    pid,
                    file = %path,
                    "refusing to start: existing server alive"
                );
                return Err(PidFileError::AlreadyRunning { pid });
            }
            warn!(
                target: PROCESS_TARGET,
                pid,
                file = %path,
                "existing server not detected; replacing stale pid file"
            );
        }

        let pid = std::process::id();
        write_pid(path, pid)?;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %path,
            "pid file written"
        );
        Ok(Self {
            path: path.to_owned(),
            pid,
        })
    }

    /// Location of the PID file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Process id recorded in the file.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: PROCESS_TARGET,
                    file = %self.path,
                    error = %error,
                    "failed to remove pid file"
                );
            }
            _ => {
                info!(target: PROCESS_TARGET, file = %self.path, "pid file removed");
            }
        }
    }
}

fn write_pid(path: &Utf8Path, pid: u32) -> Result<(), PidFileError> {
    let write_error = |source| PidFileError::Write {
        path: path.to_owned(),
        source,
    };
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(write_error)?;
    writeln!(file, "{pid}").map_err(write_error)?;
    file.sync_all().map_err(write_error)?;
    Ok(())
}

fn read_pid(path: &Utf8Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok().filter(|pid| *pid != 0)
}

fn check_process(pid: u32) -> Result<bool, PidFileError> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH | Errno::ECHILD) => Ok(false),
        Err(errno) => Err(PidFileError::CheckProcess { pid, source: errno }),
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    /// Larger than any pid the kernel hands out.
    const DEAD_PID: u32 = 2_147_483_000;

    struct PidDir {
        _dir: TempDir,
        path: Utf8PathBuf,
    }

    #[fixture]
    fn pid_dir() -> PidDir {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("unreal_mcp.pid"))
            .expect("temp path should be utf-8");
        PidDir { _dir: dir, path }
    }

    #[rstest]
    fn acquire_writes_current_pid_and_drop_removes_it(pid_dir: PidDir) {
        let guard = PidFile::acquire(&pid_dir.path).expect("acquire pid file");
        let content = fs::read_to_string(&pid_dir.path).expect("read pid file");
        assert_eq!(content.trim(), std::process::id().to_string());
        assert_eq!(guard.pid(), std::process::id());
        assert_eq!(guard.path(), pid_dir.path.as_path());

        drop(guard);
        assert!(!pid_dir.path.exists(), "pid file should be removed on drop");
    }

    #[cfg(unix)]
    #[rstest]
    fn pid_file_is_private(pid_dir: PidDir) {
        use std::os::unix::fs::PermissionsExt;

        let _guard = PidFile::acquire(&pid_dir.path).expect("acquire pid file");
        let mode = fs::metadata(&pid_dir.path)
            .expect("pid metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[rstest]
    fn live_pid_blocks_acquisition(pid_dir: PidDir) {
        fs::write(&pid_dir.path, format!("{}\n", std::process::id())).expect("seed pid file");

        match PidFile::acquire(&pid_dir.path) {
            Err(PidFileError::AlreadyRunning { pid }) => assert_eq!(pid, std::process::id()),
            other => panic!("expected AlreadyRunning, got {other:?}"),
        }
        assert!(pid_dir.path.exists(), "live pid file must be left alone");
    }

    #[rstest]
    #[case::dead_process(format!("{DEAD_PID}\n"))]
    #[case::garbage("not a pid".to_owned())]
    #[case::zero("0".to_owned())]
    fn stale_files_are_replaced(pid_dir: PidDir, #[case] contents: String) {
        fs::write(&pid_dir.path, contents).expect("seed pid file");

        let guard = PidFile::acquire(&pid_dir.path).expect("replace stale pid file");
        let content = fs::read_to_string(&pid_dir.path).expect("read pid file");
        assert_eq!(content.trim(), guard.pid().to_string());
    }
}

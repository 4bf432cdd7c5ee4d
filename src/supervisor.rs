use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// How long a terminated server gets to exit before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Exclusive owner of the spawned server process.
///
/// There is exactly one of these per launch. `shutdown` is the graceful
/// teardown and is safe to call more than once; `Drop` backstops every
/// other way the owning scope can exit with a best-effort kill, so the
/// server can never outlive the shell.
pub struct ServerProcess {
    child: Child,
    host: String,
    port: u16,
    shut_down: bool,
}

/// Spawn the server with `PORT`/`HOST` overlaid on the parent environment
/// and `cwd` as its working directory.
///
/// Both output streams are piped to the parent and forwarded line-by-line
/// into our log, so the child holds no terminal of its own and its
/// diagnostics still end up somewhere visible.
pub fn spawn(
    exe: &Path,
    args: &[&OsStr],
    host: &str,
    port: u16,
    cwd: &Path,
) -> Result<ServerProcess> {
    let mut cmd = Command::new(exe);
    cmd.args(args)
        .env("PORT", port.to_string())
        .env("HOST", host)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn server runtime {}", exe.display()))?;

    info!(
        "spawned server pid={:?} exe={} port={}",
        child.id(),
        exe.display(),
        port
    );

    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, log::Level::Info);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, log::Level::Warn);
    }

    Ok(ServerProcess {
        child,
        host: host.to_string(),
        port,
        shut_down: false,
    })
}

/// Forward one of the child's output streams into the log until EOF.
fn forward_lines<R>(reader: R, level: log::Level)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log::log!(level, "[server] {line}");
        }
    });
}

impl ServerProcess {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Terminate the server: graceful signal, bounded wait, then kill.
    ///
    /// Idempotent, and deliberately infallible — teardown runs on the way
    /// out of the shell, where nothing useful can be done with an error
    /// beyond logging it. Never blocks longer than the grace period plus
    /// the final reap.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.request_exit();

        match timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!("server exited: {status}");
            }
            Ok(Err(e)) => {
                error!("error waiting for server exit: {e}");
            }
            Err(_) => {
                warn!(
                    "server still running after {:?} grace, killing",
                    SHUTDOWN_GRACE
                );
                if let Err(e) = self.child.start_kill() {
                    error!("failed to kill server: {e}");
                }
                match self.child.wait().await {
                    Ok(status) => info!("server killed: {status}"),
                    Err(e) => error!("error reaping killed server: {e}"),
                }
            }
        }
    }

    #[cfg(unix)]
    fn request_exit(&mut self) {
        // id() is None once the child has been reaped; wait() in the
        // caller returns immediately in that case.
        if let Some(pid) = self.child.id() {
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }
    }

    #[cfg(not(unix))]
    fn request_exit(&mut self) {
        // No portable graceful signal; go straight to kill.
        if let Err(e) = self.child.start_kill() {
            error!("failed to kill server: {e}");
        }
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if !self.shut_down {
            warn!("server process dropped without shutdown, killing");
            let _ = self.child.start_kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::ffi::OsString;

    #[cfg(unix)]
    fn sleep_args() -> Vec<OsString> {
        vec![OsString::from("-c"), OsString::from("sleep 30")]
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shutdown_terminates_within_grace() {
        let args = sleep_args();
        let args: Vec<&OsStr> = args.iter().map(|a| a.as_os_str()).collect();
        let mut server = spawn(
            Path::new("/bin/sh"),
            &args,
            "127.0.0.1",
            0,
            Path::new("/tmp"),
        )
        .unwrap();
        assert!(server.pid().is_some());

        let started = std::time::Instant::now();
        server.shutdown().await;
        // SIGTERM should take it down well before the kill escalation.
        assert!(started.elapsed() < SHUTDOWN_GRACE);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let args = sleep_args();
        let args: Vec<&OsStr> = args.iter().map(|a| a.as_os_str()).collect();
        let mut server = spawn(
            Path::new("/bin/sh"),
            &args,
            "127.0.0.1",
            0,
            Path::new("/tmp"),
        )
        .unwrap();

        server.shutdown().await;
        // Second call must be a no-op, not a double signal or a panic.
        server.shutdown().await;
    }

    #[tokio::test]
    async fn spawn_failure_is_an_error_not_a_panic() {
        let result = spawn(
            Path::new("/nonexistent/runtime/binary"),
            &[],
            "127.0.0.1",
            0,
            Path::new("."),
        );
        let err = result.err().expect("spawn should fail");
        assert!(err.to_string().contains("failed to spawn server runtime"));
    }
}

//! Backend process execution.
//!
//! Every invocation is bounded by the agent timeout (further capped by the
//! request deadline) and raced against the request's cancellation token.
//! On unix the backend leads its own process group. On timeout or
//! cancellation the whole group is killed and the backend reaped before the
//! call returns, so helpers the backend started do not outlive it. The group
//! is also killed when a run finishes and when the future is dropped
//! mid-flight.

use gateway_core::{GatewayError, GatewayResult, RequestContext};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Captured output of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

enum Outcome {
    Finished(std::io::Result<(ExitStatus, Vec<u8>, Vec<u8>)>),
    TimedOut,
    Cancelled,
}

/// Run `program` with `args` and collect its output
///
/// # Errors
/// - `Cancelled` if the request is cancelled first
/// - `Timeout` if the bound elapses first
/// - `BackendExecutionFailed` if the process cannot start, its pipes fail,
///   or it exits unsuccessfully (carrying stderr)
pub async fn run(
    agent: &str,
    program: &Path,
    args: &[String],
    ctx: &RequestContext,
    limit: Duration,
) -> GatewayResult<ProcessOutput> {
    if ctx.is_cancelled() {
        return Err(GatewayError::Cancelled {
            agent: agent.to_string(),
        });
    }

    let budget = ctx.bound(limit);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|e| {
        GatewayError::backend(
            agent,
            format!("failed to start '{}': {e}", program.display()),
            None,
            "",
        )
    })?;
    let group = ProcessGroup {
        agent,
        pgid: child.id(),
    };

    debug!(
        agent = %agent,
        pid = child.id(),
        request_id = %ctx.request_id,
        budget = ?budget,
        "Backend process started"
    );

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| GatewayError::internal("backend stdout was not captured"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| GatewayError::internal("backend stderr was not captured"))?;

    let outcome = {
        let collect = async {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let wait = async {
                let status = child.wait().await?;
                // Leftover helpers would hold the pipes open and stall the reads.
                group.kill();
                Ok::<_, std::io::Error>(status)
            };
            let (status, _, _) = tokio::try_join!(
                wait,
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err),
            )?;
            Ok::<_, std::io::Error>((status, out, err))
        };

        tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => Outcome::Cancelled,
            result = collect => Outcome::Finished(result),
            () = tokio::time::sleep(budget) => Outcome::TimedOut,
        }
    };

    match outcome {
        Outcome::Finished(Ok((status, out, err))) => {
            let stdout = String::from_utf8_lossy(&out).into_owned();
            let stderr = String::from_utf8_lossy(&err).into_owned();

            if status.success() {
                debug!(agent = %agent, bytes = out.len(), "Backend process finished");
                Ok(ProcessOutput { stdout, stderr })
            } else {
                warn!(agent = %agent, status = %status, "Backend process failed");
                Err(GatewayError::backend(
                    agent,
                    format!("backend exited with {status}"),
                    status.code(),
                    stderr,
                ))
            }
        }
        Outcome::Finished(Err(e)) => {
            terminate(&group, &mut child).await;
            Err(GatewayError::backend(
                agent,
                format!("backend I/O failed: {e}"),
                None,
                "",
            ))
        }
        Outcome::TimedOut => {
            warn!(agent = %agent, timeout = ?budget, "Backend process timed out");
            terminate(&group, &mut child).await;
            Err(GatewayError::Timeout {
                agent: agent.to_string(),
                timeout: budget,
            })
        }
        Outcome::Cancelled => {
            debug!(agent = %agent, "Request cancelled, stopping backend process");
            terminate(&group, &mut child).await;
            Err(GatewayError::Cancelled {
                agent: agent.to_string(),
            })
        }
    }
}

/// The backend's process group, killed when dropped
struct ProcessGroup<'a> {
    agent: &'a str,
    pgid: Option<u32>,
}

impl ProcessGroup<'_> {
    /// Send SIGKILL to every process in the group
    #[cfg(unix)]
    fn kill(&self) {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(pgid) = self.pgid.and_then(|id| i32::try_from(id).ok()) else {
            return;
        };
        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => {
                warn!(agent = %self.agent, pgid, error = %e, "Failed to kill backend process group");
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

impl Drop for ProcessGroup<'_> {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Kill the backend and its helpers, then reap the backend
async fn terminate(group: &ProcessGroup<'_>, child: &mut Child) {
    group.kill();
    if matches!(child.try_wait(), Ok(Some(_))) {
        return;
    }
    if let Err(e) = child.kill().await {
        warn!(agent = %group.agent, error = %e, "Failed to kill backend process");
    }
}

/// Whether `path` exists and is not a directory
pub async fn is_present(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| !meta.is_dir())
        .unwrap_or(false)
}

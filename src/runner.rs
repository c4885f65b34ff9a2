//! Case Runner
//!
//! Runs one [`ExecutionRequest`] as one front-end process and captures what it printed. The runner only
//! reports how the process ended (exited, crashed, timed out, cancelled, never launched); deciding pass or
//! fail is left to the matcher.
//!
//! ## Notes
//!
//! - Every request gets a fresh scratch working directory, removed when the request completes.
//! - stdout and stderr are drained while waiting, so a chatty front end cannot block on a full pipe.
//! - On unix the front end leads its own process group. On timeout or cancellation the whole group is killed,
//!   so helpers started by wrapper scripts die with it, and the child is reaped. Output captured up to that
//!   point is kept.

use std::future::Future;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::request::ExecutionRequest;

/// How long to keep reading both pipes after the process ends, in case something outside its group still holds
/// them open.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How the front-end process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// Exited normally with a code.
    Exited(i32),
    /// Terminated without an exit code (killed by a signal).
    Crashed { signal: Option<i32> },
    /// Killed after exceeding the request timeout.
    TimedOut,
    /// Killed because the run was cancelled.
    Cancelled,
    /// The process could not be started.
    LaunchFailed(String),
}

/// Raw result of running one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub exit: ProcessExit,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl RunOutput {
    /// Output for a process that never produced anything.
    pub fn without_output(exit: ProcessExit, duration: Duration) -> Self {
        Self {
            exit,
            stdout: String::new(),
            stderr: String::new(),
            duration,
        }
    }
}

/// Normalized judgment of an exit code against a phase's policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitJudgment {
    Accepted,
    Rejected(i32),
}

/// Judge an exit code against the codes a phase accepts.
pub fn judge_exit(code: i32, accept_exit_codes: &[i32]) -> ExitJudgment {
    if accept_exit_codes.contains(&code) {
        ExitJudgment::Accepted
    } else {
        ExitJudgment::Rejected(code)
    }
}

/// Executes requests on behalf of the scheduler.
///
/// The default implementation spawns the front end; tests substitute scripted executors.
pub trait CaseExecutor: Send + Sync + 'static {
    /// Run `request` to completion, honoring its timeout and the cancellation signal.
    fn execute(&self, request: &ExecutionRequest, cancel: watch::Receiver<bool>) -> impl Future<Output = RunOutput> + Send;
}

/// Spawns the configured front end as a subprocess.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl CaseExecutor for ProcessExecutor {
    fn execute(&self, request: &ExecutionRequest, cancel: watch::Receiver<bool>) -> impl Future<Output = RunOutput> + Send {
        run_process(request.clone(), cancel)
    }
}

/// Resolve once cancellation is signalled; never resolves if the sender is gone without signalling.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

type Capture = Arc<Mutex<Vec<u8>>>;

/// Read `reader` to EOF into a shared buffer, so partial output survives an aborted read.
fn capture<R>(reader: Option<R>) -> (Capture, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buffer: Capture = Arc::default();
    let sink = Arc::clone(&buffer);
    let handle = tokio::spawn(async move {
        let Some(mut reader) = reader else {
            return;
        };
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let mut buffer = sink.lock().unwrap_or_else(PoisonError::into_inner);
                    buffer.extend_from_slice(&chunk[..n]);
                }
            }
        }
    });
    (buffer, handle)
}

fn take_text(buffer: &Capture) -> String {
    let bytes = buffer.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

fn exit_of(status: ExitStatus) -> ProcessExit {
    match status.code() {
        Some(code) => ProcessExit::Exited(code),
        None => ProcessExit::Crashed { signal: signal_of(status) },
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}

async fn kill_and_reap(child: &mut Child) {
    if let Some(pid) = child.id() {
        kill_process_group(pid);
    }
    if let Err(err) = child.kill().await {
        tracing::warn!(error = %err, "failed to kill front end");
    }
}

/// SIGKILL the process group led by `pid`.
#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal. The group was created for this child by `process_group(0)` and its
    // id cannot be reused while the child is still unreaped.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        tracing::debug!(error = %std::io::Error::last_os_error(), "failed to signal process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Run one request as a subprocess.
#[tracing::instrument(skip_all, fields(case = %request.label()))]
pub async fn run_process(request: ExecutionRequest, mut cancel: watch::Receiver<bool>) -> RunOutput {
    let start = Instant::now();
    if *cancel.borrow() {
        return RunOutput::without_output(ProcessExit::Cancelled, start.elapsed());
    }

    let workdir = match tempfile::Builder::new().prefix("svconform-").tempdir() {
        Ok(dir) => dir,
        Err(err) => {
            return RunOutput::without_output(
                ProcessExit::LaunchFailed(format!("cannot create working directory: {}", err)),
                start.elapsed(),
            );
        }
    };

    let mut command = Command::new(&request.command.program);
    command
        .args(&request.command.args)
        .current_dir(workdir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    tracing::debug!(command = %request.command, timeout_ms = request.timeout.as_millis() as u64, "launching");
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(error = %err, "front end failed to launch");
            return RunOutput::without_output(
                ProcessExit::LaunchFailed(format!("failed to launch `{}`: {}", request.command.program, err)),
                start.elapsed(),
            );
        }
    };

    let (stdout, stdout_task) = capture(child.stdout.take());
    let (stderr, stderr_task) = capture(child.stderr.take());

    let waited = tokio::select! {
        status = child.wait() => Waited::Exited(status),
        _ = tokio::time::sleep(request.timeout) => Waited::TimedOut,
        _ = cancelled(&mut cancel) => Waited::Cancelled,
    };
    let exit = match waited {
        Waited::Exited(Ok(status)) => exit_of(status),
        Waited::Exited(Err(err)) => ProcessExit::LaunchFailed(format!("failed to wait for front end: {}", err)),
        Waited::TimedOut => {
            tracing::warn!(timeout_ms = request.timeout.as_millis() as u64, "timed out; killing front end");
            kill_and_reap(&mut child).await;
            ProcessExit::TimedOut
        }
        Waited::Cancelled => {
            tracing::info!("cancelled; killing front end");
            kill_and_reap(&mut child).await;
            ProcessExit::Cancelled
        }
    };

    let aborts = [stdout_task.abort_handle(), stderr_task.abort_handle()];
    let drained = async { tokio::join!(stdout_task, stderr_task) };
    if tokio::time::timeout(DRAIN_GRACE, drained).await.is_err() {
        tracing::debug!("output pipes still open after the drain grace; keeping what was read");
        for abort in aborts {
            abort.abort();
        }
    }

    let output = RunOutput {
        exit,
        stdout: take_text(&stdout),
        stderr: take_text(&stderr),
        duration: start.elapsed(),
    };
    tracing::debug!(exit = ?output.exit, duration_ms = output.duration.as_millis() as u64, "finished");

    if let Err(err) = workdir.close() {
        tracing::debug!(error = %err, "failed to remove working directory");
    }
    output
}

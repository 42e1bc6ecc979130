use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use super::{ToolError, ToolInvocation, ToolOutput, ToolRunner};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs tools as real child processes.
///
/// Stdout is capped at `max_output_bytes`; anything beyond is drained so the
/// child never blocks on a full pipe. When an invocation carries a timeout the
/// whole call, pipe draining included, is bounded by it: the child's process
/// group (unix) is killed on expiry or as soon as the child exits, and reader
/// threads still blocked past the deadline are abandoned rather than joined.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    max_output_bytes: usize,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self { max_output_bytes: 64 * 1024 * 1024 }
    }
}

impl SystemRunner {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }
}

#[derive(Default)]
struct Captured {
    text: String,
    truncated: bool,
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R, limit: usize) -> Receiver<Captured> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = (&mut source).take(limit as u64).read_to_end(&mut buf);
        let drained = std::io::copy(&mut source, &mut std::io::sink()).unwrap_or(0);
        let _ = tx.send(Captured {
            text: String::from_utf8_lossy(&buf).to_string(),
            truncated: drained > 0,
        });
    });
    rx
}

/// Wait for a reader; `None` when the deadline passes while the pipe is still open.
fn collect(reader: Option<Receiver<Captured>>, deadline: Option<Instant>) -> Option<Captured> {
    let Some(rx) = reader else {
        return Some(Captured::default());
    };
    let received = match deadline {
        Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(captured) => Some(captured),
        Err(RecvTimeoutError::Disconnected) => Some(Captured::default()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

#[cfg(unix)]
fn isolate(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_cmd: &mut Command) {}

/// SIGKILL every process left in the group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: u32) {
    if let Ok(pid) = i32::try_from(pid) {
        // SAFETY: plain syscall; a group that is already gone yields ESRCH.
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

#[cfg(unix)]
fn signal_of(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &ExitStatus) -> Option<i32> {
    None
}

fn wait_until(
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
    program: &str,
) -> Result<ExitStatus, ToolError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                kill_group(child.id());
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolError::TimedOut { program: program.to_string(), timeout });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                kill_group(child.id());
                let _ = child.kill();
                return Err(ToolError::Wait { program: program.to_string(), source });
            }
        }
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let program = invocation.program_name();
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate(&mut cmd);

        let started = Instant::now();
        let mut child =
            cmd.spawn().map_err(|source| ToolError::Spawn { program: program.clone(), source })?;
        let stdout = child.stdout.take().map(|s| spawn_reader(s, self.max_output_bytes));
        let stderr = child.stderr.take().map(|s| spawn_reader(s, 64 * 1024));

        let deadline = invocation.timeout.map(|timeout| started + timeout);
        let status = match (invocation.timeout, deadline) {
            (Some(timeout), Some(deadline)) => {
                let status = wait_until(&mut child, deadline, timeout, &program)?;
                // Leftover background processes would otherwise hold the pipes open.
                kill_group(child.id());
                status
            }
            _ => child
                .wait()
                .map_err(|source| ToolError::Wait { program: program.clone(), source })?,
        };

        let (Some(out), Some(err)) = (collect(stdout, deadline), collect(stderr, deadline)) else {
            return Err(ToolError::TimedOut {
                program,
                timeout: invocation.timeout.unwrap_or_default(),
            });
        };
        if out.truncated {
            return Err(ToolError::OutputLimit { program, limit: self.max_output_bytes });
        }

        Ok(ToolOutput {
            program,
            code: status.code(),
            signal: signal_of(&status),
            stdout: out.text,
            stderr: err.text,
        })
    }
}

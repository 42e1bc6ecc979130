//! External tool invocation.
//!
//! Every stage talks to radare2/rabin2/otool/nm/plutil/class-dump through a
//! [`ToolRunner`]. The runner reports exit status and captured output; the
//! caller decides whether a non-zero exit degrades a field or is itself the
//! signal being measured (as in the load probe).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

mod preflight;
mod process;

pub use preflight::{preflight, resolve_tool, tool_available, EnvironmentError, REQUIRED_TOOLS};
pub use process::SystemRunner;

/// A single subprocess call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Hard wall-clock limit; `None` waits for the tool to exit.
    pub timeout: Option<Duration>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), timeout: None }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program file name, used in diagnostics.
    pub fn program_name(&self) -> String {
        program_name(&self.program)
    }

    /// Space-joined command line for logs and test matching.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

pub(crate) fn program_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.display().to_string())
}

/// What a finished tool left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub program: String,
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Terminating signal on unix.
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn status_description(&self) -> String {
        match (self.code, self.signal) {
            (Some(code), _) => format!("exit code {code}"),
            (None, Some(sig)) => format!("signal {sig}"),
            (None, None) => "unknown status".to_string(),
        }
    }

    /// Stdout of a successful run; a non-zero exit becomes an error.
    pub fn into_stdout(self) -> Result<String, ToolError> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(ToolError::NonZeroExit {
                status: self.status_description(),
                stderr: self.stderr.trim().chars().take(512).collect(),
                program: self.program,
            })
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {}ms", timeout.as_millis())]
    TimedOut { program: String, timeout: Duration },
    #[error("{program} exited with {status}: {stderr}")]
    NonZeroExit { program: String, status: String, stderr: String },
    #[error("{program} produced more than {limit} bytes of output")]
    OutputLimit { program: String, limit: usize },
    #[error("{program} produced no output")]
    EmptyOutput { program: String },
    #[error("failed to parse {program} output: {source}")]
    Parse {
        program: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ToolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolError::TimedOut { .. })
    }
}

/// Seam for running external tools.
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;
}

/// Run `invocation`, require success and non-empty stdout, and parse it as JSON.
pub fn run_json<T: serde::de::DeserializeOwned>(
    runner: &dyn ToolRunner,
    invocation: &ToolInvocation,
) -> Result<T, ToolError> {
    let program = invocation.program_name();
    let stdout = runner.run(invocation)?.into_stdout()?;
    if stdout.trim().is_empty() {
        return Err(ToolError::EmptyOutput { program });
    }
    serde_json::from_str(&stdout).map_err(|source| ToolError::Parse { program, source })
}

/// Run `invocation` and return stdout of a successful exit.
pub fn run_text(runner: &dyn ToolRunner, invocation: &ToolInvocation) -> Result<String, ToolError> {
    runner.run(invocation)?.into_stdout()
}

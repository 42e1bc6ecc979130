#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use probe_core::tools::{ToolError, ToolInvocation, ToolOutput, ToolRunner};

/// 64-bit little-endian Mach-O header magic.
pub const MACHO_64_LE: [u8; 4] = [0xcf, 0xfa, 0xed, 0xfe];

/// Write a file starting with a Mach-O magic, padded to `size` bytes.
pub fn write_macho(path: &Path, size: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut body = MACHO_64_LE.to_vec();
    body.resize(size.max(4), 0);
    fs::write(path, body).unwrap();
}

/// `<root>/<name>.framework` with a payload at the conventional top-level spot.
pub fn framework_with_payload(root: &Path, name: &str) -> PathBuf {
    let bundle = root.join(format!("{name}.framework"));
    write_macho(&bundle.join(name), 64);
    bundle
}

struct Rule {
    program: String,
    needle: String,
    respond: Box<dyn Fn() -> Result<ToolOutput, ToolError> + Send + Sync>,
}

/// Canned responses keyed by program file name and a command-line substring.
/// Unmatched invocations fail to spawn, like a missing tool.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<String>>,
}

pub fn output(program: &str, code: i32, stdout: &str) -> ToolOutput {
    ToolOutput {
        program: program.to_string(),
        code: Some(code),
        signal: None,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, program: &str, needle: &str, stdout: &str) -> Self {
        let (p, s) = (program.to_string(), stdout.to_string());
        self.rules.push(Rule {
            program: program.to_string(),
            needle: needle.to_string(),
            respond: Box::new(move || Ok(output(&p, 0, &s))),
        });
        self
    }

    pub fn fail(mut self, program: &str, needle: &str, code: i32) -> Self {
        let p = program.to_string();
        self.rules.push(Rule {
            program: program.to_string(),
            needle: needle.to_string(),
            respond: Box::new(move || Ok(output(&p, code, ""))),
        });
        self
    }

    pub fn time_out(mut self, program: &str, needle: &str) -> Self {
        let p = program.to_string();
        self.rules.push(Rule {
            program: program.to_string(),
            needle: needle.to_string(),
            respond: Box::new(move || {
                Err(ToolError::TimedOut {
                    program: p.clone(),
                    timeout: std::time::Duration::from_secs(30),
                })
            }),
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let line = invocation.command_line();
        self.calls.lock().unwrap().push(line.clone());
        let program = invocation.program_name();
        match self.rules.iter().find(|r| r.program == program && line.contains(&r.needle)) {
            Some(rule) => (rule.respond)(),
            None => Err(ToolError::Spawn {
                program,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not scripted"),
            }),
        }
    }
}

/// Restores a directory's permissions when dropped.
#[cfg(unix)]
pub struct LockedDir(PathBuf);

#[cfg(unix)]
impl Drop for LockedDir {
    fn drop(&mut self) {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&self.0, fs::Permissions::from_mode(0o755));
    }
}

/// `chmod 000` on `dir`. `None` when running as root, where the mode is not enforced.
#[cfg(unix)]
pub fn lock_dir(dir: &Path) -> Option<LockedDir> {
    use std::os::unix::fs::PermissionsExt;
    if unsafe { libc::geteuid() } == 0 {
        return None;
    }
    fs::set_permissions(dir, fs::Permissions::from_mode(0o000)).unwrap();
    Some(LockedDir(dir.to_path_buf()))
}

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{program_name, ToolInvocation, ToolRunner};
use crate::config::ToolPaths;

/// Tools without which no bundle can be analysed.
pub const REQUIRED_TOOLS: [&str; 2] = ["r2", "rabin2"];

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("required tool {tool} is not available: {reason}")]
    MissingTool { tool: String, reason: String },
}

/// Locate `program` on `PATH`, or check it directly when given as a path.
pub fn resolve_tool(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        program.is_file().then(|| program.to_path_buf())
    } else {
        which::which(program).ok()
    }
}

/// Resolve `program` and confirm it answers `version_arg`.
pub fn tool_available(
    runner: &dyn ToolRunner,
    program: &Path,
    version_arg: &str,
) -> Result<(), String> {
    let resolved = resolve_tool(program).ok_or_else(|| "not found".to_string())?;
    let output = runner
        .run(&ToolInvocation::new(resolved).arg(version_arg))
        .map_err(|e| e.to_string())?;
    if output.success() {
        Ok(())
    } else {
        Err(format!(
            "{} {version_arg} exited with {}",
            program_name(program),
            output.status_description()
        ))
    }
}

/// Fail fast when radare2 or rabin2 is missing.
pub fn preflight(tools: &ToolPaths, runner: &dyn ToolRunner) -> Result<(), EnvironmentError> {
    for (label, program) in REQUIRED_TOOLS.iter().zip([&tools.radare2, &tools.rabin2]) {
        tool_available(runner, program, "-v").map_err(|reason| EnvironmentError::MissingTool {
            tool: label.to_string(),
            reason,
        })?;
    }
    Ok(())
}

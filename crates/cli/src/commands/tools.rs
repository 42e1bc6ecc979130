use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use probe_core::config::ProbeConfig;
use probe_core::tools::{preflight, resolve_tool, tool_available, SystemRunner};

use crate::commands::EXIT_MISSING_TOOL;

fn print_status(label: &str, program: &Path, status: Result<(), String>) {
    match status {
        Ok(()) => println!("- {label}: OK ({})", program.display()),
        Err(reason) => println!("- {label}: MISSING ({}: {reason})", program.display()),
    }
}

/// Report required and optional tool availability; exit 2 when a required one is missing.
pub fn check_tools_command(config: &ProbeConfig) -> Result<ExitCode> {
    let runner = SystemRunner::new(config.max_tool_output_bytes);
    let tools = &config.tools;

    println!("Required:");
    print_status("r2", &tools.radare2, tool_available(&runner, &tools.radare2, "-v"));
    print_status("rabin2", &tools.rabin2, tool_available(&runner, &tools.rabin2, "-v"));

    println!("Optional:");
    for (label, program) in
        [("otool", &tools.otool), ("nm", &tools.nm), ("plutil", &tools.plutil)]
    {
        let status = resolve_tool(program).map(|_| ()).ok_or_else(|| "not found".to_string());
        print_status(label, program, status);
    }
    print_status(
        "class-dump",
        &tools.class_dump,
        tool_available(&runner, &tools.class_dump, "--version"),
    );

    match preflight(tools, &runner) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(_) => Ok(ExitCode::from(EXIT_MISSING_TOOL)),
    }
}

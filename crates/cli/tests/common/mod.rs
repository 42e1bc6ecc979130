#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

/// Write a file starting with a 64-bit Mach-O magic.
pub fn write_macho(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut body = vec![0xcf, 0xfa, 0xed, 0xfe];
    body.resize(64, 0);
    fs::write(path, body).unwrap();
}

pub fn framework(root: &Path, name: &str) -> PathBuf {
    let bundle = root.join(format!("{name}.framework"));
    write_macho(&bundle.join(name));
    bundle
}

/// Executable shell script standing in for an external tool.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// radare2/rabin2 doubles answering the version probe and the JSON queries.
#[cfg(unix)]
pub fn fake_radare(dir: &Path) -> (PathBuf, PathBuf) {
    let r2 = fake_tool(dir, "r2", "case \"$1\" in -v) echo 'radare2 5.9.0' ;; *) echo '[]' ;; esac");
    let rabin2 = fake_tool(
        dir,
        "rabin2",
        "case \"$1\" in\n  -v) echo 'rabin2 5.9.0' ;;\n  -I) echo '{\"info\":{\"bintype\":\"mach0\"}}' ;;\n  -l) echo '[\"/usr/lib/libobjc.A.dylib\"]' ;;\nesac",
    );
    (r2, rabin2)
}

/// Config rooted entirely inside `tmp`; `components` is the component root.
pub fn write_config(tmp: &Path, components: &Path, r2: &Path, rabin2: &Path) -> PathBuf {
    let config = json!({
        "component_roots": [components],
        "dependent_roots": [tmp.join("dependents")],
        "trusted_roots": [tmp],
        "timeouts": { "load_probe_ms": 10000 },
        "tools": {
            "radare2": r2,
            "rabin2": rabin2,
            "class_dump": tmp.join("missing").join("class-dump"),
        },
    });
    let path = tmp.join("probe.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

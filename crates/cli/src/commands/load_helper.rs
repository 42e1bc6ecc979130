use std::path::Path;

use probe_core::services::load_probe::attempt_load;

/// Child side of the load probe: load `path` in this process and print one sentinel.
/// A crash here is the signal the parent is waiting for.
pub fn load_helper_command(path: &Path) {
    println!("{}", attempt_load(path).sentinel());
}

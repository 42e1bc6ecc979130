pub mod bundles;
pub mod history;
pub mod load_helper;
pub mod run;
pub mod tools;

pub use bundles::*;
pub use history::*;
pub use load_helper::*;
pub use run::*;
pub use tools::*;

/// No component bundle was found under the configured roots.
pub const EXIT_NO_BUNDLES: u8 = 1;
/// A required external tool is missing.
pub const EXIT_MISSING_TOOL: u8 = 2;

//! Main-payload selection.
//!
//! At most one payload is chosen per bundle. Conventional locations win;
//! otherwise every Mach-O file under the bundle is a candidate, a file named
//! after the bundle is preferred, and the remaining choice is delegated to a
//! [`FallbackPolicy`].

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::diagnostics::{silent, SharedDiagnostics};
use crate::model::{Bundle, Payload};

const COMPONENT: &str = "identify";

/// 32/64-bit Mach-O in both byte orders, plus fat/universal headers.
pub const MACHO_MAGICS: [[u8; 4]; 6] = [
    [0xfe, 0xed, 0xfa, 0xce],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xca, 0xfe, 0xba, 0xbe],
    [0xbe, 0xba, 0xfe, 0xca],
];

/// True when `path` is a regular file (not a symlink) starting with a Mach-O magic.
pub fn is_macho(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_file() => {}
        _ => return false,
    }
    let mut magic = [0u8; 4];
    match fs::File::open(path).and_then(|mut f| f.read_exact(&mut magic)) {
        Ok(()) => MACHO_MAGICS.contains(&magic),
        Err(_) => false,
    }
}

/// A Mach-O file found by the recursive fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
}

/// Picks among candidates none of which carries the bundle's name.
pub type FallbackPolicy = fn(&[Candidate]) -> Option<&Candidate>;

/// Largest file wins, on the assumption that plugins and helpers shipped
/// next to the main binary are smaller. Ties go to the last maximal candidate
/// in walk order; callers must not rely on which one.
pub fn largest_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().max_by_key(|c| c.size)
}

#[derive(Clone)]
pub struct BinaryIdentifier {
    fallback: FallbackPolicy,
    diagnostics: SharedDiagnostics,
}

impl Default for BinaryIdentifier {
    fn default() -> Self {
        Self { fallback: largest_candidate, diagnostics: silent() }
    }
}

impl BinaryIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback_policy(fallback: FallbackPolicy) -> Self {
        Self { fallback, ..Self::default() }
    }

    /// Report unreadable entries met during the recursive scan.
    pub fn with_diagnostics(mut self, diagnostics: SharedDiagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Conventional payload locations, in precedence order.
    pub fn conventional_paths(bundle: &Bundle) -> [PathBuf; 3] {
        let versions = bundle.root.join("Versions");
        [
            bundle.root.join(&bundle.name),
            versions.join("A").join(&bundle.name),
            versions.join("Current").join(&bundle.name),
        ]
    }

    pub fn identify(&self, bundle: &Bundle) -> Option<Payload> {
        if let Some(path) = Self::conventional_paths(bundle).into_iter().find(|p| is_macho(p)) {
            return Some(Payload::verified(path));
        }

        let candidates = self.scan_candidates(&bundle.root);
        if let Some(named) = candidates
            .iter()
            .find(|c| c.path.file_name().and_then(|n| n.to_str()) == Some(bundle.name.as_str()))
        {
            return Some(Payload::verified(named.path.clone()));
        }
        (self.fallback)(&candidates).map(|c| Payload::verified(c.path.clone()))
    }

    /// Every Mach-O file under `root`. Unreadable subtrees are skipped with a warning.
    pub fn scan_candidates(&self, root: &Path) -> Vec<Candidate> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    self.diagnostics.warn(COMPONENT, &format!("Skipping unreadable entry: {e}"));
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_macho(entry.path()))
            .filter_map(|entry| {
                let size = entry.metadata().ok()?.len();
                Some(Candidate { path: entry.into_path(), size })
            })
            .collect()
    }
}

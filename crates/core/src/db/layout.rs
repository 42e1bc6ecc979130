use std::path::{Path, PathBuf};

/// Logical layout of a report output directory.
///
/// This is derived from a chosen root path. It does *not* perform any IO itself.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// Root directory of the output tree.
    pub root: PathBuf,
    /// Lossless JSON records (data).
    pub data_dir: PathBuf,
    /// Human-readable summaries (content/docs).
    pub docs_dir: PathBuf,
    /// Internal metadata (.probe).
    pub meta_dir: PathBuf,
    /// SQLite run index.
    pub index_path: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let data_dir = root.join("data");
        let docs_dir = root.join("content").join("docs");
        let meta_dir = root.join(".probe");
        let index_path = meta_dir.join("runs.db");
        Self { root, data_dir, docs_dir, meta_dir, index_path }
    }

    pub fn data_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.json"))
    }

    pub fn doc_path(&self, name: &str) -> PathBuf {
        self.docs_dir.join(format!("{name}.md"))
    }

    /// Path relative to `root` when possible, for storing in the index.
    pub fn relative_string(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().to_string(),
            Err(_) => path.to_string_lossy().to_string(),
        }
    }
}

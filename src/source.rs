use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where source text comes from. The compiler reads imports through this,
/// and diagnostics rendering uses it to show snippets.
pub trait SourceProvider {
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Reads from the real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystem;

impl SourceProvider for FileSystem {
    fn load(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// In-memory sources keyed by path.
impl SourceProvider for HashMap<PathBuf, String> {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such source: {}", path.display()),
            )
        })
    }
}

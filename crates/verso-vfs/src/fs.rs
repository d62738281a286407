use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Symlink resolution backend used by [`crate::PathResolver`].
///
/// Implementations perform a single blocking lookup per call and report failure as an
/// `io::Error`; callers decide whether that failure is fatal.
pub trait RealPathFs: Send + Sync {
    /// Returns the canonical absolute path for `path` with every symlink resolved.
    fn real_path(&self, path: &Path) -> io::Result<PathBuf>;
}

impl<T: RealPathFs + ?Sized> RealPathFs for &T {
    fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).real_path(path)
    }
}

impl<T: RealPathFs + ?Sized> RealPathFs for Arc<T> {
    fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).real_path(path)
    }
}

/// Local OS file system.
///
/// Uses `dunce` so Windows paths come back without the `\\?\` verbatim prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl RealPathFs for LocalFs {
    fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        dunce::canonicalize(path)
    }
}

/// In-memory symlink table.
///
/// Paths registered with [`MemoryFs::with_file`] resolve to themselves, paths registered
/// with [`MemoryFs::with_link`] resolve to their target. Everything else is `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    entries: HashMap<PathBuf, PathBuf>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.entries.insert(path.clone(), path);
        self
    }

    pub fn with_link(mut self, link: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.entries.insert(link.into(), target.into());
        self
    }
}

impl RealPathFs for MemoryFs {
    fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        self.entries.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }
}

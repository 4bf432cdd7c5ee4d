use std::env;
use std::path::{Path, PathBuf};

/// Where the app's files live and whether this is a packaged build.
///
/// The shell decides both answers (it knows how it was built and where its
/// resources were unpacked); everything in this crate only reads them.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    root: PathBuf,
    packaged: bool,
}

impl InstallLayout {
    /// A packaged build with resources unpacked under `root`.
    pub fn packaged(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            packaged: true,
        }
    }

    /// A development checkout. The dev server runs separately;
    /// `root` is only used for path resolution.
    pub fn development(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            packaged: false,
        }
    }

    /// Layout for the demo binary: packaged when NODE_SIDECAR_ROOT points at
    /// an installation root, development (current dir) otherwise.
    pub fn from_env() -> Self {
        match env::var_os("NODE_SIDECAR_ROOT") {
            Some(root) => Self::packaged(PathBuf::from(root)),
            None => Self::development(env::current_dir().unwrap_or_else(|_| PathBuf::from("."))),
        }
    }

    pub fn is_packaged(&self) -> bool {
        self.packaged
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path under the installation root for a relative path.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }
}

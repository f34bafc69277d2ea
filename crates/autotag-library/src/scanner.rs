use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use sugar_path::SugarPath;
use tracing::{debug, instrument};

use crate::extensions::{SupportedExtension, default_extensions};
use crate::traits::FileDiscovery;

/// Busca audio en el primer nivel de una carpeta, sin recursión.
#[derive(Debug, Clone)]
pub struct DirScanner {
    extensions: HashSet<SupportedExtension>,
}

impl DirScanner {
    pub fn new(extensions: impl IntoIterator<Item = SupportedExtension>) -> Self {
        DirScanner {
            extensions: extensions.into_iter().collect(),
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        let hidden = path
            .file_name()
            .and_then(OsStr::to_str)
            .is_none_or(|name| name.starts_with('.'));
        if hidden {
            return false;
        }

        path.extension()
            .and_then(OsStr::to_str)
            .and_then(|e| SupportedExtension::from_str(e).ok())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}

impl Default for DirScanner {
    fn default() -> Self {
        Self::new(default_extensions())
    }
}

impl FileDiscovery for DirScanner {
    #[instrument(skip(self), fields(folder = %folder.display()))]
    fn discover(&self, folder: &Path) -> Result<Vec<PathBuf>> {
        let root = normalize_path(folder.to_path_buf())
            .with_context(|| format!("data folder not found: {}", folder.display()))?;
        if !root.is_dir() {
            bail!("data folder is not a directory: {}", root.display());
        }

        let mut files = Vec::new();
        let entries = std::fs::read_dir(&root).with_context(|| format!("cannot list {}", root.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("cannot list {}", root.display()))?;
            // rutas bajo la carpeta tal como se configuró, no la canónica
            let path = folder.join(entry.file_name());
            if path.is_file() && self.accepts(&path) {
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!(count = files.len(), "ficheros encontrados");
        Ok(files)
    }
}

pub fn normalize_path(p: PathBuf) -> Option<PathBuf> {
    let abs = p.absolutize();

    #[cfg(target_os = "windows")]
    let canon_res = dunce::canonicalize(&abs);

    #[cfg(not(target_os = "windows"))]
    let canon_res = std::fs::canonicalize(&abs);

    canon_res.ok()
}

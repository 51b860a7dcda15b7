//! Relative document paths
//!
//! The database only ever stores paths relative to the data directory, with
//! `/` separators. They are turned back into absolute paths at point of use.

use miette::Result;
use std::path::{Component, Path, PathBuf};

use crate::core::error::CatalogError;

/// The directory that attached documents are stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert an absolute (or cwd-relative) path to the stored form
    pub fn to_relative(&self, path: &Path) -> Result<String> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        let absolute = normalize(&absolute);

        let relative = absolute
            .strip_prefix(&self.root)
            .map_err(|_| CatalogError::OutsideDataDir {
                path: absolute.clone(),
                data_dir: self.root.clone(),
            })?;

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        if parts.is_empty() {
            return Err(CatalogError::OutsideDataDir {
                path: absolute,
                data_dir: self.root.clone(),
            }
            .into());
        }

        Ok(parts.join("/"))
    }

    /// Resolve a stored path to an absolute one
    ///
    /// Accepts `\` separators as written by older Windows exports. Stored
    /// values that are already absolute are returned unchanged.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let unified = stored.trim().replace('\\', "/");
        let as_path = Path::new(&unified);
        if as_path.is_absolute() {
            return as_path.to_path_buf();
        }

        let mut out = self.root.clone();
        for part in unified.split('/').filter(|p| !p.is_empty() && *p != ".") {
            out.push(part);
        }
        normalize(&out)
    }

    /// Whether the stored path points at an existing file
    pub fn exists(&self, stored: &str) -> bool {
        self.resolve(stored).is_file()
    }
}

/// Lexically normalize a path: drop `.` and fold `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_dir() -> (tempfile::TempDir, DataDir) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::new(tmp.path());
        (tmp, dir)
    }

    #[test]
    fn test_round_trip() {
        let (tmp, dir) = data_dir();
        let abs = tmp.path().join("documents").join("fiches").join("porte EI30.pdf");

        let rel = dir.to_relative(&abs).unwrap();
        assert_eq!(rel, "documents/fiches/porte EI30.pdf");
        assert_eq!(dir.resolve(&rel), abs);
    }

    #[test]
    fn test_outside_is_rejected() {
        let (_tmp, dir) = data_dir();
        let other = tempfile::tempdir().unwrap();
        let err = dir.to_relative(&other.path().join("x.pdf")).unwrap_err();
        assert!(err.to_string().contains("outside the data directory"));
    }

    #[test]
    fn test_root_itself_is_rejected() {
        let (tmp, dir) = data_dir();
        assert!(dir.to_relative(tmp.path()).is_err());
    }

    #[test]
    fn test_dot_dot_is_folded() {
        let (tmp, dir) = data_dir();
        let sneaky = tmp.path().join("a").join("..").join("b.pdf");
        assert_eq!(dir.to_relative(&sneaky).unwrap(), "b.pdf");
    }

    #[test]
    fn test_resolve_backslashes() {
        let (tmp, dir) = data_dir();
        assert_eq!(
            dir.resolve(r"documents\devis\D-001.pdf"),
            tmp.path().join("documents").join("devis").join("D-001.pdf")
        );
    }

    #[test]
    fn test_exists() {
        let (tmp, dir) = data_dir();
        std::fs::write(tmp.path().join("f.pdf"), b"%PDF").unwrap();
        assert!(dir.exists("f.pdf"));
        assert!(!dir.exists("missing.pdf"));
    }
}

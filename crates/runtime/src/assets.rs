//! Template loading.

use std::path::{Component, Path, PathBuf};

use crate::directory::WIDGET_TEMPLATE;
use crate::{Error, Result};

const BUILTIN_WIDGET: &str = include_str!("../assets/widget.html");

/// Serves static templates by path.
pub trait AssetLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<Vec<u8>>;
}

/// Templates compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedAssets;

impl AssetLoader for EmbeddedAssets {
    fn load(&self, path: &str) -> Result<Vec<u8>> {
        match path {
            WIDGET_TEMPLATE => Ok(BUILTIN_WIDGET.as_bytes().to_vec()),
            _ => Err(Error::Asset {
                path: PathBuf::from(path),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

/// Templates read from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::AssetPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetLoader for FsAssetLoader {
    fn load(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        std::fs::read(&full).map_err(|source| Error::Asset { path: full, source })
    }
}

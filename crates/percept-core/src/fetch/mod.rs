//! Resource fetching: source descriptors resolved to local cache paths.
//!
//! The resolver owns two purpose-scoped cache directories under one private
//! cache root, one for model files and one for media assets, populated
//! lazily and never pruned by this subsystem. Cached files are trusted by existence
//! (remote, bundle) or by byte length (local copies); see the integrity
//! policy note in DESIGN.md.

mod download;
mod source;

pub use download::Downloader;
pub use source::FileSource;

use crate::config::PathsConfig;
use crate::error::{PerceptError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which cache namespace a resolved file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePurpose {
    /// Model files consumed by engine construction.
    Models,
    /// Media assets consumed by inference calls.
    Assets,
}

impl CachePurpose {
    pub fn dir_name(&self) -> &'static str {
        match self {
            CachePurpose::Models => PathsConfig::MODELS_DIR_NAME,
            CachePurpose::Assets => PathsConfig::ASSETS_DIR_NAME,
        }
    }
}

/// Resolves [`FileSource`] descriptors into usable local file paths.
pub struct FileResolver {
    cache_root: PathBuf,
    /// Root directory of bundled (application-shipped) assets, if any.
    bundle_root: Option<PathBuf>,
    downloader: Downloader,
}

impl FileResolver {
    /// Create a resolver with an explicit private cache root.
    pub fn new(cache_root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            cache_root: cache_root.into(),
            bundle_root: None,
            downloader: Downloader::new()?,
        })
    }

    /// Create a resolver rooted at the platform cache directory
    /// (e.g. `~/.cache/percept` on Linux).
    pub fn with_default_cache_root() -> Result<Self> {
        let base = dirs::cache_dir().ok_or_else(|| PerceptError::Config {
            message: "Could not determine platform cache directory".to_string(),
        })?;
        Self::new(base.join(PathsConfig::CACHE_ROOT_DIR_NAME))
    }

    /// Set the directory bundle-relative sources are copied from.
    pub fn with_bundle_root(mut self, bundle_root: impl Into<PathBuf>) -> Self {
        self.bundle_root = Some(bundle_root.into());
        self
    }

    /// The private cache root this resolver owns.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Directory where segmentation masks are written. Created lazily.
    pub async fn masks_dir(&self) -> Result<PathBuf> {
        let dir = self
            .cache_root
            .join(PathsConfig::ASSETS_DIR_NAME)
            .join(PathsConfig::MASKS_DIR_NAME);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PerceptError::io_with_path(e, &dir))?;
        Ok(dir)
    }

    /// Resolve a source descriptor to a local file path inside the
    /// purpose-scoped cache directory (or, for local sources already under
    /// the cache root, the original path).
    pub async fn resolve(&self, source: &FileSource, purpose: CachePurpose) -> Result<PathBuf> {
        let cache_dir = self.cache_root.join(purpose.dir_name());

        match source {
            FileSource::Remote {
                uri,
                headers,
                sha256,
            } => {
                let destination = cache_dir.join(source.cache_file_name()?);
                if file_exists(&destination).await {
                    debug!("Cache hit for {}", source.describe());
                    return Ok(destination);
                }
                info!("Downloading {} to {}", uri, destination.display());
                self.downloader
                    .download(uri, &destination, headers, sha256.as_deref())
                    .await?;
                Ok(destination)
            }

            FileSource::Bundle { path } => {
                let destination = cache_dir.join(source.cache_file_name()?);
                // Bundle assets are immutable; an existing copy is always valid.
                if file_exists(&destination).await {
                    debug!("Cache hit for {}", source.describe());
                    return Ok(destination);
                }
                let bundle_root = self.bundle_root.as_ref().ok_or_else(|| {
                    PerceptError::Config {
                        message: format!(
                            "No bundle root configured; cannot resolve {}",
                            source.describe()
                        ),
                    }
                })?;
                let origin = bundle_root.join(path);
                self.copy_into_cache(&origin, &destination).await?;
                Ok(destination)
            }

            FileSource::Local { path } => {
                // Paths already inside the private cache root are returned
                // as-is: no redundant copy, and the engine keeps write access
                // for its own on-disk caching.
                if path.starts_with(&self.cache_root) {
                    debug!("Short-circuit for {}", source.describe());
                    return Ok(path.clone());
                }

                let origin_len = file_len(path).await.ok_or_else(|| {
                    PerceptError::resolution("source file does not exist", path)
                })?;

                let destination = cache_dir.join(source.cache_file_name()?);
                if let Some(cached_len) = file_len(&destination).await {
                    // Same name and same byte length: assumed to be the same
                    // file.
                    if cached_len == origin_len {
                        debug!("Cache hit for {}", source.describe());
                        return Ok(destination);
                    }
                }
                self.copy_into_cache(path, &destination).await?;
                Ok(destination)
            }
        }
    }

    async fn copy_into_cache(&self, origin: &Path, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PerceptError::io_with_path(e, parent))?;
        }

        info!("Copying {} to {}", origin.display(), destination.display());
        match tokio::fs::copy(origin, destination).await {
            Ok(_) => Ok(()),
            Err(e) => {
                // Never leave a truncated file behind.
                let _ = tokio::fs::remove_file(destination).await;
                Err(PerceptError::resolution(
                    format!("copy failed: {e}"),
                    origin,
                ))
            }
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn file_len(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

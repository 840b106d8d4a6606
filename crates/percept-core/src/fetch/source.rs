//! Declarative source descriptors for models and media assets.
//!
//! A [`FileSource`] says where a file comes from, not where it lives locally.
//! The resolver turns it into a usable path. Sources are immutable values
//! compared structurally; the module cache uses that equality to decide
//! whether a re-initialize is a no-op.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PerceptError, Result};

/// Where a model or media asset comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileSource {
    /// A remote HTTP(S) resource, downloaded on first use.
    Remote {
        uri: String,
        /// Request headers forwarded verbatim (authenticated fetches).
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        headers: Vec<(String, String)>,
        /// Expected SHA256 of the downloaded bytes, verified after a fresh
        /// download. Cached hits are not re-hashed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
    },
    /// A path relative to the configured bundle root (immutable, shipped with
    /// the host application).
    Bundle { path: PathBuf },
    /// An absolute path on the local filesystem.
    Local { path: PathBuf },
}

impl FileSource {
    /// Remote source without headers or digest.
    pub fn remote(uri: impl Into<String>) -> Self {
        FileSource::Remote {
            uri: uri.into(),
            headers: Vec::new(),
            sha256: None,
        }
    }

    /// Remote source with request headers.
    pub fn remote_with_headers(
        uri: impl Into<String>,
        headers: Vec<(String, String)>,
    ) -> Self {
        FileSource::Remote {
            uri: uri.into(),
            headers,
            sha256: None,
        }
    }

    /// Bundle-relative source.
    pub fn bundle(path: impl Into<PathBuf>) -> Self {
        FileSource::Bundle { path: path.into() }
    }

    /// Local absolute-path source.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        FileSource::Local { path: path.into() }
    }

    /// Attach an expected SHA256 digest to a remote source. No-op for bundle
    /// and local sources.
    pub fn with_sha256(self, digest: impl Into<String>) -> Self {
        match self {
            FileSource::Remote { uri, headers, .. } => FileSource::Remote {
                uri,
                headers,
                sha256: Some(digest.into()),
            },
            other => other,
        }
    }

    /// The file name this source occupies in the cache directory.
    ///
    /// Remote URIs use the last path segment; bundle and local sources use
    /// their file name. Query strings and fragments never leak into the name.
    pub fn cache_file_name(&self) -> Result<String> {
        match self {
            FileSource::Remote { uri, .. } => {
                let parsed = url::Url::parse(uri).map_err(|e| {
                    PerceptError::resolution(format!("invalid URI: {e}"), uri)
                })?;
                let name = parsed
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                name.ok_or_else(|| {
                    PerceptError::resolution("URI has no file name component", uri)
                })
            }
            FileSource::Bundle { path } | FileSource::Local { path } => file_name_of(path),
        }
    }

    /// Short human-readable description for log messages.
    pub fn describe(&self) -> String {
        match self {
            FileSource::Remote { uri, .. } => format!("remote:{uri}"),
            FileSource::Bundle { path } => format!("bundle:{}", path.display()),
            FileSource::Local { path } => format!("local:{}", path.display()),
        }
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| PerceptError::resolution("path has no file name component", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_cache_name_strips_query() {
        let source = FileSource::remote("https://example.com/models/classifier.tflite?token=abc");
        assert_eq!(source.cache_file_name().unwrap(), "classifier.tflite");
    }

    #[test]
    fn test_remote_cache_name_rejects_bare_host() {
        let source = FileSource::remote("https://example.com/");
        assert!(source.cache_file_name().is_err());
    }

    #[test]
    fn test_bundle_cache_name() {
        let source = FileSource::bundle("assets/detector.tflite");
        assert_eq!(source.cache_file_name().unwrap(), "detector.tflite");
    }

    #[test]
    fn test_structural_equality_detects_option_change() {
        let a = FileSource::remote("https://example.com/m.tflite");
        let b = FileSource::remote("https://example.com/m.tflite");
        let c = FileSource::remote("https://example.com/m.tflite").with_sha256("ab");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_serde_roundtrip() {
        let source = FileSource::remote_with_headers(
            "https://example.com/m.tflite",
            vec![("Authorization".into(), "Bearer x".into())],
        );
        let json = serde_json::to_string(&source).unwrap();
        let back: FileSource = serde_json::from_str(&json).unwrap();
        assert_eq!(source, back);
    }
}

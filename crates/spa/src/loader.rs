// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::manifest::{ImportGraphError, Manifest};

/// Where the bundler writes its manifest, relative to the output directory
pub const MANIFEST_FILE: &str = ".vite/manifest.json";

/// Failed to load the assets manifest.
///
/// All of those mean the deployed build is unusable, and should stop the
/// process from starting.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The manifest does not exist, usually because the frontend was not built
    #[error("assets manifest not found at {path}, was the frontend built?")]
    ManifestMissing {
        /// Where the manifest was expected
        path: Utf8PathBuf,

        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The manifest exists but could not be read
    #[error("failed to read the assets manifest at {path}")]
    ManifestRead {
        /// Path of the manifest
        path: Utf8PathBuf,

        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The manifest does not match the expected schema
    #[error("invalid assets manifest at {path}")]
    ManifestMalformed {
        /// Path of the manifest
        path: Utf8PathBuf,

        /// What is wrong with it
        #[source]
        source: MalformedManifest,
    },

    /// The import graph of the manifest has a cycle
    #[error("assets manifest at {path} has an import cycle through {entry:?}")]
    ManifestCyclic {
        /// Path of the manifest
        path: Utf8PathBuf,

        /// The entry found twice on the same import path
        entry: String,
    },
}

/// Reason why a manifest is malformed
#[derive(Debug, Error)]
pub enum MalformedManifest {
    /// Not valid JSON, or not the expected shape
    #[error(transparent)]
    Syntax(#[from] serde_json::Error),

    /// An entry imports a key absent from the manifest
    #[error("{importer:?} imports {import:?}, which is not in the manifest")]
    MissingImport {
        /// The entry declaring the import
        importer: String,

        /// The missing manifest key
        import: String,
    },
}

/// Something able to read the raw bytes of a manifest
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Read the manifest at the given path
    async fn read(&self, path: &Utf8Path) -> std::io::Result<Vec<u8>>;
}

/// Reads manifests from the filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSource;

#[async_trait]
impl ManifestSource for FsSource {
    async fn read(&self, path: &Utf8Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

/// Loads the assets manifest once, and hands out the same instance
/// afterwards.
///
/// Concurrent callers of [`ManifestLoader::load`] wait for the first one to
/// finish instead of reading the file again. A failed load is not cached.
#[derive(Debug)]
pub struct ManifestLoader<S = FsSource> {
    path: Utf8PathBuf,
    source: S,
    manifest: OnceCell<Arc<Manifest>>,
}

impl ManifestLoader {
    /// Create a loader reading the manifest at `path` from the filesystem
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self::with_source(path, FsSource)
    }

    /// Create a loader reading the manifest from the given bundler output
    /// directory
    #[must_use]
    pub fn in_output_dir(output: &Utf8Path) -> Self {
        Self::new(output.join(MANIFEST_FILE))
    }
}

impl<S: ManifestSource> ManifestLoader<S> {
    /// Create a loader reading the manifest at `path` through `source`
    #[must_use]
    pub fn with_source(path: impl Into<Utf8PathBuf>, source: S) -> Self {
        Self {
            path: path.into(),
            source,
            manifest: OnceCell::new(),
        }
    }

    /// The path of the manifest this loader reads
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Get the manifest, reading and validating it on the first call
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest is missing, unreadable, malformed or
    /// has an import cycle.
    #[tracing::instrument(
        name = "assets.manifest.load",
        skip_all,
        fields(path = %self.path),
        err,
    )]
    pub async fn load(&self) -> Result<Arc<Manifest>, LoadError> {
        let manifest = self
            .manifest
            .get_or_try_init(|| self.read_and_parse())
            .await?;

        Ok(Arc::clone(manifest))
    }

    async fn read_and_parse(&self) -> Result<Arc<Manifest>, LoadError> {
        debug!("Reading assets manifest");
        let raw = self.source.read(&self.path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoadError::ManifestMissing {
                    path: self.path.clone(),
                    source,
                }
            } else {
                LoadError::ManifestRead {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let manifest: Manifest =
            serde_json::from_slice(&raw).map_err(|e| LoadError::ManifestMalformed {
                path: self.path.clone(),
                source: e.into(),
            })?;

        manifest.validate().map_err(|e| match e {
            ImportGraphError::Cyclic { entry } => LoadError::ManifestCyclic {
                path: self.path.clone(),
                entry,
            },
            ImportGraphError::MissingImport { importer, import } => LoadError::ManifestMalformed {
                path: self.path.clone(),
                source: MalformedManifest::MissingImport { importer, import },
            },
        })?;

        info!(
            chunks = manifest.len(),
            entry_points = manifest.entry_points().count(),
            "Loaded assets manifest"
        );

        Ok(Arc::new(manifest))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;

    use super::*;

    /// An in-memory manifest source counting how many times it was read
    #[derive(Debug, Default)]
    struct CountingSource {
        contents: Option<&'static str>,
        reads: AtomicUsize,
    }

    impl CountingSource {
        fn new(contents: &'static str) -> Self {
            Self {
                contents: Some(contents),
                reads: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ManifestSource for CountingSource {
        async fn read(&self, _path: &Utf8Path) -> std::io::Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            // Give concurrent callers a chance to pile up
            tokio::task::yield_now().await;
            self.contents
                .map(|c| c.as_bytes().to_vec())
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }
    }

    const MANIFEST: &str = r#"{
        "src/main.ts": {
            "file": "assets/main-BRBmoGS9.js",
            "isEntry": true,
            "css": ["assets/main-5UjPuW-k.css"]
        }
    }"#;

    #[tokio::test]
    async fn load_once() {
        let loader = ManifestLoader::with_source("manifest.json", CountingSource::new(MANIFEST));

        let first = loader.load().await.unwrap();
        let second = loader.load().await.unwrap();

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.source.reads(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_once_concurrently() {
        let loader = Arc::new(ManifestLoader::with_source(
            "manifest.json",
            CountingSource::new(MANIFEST),
        ));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let loader = Arc::clone(&loader);
                tokio::spawn(async move { loader.load().await.unwrap() })
            })
            .collect();

        let mut manifests = Vec::new();
        for handle in handles {
            manifests.push(handle.await.unwrap());
        }

        assert_eq!(loader.source.reads(), 1);
        for manifest in &manifests {
            assert!(Arc::ptr_eq(manifest, &manifests[0]));
        }
    }

    #[tokio::test]
    async fn missing_manifest() {
        let loader = ManifestLoader::with_source("dist/.vite/manifest.json", CountingSource::default());
        let err = loader.load().await.unwrap_err();
        assert_matches!(err, LoadError::ManifestMissing { path, .. } if path == "dist/.vite/manifest.json");
    }

    #[tokio::test]
    async fn missing_manifest_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let output = Utf8Path::from_path(dir.path()).unwrap();
        let loader = ManifestLoader::in_output_dir(output);
        assert_eq!(loader.path(), output.join(".vite/manifest.json"));

        let err = loader.load().await.unwrap_err();
        assert_matches!(err, LoadError::ManifestMissing { .. });
    }

    #[tokio::test]
    async fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let output = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::create_dir(output.join(".vite")).unwrap();
        std::fs::write(output.join(MANIFEST_FILE), MANIFEST).unwrap();

        let loader = ManifestLoader::in_output_dir(output);
        let manifest = loader.load().await.unwrap();
        assert_eq!(
            manifest.get("src/main.ts").unwrap().file,
            "assets/main-BRBmoGS9.js"
        );
    }

    #[tokio::test]
    async fn malformed_manifest() {
        let loader = ManifestLoader::with_source("manifest.json", CountingSource::new("not json"));
        let err = loader.load().await.unwrap_err();
        assert_matches!(
            err,
            LoadError::ManifestMalformed {
                source: MalformedManifest::Syntax(_),
                ..
            }
        );

        // Missing the required `file` field
        let loader = ManifestLoader::with_source(
            "manifest.json",
            CountingSource::new(r#"{ "src/main.ts": { "isEntry": true } }"#),
        );
        let err = loader.load().await.unwrap_err();
        assert_matches!(err, LoadError::ManifestMalformed { .. });

        // Wrong value type
        let loader = ManifestLoader::with_source(
            "manifest.json",
            CountingSource::new(r#"{ "src/main.ts": { "file": "main.js", "css": "main.css" } }"#),
        );
        let err = loader.load().await.unwrap_err();
        assert_matches!(err, LoadError::ManifestMalformed { .. });
    }

    #[tokio::test]
    async fn dangling_import() {
        let loader = ManifestLoader::with_source(
            "manifest.json",
            CountingSource::new(
                r#"{ "src/main.ts": { "file": "main.js", "isEntry": true, "imports": ["_gone.js"] } }"#,
            ),
        );
        let err = loader.load().await.unwrap_err();
        assert_matches!(
            err,
            LoadError::ManifestMalformed {
                source: MalformedManifest::MissingImport { importer, import },
                ..
            } if importer == "src/main.ts" && import == "_gone.js"
        );
    }

    #[tokio::test]
    async fn cyclic_manifest() {
        let loader = ManifestLoader::with_source(
            "manifest.json",
            CountingSource::new(
                r#"{
                    "a.ts": { "file": "a.js", "isEntry": true, "imports": ["b.ts"] },
                    "b.ts": { "file": "b.js", "imports": ["a.ts"] }
                }"#,
            ),
        );
        let err = loader.load().await.unwrap_err();
        assert_matches!(err, LoadError::ManifestCyclic { entry, .. } if entry == "a.ts");
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let loader = ManifestLoader::with_source("manifest.json", CountingSource::default());
        loader.load().await.unwrap_err();
        loader.load().await.unwrap_err();
        assert_eq!(loader.source.reads(), 2);
    }
}

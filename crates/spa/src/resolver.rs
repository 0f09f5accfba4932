// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{fmt, str::FromStr, sync::Arc};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::manifest::{ImportGraphError, Manifest};

/// The configuration of the assets is invalid
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The dev server origin is not an absolute HTTP(S) URL
    #[error("invalid dev server origin {origin:?}: {reason}")]
    InvalidOrigin {
        /// The offending origin
        origin: String,

        /// What is wrong with it
        reason: &'static str,
    },

    /// The public base path can't prefix URLs
    #[error("invalid public base path {path:?}: {reason}")]
    InvalidBasePath {
        /// The offending base path
        path: String,

        /// What is wrong with it
        reason: &'static str,
    },
}

/// Failed to resolve an entry point
///
/// [`ResolveError::EntryNotFound`] and [`ResolveError::NotAnEntry`] mean the
/// views reference something the last build did not produce. They only
/// affect the render asking for that entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The entry is not in the manifest
    #[error("entry point {entry:?} does not exist in the assets manifest")]
    EntryNotFound {
        /// The requested entry
        entry: String,
    },

    /// The entry is in the manifest, but only as an internal chunk
    #[error("{entry:?} is not an entry point in the assets manifest")]
    NotAnEntry {
        /// The requested entry
        entry: String,
    },

    /// Following the imports of the entry loops forever
    #[error("import cycle through {through:?} while resolving {entry:?}")]
    ManifestCyclic {
        /// The requested entry
        entry: String,

        /// The chunk found twice on the same import path
        through: String,
    },

    /// The entry imports a chunk which is not in the manifest
    #[error("{importer:?} imports {import:?}, which is not in the assets manifest")]
    MissingImport {
        /// The chunk declaring the import
        importer: String,

        /// The missing manifest key
        import: String,
    },
}

/// Which way the assets are served, without the data attached to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    /// Assets come live from the bundler dev server
    Development,

    /// Assets come from the hashed output of a build
    Production,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// How the assets are served, for the lifetime of the process
#[derive(Debug, Clone)]
pub enum AssetMode {
    /// Everything is served by the bundler dev server
    Development {
        /// Where the dev server is reachable
        origin: Url,
    },

    /// Everything is served from the build output, as described by the
    /// manifest
    Production {
        /// The manifest of the build
        manifest: Arc<Manifest>,
    },
}

impl AssetMode {
    /// Serve assets from the dev server at the given origin
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not an absolute HTTP(S) URL without
    /// query or fragment.
    pub fn development(origin: Url) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidOrigin {
            origin: origin.to_string(),
            reason,
        };

        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }

        if origin.host().is_none() {
            return Err(invalid("missing host"));
        }

        if origin.query().is_some() || origin.fragment().is_some() {
            return Err(invalid("must not have a query or a fragment"));
        }

        Ok(Self::Development { origin })
    }

    /// Serve assets from a build described by the given manifest
    #[must_use]
    pub fn production(manifest: Arc<Manifest>) -> Self {
        Self::Production { manifest }
    }

    /// The kind of this mode
    #[must_use]
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Development { .. } => ModeKind::Development,
            Self::Production { .. } => ModeKind::Production,
        }
    }
}

/// The prefix under which the build output is served, always starting and
/// ending with a `/`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasePath(String);

impl Default for BasePath {
    fn default() -> Self {
        Self("/".to_owned())
    }
}

impl BasePath {
    /// Check and normalize a base path
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or has a query, a
    /// fragment, a `..` segment or whitespace.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidBasePath {
            path: path.to_owned(),
            reason,
        };

        if !path.starts_with('/') {
            return Err(invalid("must start with a '/'"));
        }

        if path.starts_with("//") {
            return Err(invalid("must not start with '//'"));
        }

        if path.contains(['?', '#']) {
            return Err(invalid("must not have a query or a fragment"));
        }

        if path.contains(char::is_whitespace) {
            return Err(invalid("must not contain whitespace"));
        }

        if path.split('/').any(|segment| segment == "..") {
            return Err(invalid("must not contain '..' segments"));
        }

        Ok(Self(format!("{}/", path.trim_end_matches('/'))))
    }

    /// The base path, ending with a `/`
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix a path relative to the output directory
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path.trim_start_matches('/'))
    }
}

impl FromStr for BasePath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every URL needed to load one entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    entry: String,
    mode: ModeKind,
    script: String,
    styles: Vec<String>,
    imported_styles: Vec<String>,
    preloads: Vec<String>,
}

impl ResolvedAsset {
    /// The logical name this was resolved from
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// The mode this was resolved in
    #[must_use]
    pub fn mode(&self) -> ModeKind {
        self.mode
    }

    /// URL of the entry script
    #[must_use]
    pub fn script(&self) -> &str {
        &self.script
    }

    /// URLs of the stylesheets of the entry itself, in manifest order
    #[must_use]
    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    /// URLs of the stylesheets of the chunks imported by the entry
    #[must_use]
    pub fn imported_styles(&self) -> &[String] {
        &self.imported_styles
    }

    /// URLs of the chunks to preload, in the order they are first imported
    #[must_use]
    pub fn preloads(&self) -> &[String] {
        &self.preloads
    }
}

/// Turns logical entry names into URLs
#[derive(Debug, Clone)]
pub struct AssetResolver {
    mode: AssetMode,
    base_path: BasePath,
}

impl AssetResolver {
    /// Create a resolver for the given mode, serving the build output under
    /// `base_path`
    #[must_use]
    pub fn new(mode: AssetMode, base_path: BasePath) -> Self {
        Self { mode, base_path }
    }

    /// The mode this resolver works in
    #[must_use]
    pub fn mode(&self) -> &AssetMode {
        &self.mode
    }

    /// The base path of the build output
    #[must_use]
    pub fn base_path(&self) -> &BasePath {
        &self.base_path
    }

    /// Resolve a logical entry, like `src/main.ts`, into the URLs needed to
    /// load it
    ///
    /// # Errors
    ///
    /// In production, returns an error if the entry is not an entry point of
    /// the manifest, or if its imports can't be followed.
    #[tracing::instrument(
        name = "assets.resolve",
        level = "debug",
        skip(self),
        fields(mode = %self.mode.kind()),
        err,
    )]
    pub fn resolve(&self, entry: &str) -> Result<ResolvedAsset, ResolveError> {
        match &self.mode {
            AssetMode::Development { origin } => Ok(ResolvedAsset {
                entry: entry.to_owned(),
                mode: ModeKind::Development,
                script: dev_server_url(origin, entry),
                styles: Vec::new(),
                imported_styles: Vec::new(),
                preloads: Vec::new(),
            }),

            AssetMode::Production { manifest } => {
                let chunk = manifest
                    .get(entry)
                    .ok_or_else(|| ResolveError::EntryNotFound {
                        entry: entry.to_owned(),
                    })?;

                if !chunk.is_entry {
                    return Err(ResolveError::NotAnEntry {
                        entry: entry.to_owned(),
                    });
                }

                let styles: Vec<String> =
                    chunk.css.iter().map(|css| self.base_path.join(css)).collect();

                let mut preloads = IndexSet::new();
                let mut imported_styles = IndexSet::new();
                manifest
                    .walk_imports(entry, |_, imported| {
                        if imported.file != chunk.file {
                            preloads.insert(imported.file.as_str());
                        }
                        imported_styles.extend(imported.css.iter().map(String::as_str));
                    })
                    .map_err(|e| match e {
                        ImportGraphError::Cyclic { entry: through } => {
                            ResolveError::ManifestCyclic {
                                entry: entry.to_owned(),
                                through,
                            }
                        }
                        ImportGraphError::MissingImport { importer, import } => {
                            ResolveError::MissingImport { importer, import }
                        }
                    })?;

                let imported_styles = imported_styles
                    .into_iter()
                    .filter(|css| !chunk.css.iter().any(|own| own.as_str() == *css))
                    .map(|css| self.base_path.join(css))
                    .collect();

                Ok(ResolvedAsset {
                    entry: entry.to_owned(),
                    mode: ModeKind::Production,
                    script: self.base_path.join(&chunk.file),
                    styles,
                    imported_styles,
                    preloads: preloads
                        .into_iter()
                        .map(|file| self.base_path.join(file))
                        .collect(),
                })
            }
        }
    }

    /// URL of the primary file of any chunk, entry point or not
    ///
    /// # Errors
    ///
    /// In production, returns an error if the key is not in the manifest.
    pub fn asset_path(&self, key: &str) -> Result<String, ResolveError> {
        match &self.mode {
            AssetMode::Development { origin } => Ok(dev_server_url(origin, key)),
            AssetMode::Production { manifest } => manifest
                .get(key)
                .map(|chunk| self.base_path.join(&chunk.file))
                .ok_or_else(|| ResolveError::EntryNotFound {
                    entry: key.to_owned(),
                }),
        }
    }

    /// URL of a file copied as-is from the public directory
    #[must_use]
    pub fn public_path(&self, path: &str) -> String {
        self.base_path.join(path.trim())
    }

    /// Keys of every entry point of the manifest. Always empty in
    /// development.
    #[must_use]
    pub fn entry_points(&self) -> Vec<&str> {
        match &self.mode {
            AssetMode::Development { .. } => Vec::new(),
            AssetMode::Production { manifest } => manifest.entry_points().collect(),
        }
    }
}

/// Join a source path to the dev server origin, as-is
pub(crate) fn dev_server_url(origin: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        origin.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

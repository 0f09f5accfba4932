// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use camino::{Utf8Path, Utf8PathBuf};
use portal_spa::{BasePath, DEFAULT_HASHED_DIR, MANIFEST_FILE, ModeKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigurationSection;

const DEFAULT_OUTPUT_DIR: &str = "./dist";
const DEFAULT_PUBLIC_DIR: &str = "./public";
const DEFAULT_BASE_PATH: &str = "/";

fn default_output_dir() -> Utf8PathBuf {
    DEFAULT_OUTPUT_DIR.into()
}

fn is_default_output_dir(value: &Utf8Path) -> bool {
    value.as_str() == DEFAULT_OUTPUT_DIR
}

fn default_hashed_dir() -> String {
    DEFAULT_HASHED_DIR.to_owned()
}

fn is_default_hashed_dir(value: &str) -> bool {
    value == DEFAULT_HASHED_DIR
}

fn default_public_dir() -> Utf8PathBuf {
    DEFAULT_PUBLIC_DIR.into()
}

fn is_default_public_dir(value: &Utf8Path) -> bool {
    value.as_str() == DEFAULT_PUBLIC_DIR
}

fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_owned()
}

fn is_default_base_path(value: &str) -> bool {
    value == DEFAULT_BASE_PATH
}

fn default_dev_server() -> Url {
    Url::parse("http://localhost:5173/").unwrap()
}

fn is_default_dev_server(value: &Url) -> bool {
    *value == default_dev_server()
}

/// How the frontend assets are served
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssetsMode {
    /// Load the assets live from the Vite dev server
    Development,

    /// Load the assets from the output of `vite build`
    #[default]
    Production,
}

impl AssetsMode {
    /// Interpret the `NODE_ENV` convention of the frontend tooling: only
    /// `production` selects the build output
    #[must_use]
    pub fn from_node_env(node_env: &str) -> Self {
        if node_env.trim() == "production" {
            Self::Production
        } else {
            Self::Development
        }
    }
}

impl From<AssetsMode> for ModeKind {
    fn from(mode: AssetsMode) -> Self {
        match mode {
            AssetsMode::Development => Self::Development,
            AssetsMode::Production => Self::Production,
        }
    }
}

/// Configuration related to the frontend assets
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct AssetsConfig {
    /// Whether to use the Vite dev server or the build output. Also set by
    /// the `NODE_ENV` environment variable.
    #[serde(default)]
    pub mode: AssetsMode,

    /// Directory where `vite build` writes its output. Should match
    /// `build.outDir` in the Vite config.
    #[serde(
        default = "default_output_dir",
        skip_serializing_if = "is_default_output_dir"
    )]
    #[schemars(with = "String")]
    pub output_dir: Utf8PathBuf,

    /// Path to the manifest written by `vite build`. Defaults to
    /// `.vite/manifest.json` in the output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub manifest: Option<Utf8PathBuf>,

    /// Directory of the hashed files, relative to the output directory. They
    /// are cached as immutable, everything else is revalidated. Should match
    /// `build.assetsDir` in the Vite config.
    #[serde(
        default = "default_hashed_dir",
        skip_serializing_if = "is_default_hashed_dir"
    )]
    pub assets_dir: String,

    /// Directory of the files served as-is in development. Should match
    /// `publicDir` in the Vite config.
    #[serde(
        default = "default_public_dir",
        skip_serializing_if = "is_default_public_dir"
    )]
    #[schemars(with = "String")]
    pub public_dir: Utf8PathBuf,

    /// Path under which the assets are served
    #[serde(
        default = "default_base_path",
        skip_serializing_if = "is_default_base_path"
    )]
    pub base_path: String,

    /// Where the Vite dev server listens, only used in development
    #[serde(
        default = "default_dev_server",
        skip_serializing_if = "is_default_dev_server"
    )]
    pub dev_server: Url,

    /// Entry points referenced by the views, checked by `assets check`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            mode: AssetsMode::default(),
            output_dir: default_output_dir(),
            manifest: None,
            assets_dir: default_hashed_dir(),
            public_dir: default_public_dir(),
            base_path: default_base_path(),
            dev_server: default_dev_server(),
            entries: Vec::new(),
        }
    }
}

impl AssetsConfig {
    /// Returns true if the configuration is the default one
    pub(crate) fn is_default(&self) -> bool {
        self.mode == AssetsMode::default()
            && is_default_output_dir(&self.output_dir)
            && self.manifest.is_none()
            && is_default_hashed_dir(&self.assets_dir)
            && is_default_public_dir(&self.public_dir)
            && is_default_base_path(&self.base_path)
            && is_default_dev_server(&self.dev_server)
            && self.entries.is_empty()
    }

    /// Path of the Vite manifest
    #[must_use]
    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.manifest
            .clone()
            .unwrap_or_else(|| self.output_dir.join(MANIFEST_FILE))
    }

    /// The directory whose files are served in the current mode
    #[must_use]
    pub fn served_dir(&self) -> &Utf8Path {
        match self.mode {
            AssetsMode::Development => &self.public_dir,
            AssetsMode::Production => &self.output_dir,
        }
    }

    /// The checked base path
    ///
    /// # Errors
    ///
    /// Returns an error if the base path is invalid
    pub fn base_path(&self) -> Result<BasePath, portal_spa::ConfigError> {
        BasePath::new(&self.base_path)
    }
}

impl ConfigurationSection for AssetsConfig {
    const PATH: Option<&'static str> = Some("assets");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let metadata = figment.find_metadata("assets");

        let error_on_field = |source: portal_spa::ConfigError, field: &'static str| {
            let mut error = figment::Error::from(source.to_string());
            error.metadata = metadata.cloned();
            error.profile = Some(figment::Profile::Default);
            error.path = vec!["assets".to_owned(), field.to_owned()];
            error
        };

        self.base_path()
            .map_err(|e| error_on_field(e, "base_path"))?;

        if self.mode == AssetsMode::Development {
            portal_spa::AssetMode::development(self.dev_server.clone())
                .map_err(|e| error_on_field(e, "dev_server"))?;
        }

        Ok(())
    }
}

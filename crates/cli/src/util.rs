// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::Arc;

use anyhow::Context;
use portal_config::{AssetsConfig, AssetsMode, TemplatesConfig};
use portal_spa::{AssetMode, AssetResolver, ManifestLoader};
use portal_templates::Templates;
use tracing::info;

/// Build the asset resolver. The manifest is only loaded in production.
pub async fn resolver_from_config(config: &AssetsConfig) -> anyhow::Result<Arc<AssetResolver>> {
    let base_path = config.base_path()?;

    let mode = match config.mode {
        AssetsMode::Development => {
            info!(origin = %config.dev_server, "Using the frontend dev server");
            AssetMode::development(config.dev_server.clone())?
        }
        AssetsMode::Production => {
            let loader = ManifestLoader::new(config.manifest_path());
            let manifest = loader
                .load()
                .await
                .context("could not load the assets manifest")?;
            AssetMode::production(manifest)
        }
    };

    Ok(Arc::new(AssetResolver::new(mode, base_path)))
}

pub async fn templates_from_config(
    config: &TemplatesConfig,
    resolver: Arc<AssetResolver>,
) -> anyhow::Result<Option<Templates>> {
    let Some(path) = &config.path else {
        return Ok(None);
    };

    let templates = Templates::load(path.clone(), resolver)
        .await
        .with_context(|| format!("Failed to load the templates at {path}"))?;

    Ok(Some(templates))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;
    use portal_spa::{LoadError, ModeKind};

    use super::*;

    /// An output directory whose manifest is not valid JSON
    fn broken_build() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Utf8PathBuf::try_from(dir.path().join("manifest.json")).unwrap();
        std::fs::write(&manifest, "{ definitely not json").unwrap();
        (dir, manifest)
    }

    #[tokio::test]
    async fn test_development_skips_the_manifest() {
        let (_dir, manifest) = broken_build();

        for manifest in [manifest.clone(), manifest.with_file_name("missing.json")] {
            let config = AssetsConfig {
                mode: AssetsMode::Development,
                manifest: Some(manifest),
                ..AssetsConfig::default()
            };

            let resolver = resolver_from_config(&config).await.unwrap();
            let asset = resolver.resolve("src/main.ts").unwrap();
            assert_eq!(asset.mode(), ModeKind::Development);
            assert_eq!(asset.script(), "http://localhost:5173/src/main.ts");
        }
    }

    #[tokio::test]
    async fn test_production_requires_the_manifest() {
        let (_dir, manifest) = broken_build();

        let config = AssetsConfig {
            mode: AssetsMode::Production,
            manifest: Some(manifest.clone()),
            ..AssetsConfig::default()
        };
        let err = resolver_from_config(&config).await.unwrap_err();
        assert_matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::ManifestMalformed { .. })
        );

        let config = AssetsConfig {
            mode: AssetsMode::Production,
            manifest: Some(manifest.with_file_name("missing.json")),
            ..AssetsConfig::default()
        };
        let err = resolver_from_config(&config).await.unwrap_err();
        assert_matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::ManifestMissing { .. })
        );
    }
}

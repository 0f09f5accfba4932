// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod assets;
mod http;
mod templates;

pub use self::{
    assets::{AssetsConfig, AssetsMode},
    http::HttpConfig,
    templates::TemplatesConfig,
};
use crate::util::ConfigurationSection;

/// Application configuration root
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct RootConfig {
    /// Configuration of the HTTP server
    #[serde(default)]
    pub http: HttpConfig,

    /// Configuration related to the frontend assets
    #[serde(default, skip_serializing_if = "AssetsConfig::is_default")]
    pub assets: AssetsConfig,

    /// Configuration related to templates
    #[serde(default, skip_serializing_if = "TemplatesConfig::is_default")]
    pub templates: TemplatesConfig,
}

impl ConfigurationSection for RootConfig {
    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.http.validate(figment)?;
        self.assets.validate(figment)?;
        self.templates.validate(figment)?;

        Ok(())
    }
}

impl RootConfig {
    /// Generate a new configuration
    #[must_use]
    pub fn generate() -> Self {
        Self::default()
    }

    /// Configuration used in tests, pointing at the development server
    #[must_use]
    pub fn test() -> Self {
        Self {
            http: HttpConfig::default(),
            assets: AssetsConfig {
                mode: AssetsMode::Development,
                ..AssetsConfig::default()
            },
            templates: TemplatesConfig::default(),
        }
    }
}

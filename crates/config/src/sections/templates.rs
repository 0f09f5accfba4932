// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use camino::Utf8PathBuf;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ConfigurationSection;

/// Configuration related to the views
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, Serialize)]
pub struct TemplatesConfig {
    /// Directory of the `*.html` templates. Views are not rendered if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub path: Option<Utf8PathBuf>,
}

impl TemplatesConfig {
    /// Returns true if the configuration is the default one
    pub(crate) fn is_default(&self) -> bool {
        self.path.is_none()
    }
}

impl ConfigurationSection for TemplatesConfig {
    const PATH: Option<&'static str> = Some("templates");

    fn validate(
        &self,
        figment: &figment::Figment,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        if let Some(path) = &self.path {
            if path.as_str().is_empty() {
                let metadata = figment.find_metadata("templates.path");
                let mut error =
                    figment::Error::from("templates path must not be empty".to_owned());
                error.metadata = metadata.cloned();
                error.profile = Some(figment::Profile::Default);
                error.path = vec!["templates".to_owned(), "path".to_owned()];
                return Err(error.into());
            }
        }

        Ok(())
    }
}

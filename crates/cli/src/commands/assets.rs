// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use clap::Parser;
use figment::Figment;
use indexmap::IndexSet;
use portal_config::{AssetsConfig, ConfigurationSectionExt};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, info_span};

use crate::util::resolver_from_config;

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(Parser, Debug)]
enum Subcommand {
    /// Load the manifest and resolve every entry point, as well as the
    /// entries listed in the configuration
    Check,

    /// Print the tags referencing the given entries
    Render {
        /// Logical names of the entries, like `src/main.ts`
        #[arg(required = true)]
        entries: Vec<String>,
    },
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as SC;

        let config = AssetsConfig::extract_or_default(figment).map_err(anyhow::Error::from_boxed)?;

        match self.subcommand {
            SC::Check => {
                let _span = info_span!("cli.assets.check").entered();
                let resolver = resolver_from_config(&config).await?;

                let entries: IndexSet<&str> = config
                    .entries
                    .iter()
                    .map(String::as_str)
                    .chain(resolver.entry_points())
                    .collect();

                let mut failures = 0_usize;
                for entry in &entries {
                    if let Err(e) = resolver.resolve(entry) {
                        error!(
                            error = &e as &dyn std::error::Error,
                            entry, "Asset entry does not resolve"
                        );
                        failures += 1;
                    }
                }

                if failures > 0 {
                    error!(failures, "Some asset entries do not resolve");
                    return Ok(ExitCode::FAILURE);
                }

                info!(
                    mode = %resolver.mode().kind(),
                    entries = entries.len(),
                    "All asset entries resolve"
                );
            }

            SC::Render { entries } => {
                let _span = info_span!("cli.assets.render").entered();
                let resolver = resolver_from_config(&config).await?;

                let mut tags = resolver.render_entries(&entries)?;
                tags.push('\n');
                tokio::io::stdout().write_all(tags.as_bytes()).await?;
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use portal_config::AssetsMode;

mod assets;
mod config;
mod server;
mod templates;

#[derive(Parser, Debug)]
enum Subcommand {
    /// Configuration-related commands
    Config(self::config::Options),

    /// Check and render the frontend assets references
    Assets(self::assets::Options),

    /// Templates-related commands
    Templates(self::templates::Options),

    /// Runs the web server
    Server(self::server::Options),
}

#[derive(Parser, Debug)]
#[command(version)]
pub struct Options {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Append,
    )]
    config: Vec<Utf8PathBuf>,

    #[command(subcommand)]
    subcommand: Option<Subcommand>,
}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        use Subcommand as S;
        match self.subcommand {
            Some(S::Config(c)) => c.run(figment).await,
            Some(S::Assets(c)) => c.run(figment).await,
            Some(S::Templates(c)) => c.run(figment).await,
            Some(S::Server(c)) => c.run(figment).await,
            None => self::server::Options::default().run(figment).await,
        }
    }

    /// Get a [`Figment`] instance with the configuration loaded
    ///
    /// `NODE_ENV` sets the assets mode, the configuration files and the
    /// `PORTAL_` environment variables take precedence over it.
    pub fn figment(&self) -> Figment {
        let configs = if self.config.is_empty() {
            // Read the PORTAL_CONFIG environment variable
            std::env::var("PORTAL_CONFIG")
                // Default to "config.yaml"
                .unwrap_or_else(|_| "config.yaml".to_owned())
                // Split the file list on `:`
                .split(':')
                .map(Utf8PathBuf::from)
                .collect()
        } else {
            self.config.clone()
        };

        let base = match std::env::var("NODE_ENV") {
            Ok(node_env) => Figment::from(Serialized::default(
                "assets.mode",
                AssetsMode::from_node_env(&node_env),
            )),
            Err(_) => Figment::new(),
        };

        configs
            .into_iter()
            .fold(base, |f, path| f.admerge(Yaml::file(path)))
            .merge(Env::prefixed("PORTAL_").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use portal_config::{AssetsConfig, ConfigurationSectionExt, HttpConfig};

    use super::*;

    fn options(args: &[&str]) -> Options {
        Options::parse_from(std::iter::once("portal-cli").chain(args.iter().copied()))
    }

    #[test]
    fn node_env_has_the_lowest_precedence() {
        Jail::expect_with(|jail| {
            jail.set_env("NODE_ENV", "development");
            jail.create_file("config.yaml", "")?;

            let figment = options(&[]).figment();
            let config = AssetsConfig::extract_or_default(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.mode, AssetsMode::Development);

            jail.create_file(
                "config.yaml",
                r"
                    assets:
                      mode: production
                ",
            )?;
            let figment = options(&[]).figment();
            let config = AssetsConfig::extract_or_default(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.mode, AssetsMode::Production);

            jail.set_env("PORTAL_ASSETS__MODE", "development");
            let figment = options(&[]).figment();
            let config = AssetsConfig::extract_or_default(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.mode, AssetsMode::Development);

            Ok(())
        });
    }

    #[test]
    fn config_files() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "base.yaml",
                r"
                    http:
                      listen: 127.0.0.1:3000
                    assets:
                      entries: [src/main.ts]
                ",
            )?;
            jail.create_file(
                "local.yaml",
                r"
                    assets:
                      entries: [src/send.ts]
                ",
            )?;

            let figment = options(&["-c", "base.yaml", "--config", "local.yaml"]).figment();
            let http = HttpConfig::extract_or_default(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;
            let assets = AssetsConfig::extract_or_default(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(http.listen, "127.0.0.1:3000".parse().unwrap());
            // Lists from later files are appended
            assert_eq!(assets.entries, ["src/main.ts", "src/send.ts"]);

            jail.set_env("PORTAL_CONFIG", "local.yaml");
            let figment = options(&[]).figment();
            let assets = AssetsConfig::extract_or_default(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(assets.entries, ["src/send.ts"]);

            Ok(())
        });
    }
}

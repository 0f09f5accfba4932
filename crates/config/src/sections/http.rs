// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::net::{Ipv4Addr, SocketAddr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ConfigurationSection;

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Configuration of the HTTP server
#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
pub struct HttpConfig {
    /// Address and port to listen on
    #[serde(default = "default_listen")]
    #[schemars(with = "String")]
    pub listen: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ConfigurationSection for HttpConfig {
    const PATH: Option<&'static str> = Some("http");
}

#[cfg(test)]
mod tests {
    use figment::{
        Figment, Jail,
        providers::{Env, Format, Yaml},
    };

    use super::*;

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    http:
                      listen: 127.0.0.1:3000
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = HttpConfig::extract(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.listen, "127.0.0.1:3000".parse().unwrap());

            // Environment variables take precedence over the file
            jail.set_env("PORTAL_HTTP__LISTEN", "127.0.0.1:4000");
            let figment = figment.merge(Env::prefixed("PORTAL_").split("__"));
            let config = HttpConfig::extract(&figment)
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.listen, "127.0.0.1:4000".parse().unwrap());

            Ok(())
        });
    }
}

// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{future::IntoFuture as _, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use figment::Figment;
use portal_config::{ConfigurationSection, RootConfig};
use portal_spa::ModeKind;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span};

use crate::{
    server::build_router,
    shutdown::StopSignals,
    util::{resolver_from_config, templates_from_config},
};

#[derive(Parser, Debug, Default)]
pub(super) struct Options {}

impl Options {
    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let span = info_span!("cli.run.init").entered();
        let signals = StopSignals::install()?;
        let config = RootConfig::extract(figment).map_err(anyhow::Error::from_boxed)?;

        info!(version = env!("CARGO_PKG_VERSION"), "Starting the portal");

        let kind = ModeKind::from(config.assets.mode);
        let base_path = config.assets.base_path()?;

        // Loading the manifest fails the startup if the build is unusable
        let resolver = resolver_from_config(&config.assets).await?;
        let templates = templates_from_config(&config.templates, resolver).await?;

        let router = build_router(
            kind,
            config.assets.served_dir(),
            &config.assets.assets_dir,
            &base_path,
            templates,
        );

        let listener = tokio::net::TcpListener::bind(config.http.listen)
            .await
            .with_context(|| format!("could not listen on {}", config.http.listen))?;
        info!(
            address = %config.http.listen,
            %kind,
            base_path = %base_path,
            assets_dir = %config.assets.served_dir(),
            "Listening"
        );

        drop(span);

        let abort = CancellationToken::new();
        let drain = abort.child_token();
        tokio::spawn(signals.watch(drain.clone(), abort.clone()));

        let server = axum::serve(listener, router)
            .with_graceful_shutdown(drain.cancelled_owned())
            .into_future();

        tokio::select! {
            res = server => res.context("server failed")?,
            () = abort.cancelled() => {}
        }

        info!("Server stopped");
        Ok(ExitCode::SUCCESS)
    }
}

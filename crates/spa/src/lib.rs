// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(rustdoc::missing_crate_level_docs)]

//! A crate to help serve frontend assets built by Vite.
//!
//! In production, the manifest written by `vite build` is loaded once with a
//! [`ManifestLoader`], and an [`AssetResolver`] maps logical entries like
//! `src/main.ts` to their hashed output files. In development, the resolver
//! points straight to the Vite dev server instead.
//!
//! The [`tags`] module turns resolved entries into HTML, and [`router`]
//! serves the files themselves.

mod loader;
mod manifest;
mod resolver;
mod service;
pub mod tags;

pub use self::{
    loader::{FsSource, LoadError, MANIFEST_FILE, MalformedManifest, ManifestLoader, ManifestSource},
    manifest::{ImportGraphError, Manifest, ManifestEntry},
    resolver::{
        AssetMode, AssetResolver, BasePath, ConfigError, ModeKind, ResolveError, ResolvedAsset,
    },
    service::{DEFAULT_HASHED_DIR, router},
};

// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! HTML fragments referencing resolved assets

use std::borrow::Cow;

use indexmap::IndexSet;
use url::Url;

use crate::resolver::{
    AssetMode, AssetResolver, ModeKind, ResolveError, ResolvedAsset, dev_server_url,
};

/// Path of the live-reload client on the dev server
const DEV_CLIENT: &str = "@vite/client";

/// Escape a value for a double-quoted attribute.
///
/// Slashes are kept as-is, they are meaningful in URLs.
fn escape(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '"', '<', '>']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// The `<script>` tag loading the entry
#[must_use]
pub fn script_tag(asset: &ResolvedAsset) -> String {
    let src = escape(asset.script());
    match asset.mode() {
        ModeKind::Development => format!(r#"<script type="module" src="{src}"></script>"#),
        ModeKind::Production => {
            format!(r#"<script type="module" crossorigin src="{src}"></script>"#)
        }
    }
}

/// The `<link rel="stylesheet">` tags of the entry, its own stylesheets
/// first
#[must_use]
pub fn style_tags(asset: &ResolvedAsset) -> Vec<String> {
    asset
        .styles()
        .iter()
        .chain(asset.imported_styles())
        .map(|href| {
            format!(
                r#"<link rel="stylesheet" crossorigin href="{}" />"#,
                escape(href)
            )
        })
        .collect()
}

/// The `<link rel="modulepreload">` tags of the chunks the entry imports
#[must_use]
pub fn preload_tags(asset: &ResolvedAsset) -> Vec<String> {
    asset
        .preloads()
        .iter()
        .map(|href| {
            format!(
                r#"<link rel="modulepreload" crossorigin href="{}" />"#,
                escape(href)
            )
        })
        .collect()
}

/// Every tag needed by the entry: preloads, then stylesheets, then the script
#[must_use]
pub fn render_tags(asset: &ResolvedAsset) -> String {
    let mut tags = preload_tags(asset);
    tags.extend(style_tags(asset));
    tags.push(script_tag(asset));
    tags.join("\n")
}

/// The dev server client, handling hot module replacement and style
/// injection
#[must_use]
pub fn dev_client_tag(origin: &Url) -> String {
    format!(
        r#"<script type="module" src="{}"></script>"#,
        escape(&dev_server_url(origin, DEV_CLIENT))
    )
}

impl AssetResolver {
    /// Resolve several entries and render all their tags, in order.
    ///
    /// In development, the dev server client is loaded first. Tags shared by
    /// multiple entries are only rendered once.
    ///
    /// # Errors
    ///
    /// Returns the error of the first entry which failed to resolve.
    pub fn render_entries<S: AsRef<str>>(&self, entries: &[S]) -> Result<String, ResolveError> {
        let mut tags = IndexSet::new();

        if let AssetMode::Development { origin } = self.mode() {
            tags.insert(dev_client_tag(origin));
        }

        for entry in entries {
            let asset = self.resolve(entry.as_ref())?;
            tags.extend(preload_tags(&asset));
            tags.extend(style_tags(&asset));
            tags.insert(script_tag(&asset));
        }

        Ok(tags.into_iter().collect::<Vec<_>>().join("\n"))
    }
}

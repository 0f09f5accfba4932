// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Additional functions exposed to the templates

use std::sync::Arc;

use minijinja::{Error, ErrorKind, Value, value::Rest};
use portal_spa::{AssetResolver, ResolveError};

pub fn register(env: &mut minijinja::Environment<'static>, resolver: Arc<AssetResolver>) {
    let include = Arc::clone(&resolver);
    env.add_function("include_asset", move |entries: Rest<String>| {
        function_include_asset(&include, &entries)
    });

    let assets = Arc::clone(&resolver);
    env.add_function("asset_path", move |entry: &str| {
        assets
            .asset_path(entry)
            .map_err(|e| resolve_error(entry, e))
    });

    env.add_function("public_path", move |path: &str| resolver.public_path(path));
}

fn function_include_asset(resolver: &AssetResolver, entries: &[String]) -> Result<Value, Error> {
    if entries.is_empty() {
        return Err(Error::new(
            ErrorKind::MissingArgument,
            "include_asset needs at least one entry",
        ));
    }

    let tags = resolver
        .render_entries(entries)
        .map_err(|e| resolve_error(&entries.join(", "), e))?;

    Ok(Value::from_safe_string(tags))
}

fn resolve_error(entry: &str, e: ResolveError) -> Error {
    tracing::error!(
        error = &e as &dyn std::error::Error,
        entry,
        "Failed to resolve asset"
    );

    Error::new(ErrorKind::InvalidOperation, "Failed to resolve asset").with_source(e)
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use portal_spa::{AssetMode, BasePath, Manifest, ManifestEntry};

    use super::*;

    fn environment() -> minijinja::Environment<'static> {
        let manifest = Manifest::from_entries([
            (
                "src/main.ts",
                ManifestEntry::new("assets/main-4f1a.js")
                    .entry()
                    .with_css(["assets/main-aa01.css"]),
            ),
            ("src/logo.svg", ManifestEntry::new("assets/logo-77ce.svg")),
        ]);
        let resolver = AssetResolver::new(
            AssetMode::production(Arc::new(manifest)),
            BasePath::new("/static").unwrap(),
        );

        let mut env = minijinja::Environment::new();
        register(&mut env, Arc::new(resolver));
        env
    }

    #[test]
    fn include_asset() {
        let env = environment();
        let res = env
            .render_str("{{ include_asset('src/main.ts') }}", ())
            .unwrap();
        assert_eq!(
            res,
            [
                r#"<link rel="stylesheet" crossorigin href="/static/assets/main-aa01.css" />"#,
                r#"<script type="module" crossorigin src="/static/assets/main-4f1a.js"></script>"#,
            ]
            .join("\n")
        );
    }

    #[test]
    fn include_nothing() {
        let env = environment();
        let err = env.render_str("{{ include_asset() }}", ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
    }

    #[test]
    fn paths() {
        let env = environment();
        let res = env
            .render_str(
                "{{ asset_path('src/logo.svg') }} {{ public_path('/favicon.ico') }}",
                (),
            )
            .unwrap();
        assert_eq!(res, "/static/assets/logo-77ce.svg /static/favicon.ico");
    }

    #[test]
    fn unknown_entry_fails_the_render() {
        let env = environment();
        let err = env
            .render_str("{{ include_asset('src/nope.ts') }}", ())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);

        let source = err
            .source()
            .and_then(|s| s.downcast_ref::<ResolveError>())
            .unwrap();
        assert_eq!(
            source,
            &ResolveError::EntryNotFound {
                entry: "src/nope.ts".to_owned()
            }
        );

        // Other renders are not affected
        env.render_str("{{ include_asset('src/main.ts') }}", ())
            .unwrap();
    }
}

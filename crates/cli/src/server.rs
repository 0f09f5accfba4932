// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Instant;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
};
use camino::Utf8Path;
use headers::{HeaderMapExt as _, UserAgent};
use portal_spa::{BasePath, ModeKind};
use portal_templates::Templates;

async fn log_response_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let user_agent: Option<UserAgent> = request.headers().typed_get();
    let user_agent = user_agent.as_ref().map_or("-", |u| u.as_str());
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let version = request.version();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed().as_millis();
    let status_code = response.status();
    match status_code.as_u16() {
        100..=399 => tracing::info!(
            name: "http.server.response",
            "\"{method} {path} {version:?}\" {status_code} {user_agent:?} [{elapsed}ms]",
        ),
        400..=499 => tracing::warn!(
            name: "http.server.response",
            "\"{method} {path} {version:?}\" {status_code} {user_agent:?} [{elapsed}ms]",
        ),
        500..=599 => tracing::error!(
            name: "http.server.response",
            "\"{method} {path} {version:?}\" {status_code} {user_agent:?} [{elapsed}ms]",
        ),
        _ => { /* This shouldn't happen */ }
    }

    response
}

async fn index(State(templates): State<Templates>) -> Result<Html<String>, StatusCode> {
    templates.render("index.html", &()).map(Html).map_err(|e| {
        tracing::error!(
            error = &e as &dyn std::error::Error,
            "Failed to render the index page"
        );
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Build the router serving the static assets under the base path, and the
/// index page if templates are configured
pub fn build_router(
    kind: ModeKind,
    served_dir: &Utf8Path,
    hashed_dir: &str,
    base_path: &BasePath,
    templates: Option<Templates>,
) -> Router<()> {
    let assets = portal_spa::router(kind, served_dir, hashed_dir);

    // axum panics when nesting at the root, merge instead
    let prefix = base_path.as_str().trim_end_matches('/');
    let mut router = if prefix.is_empty() {
        Router::new().merge(assets)
    } else {
        Router::new().nest(prefix, assets)
    };

    if let Some(templates) = templates {
        router = router.route("/", get(index).with_state(templates));
    }

    router.layer(axum::middleware::from_fn(log_response_middleware))
}

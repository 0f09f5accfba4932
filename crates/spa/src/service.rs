// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use headers::{CacheControl, HeaderMapExt as _};
use tower_http::services::ServeDir;

use crate::ModeKind;

/// Directory where `vite build` puts the hashed chunks by default
pub const DEFAULT_HASHED_DIR: &str = "assets";

/// Hashed assets never change, cache them for a year
const IMMUTABLE_MAX_AGE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Missing assets may show up with the next deployment
const NOT_FOUND_MAX_AGE: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
struct CachePolicy {
    kind: ModeKind,

    /// `/{hashed_dir}/`, the prefix of files whose name carries a content hash
    hashed_prefix: Arc<str>,
}

impl CachePolicy {
    fn cache_control(&self, path: &str, status: StatusCode) -> CacheControl {
        match self.kind {
            ModeKind::Development => CacheControl::new().with_no_cache(),
            ModeKind::Production if status == StatusCode::NOT_FOUND => CacheControl::new()
                .with_public()
                .with_max_age(NOT_FOUND_MAX_AGE),
            ModeKind::Production if path.starts_with(&*self.hashed_prefix) => CacheControl::new()
                .with_public()
                .with_max_age(IMMUTABLE_MAX_AGE)
                .with_immutable(),
            // Copied from the public directory as-is, the name stays the same
            // across builds
            ModeKind::Production => CacheControl::new().with_public().with_no_cache(),
        }
    }
}

async fn add_cache_headers(
    State(policy): State<CachePolicy>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let mut res = next.run(request).await;
    let cache_control = policy.cache_control(&path, res.status());
    res.headers_mut().typed_insert(cache_control);
    res
}

/// Directories are never listed, and hidden files like the `.vite` directory
/// holding the manifest are never served
async fn refuse_listing_and_hidden(request: Request) -> Result<Request, StatusCode> {
    let path = request.uri().path();
    if path.ends_with('/') || path.split('/').any(|segment| segment.starts_with('.')) {
        Err(StatusCode::NOT_FOUND)
    } else {
        Ok(request)
    }
}

/// Serve static assets from `dir`.
///
/// In production, `dir` is the bundler output directory. Files under
/// `hashed_dir` are cached as immutable, since their names carry a content
/// hash; the other ones must be revalidated. In development, `dir` is the
/// public directory and nothing is cached.
pub fn router<S>(kind: ModeKind, dir: impl AsRef<Path>, hashed_dir: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let serve_dir = ServeDir::new(dir).append_index_html_on_directories(false);
    let serve_dir = match kind {
        ModeKind::Production => serve_dir.precompressed_br().precompressed_gzip(),
        ModeKind::Development => serve_dir,
    };

    let policy = CachePolicy {
        kind,
        hashed_prefix: format!("/{}/", hashed_dir.trim_matches('/')).into(),
    };

    Router::new()
        .fallback_service(serve_dir)
        .layer(axum::middleware::from_fn_with_state(
            policy,
            add_cache_headers,
        ))
        .layer(axum::middleware::map_request(refuse_listing_and_hidden))
}

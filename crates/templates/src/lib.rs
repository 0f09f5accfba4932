// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Templates rendering, with helpers referencing the frontend assets

use std::{collections::BTreeMap, sync::Arc};

use camino::{Utf8Path, Utf8PathBuf};
use portal_spa::AssetResolver;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info};
use walkdir::DirEntry;

mod functions;

/// Wrapper around [`minijinja::Environment`] helping rendering the various
/// views
#[derive(Debug, Clone)]
pub struct Templates {
    environment: Arc<minijinja::Environment<'static>>,
    path: Utf8PathBuf,
}

/// There was an issue while loading the templates
#[derive(Error, Debug)]
pub enum TemplateLoadingError {
    /// I/O error
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// Failed to traverse the filesystem
    #[error("failed to traverse the filesystem")]
    WalkDir(#[from] walkdir::Error),

    /// Encountered non-UTF-8 path
    #[error("encountered non-UTF-8 path")]
    NonUtf8Path(#[from] camino::FromPathBufError),

    /// Encountered invalid path
    #[error("encountered invalid path")]
    InvalidPath(#[from] std::path::StripPrefixError),

    /// Some templates failed to compile
    #[error("could not load and compile some templates")]
    Compile(#[from] minijinja::Error),

    /// Could not join blocking task
    #[error("error from async runtime")]
    Runtime(#[from] JoinError),
}

/// Error that happened while rendering a template
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No template with this name was loaded
    #[error("missing template {template:?}")]
    Missing {
        /// The name of the template
        template: String,

        /// The underlying error
        #[source]
        source: minijinja::Error,
    },

    /// The template failed to render
    #[error("could not render template {template:?}")]
    Render {
        /// The name of the template
        template: String,

        /// The underlying error
        #[source]
        source: minijinja::Error,
    },
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.'))
}

impl Templates {
    /// Load the templates from the given directory
    ///
    /// Every `*.html` file under `path` is registered, named after its path
    /// relative to `path`. Hidden files and directories are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the templates could not be read or compiled
    #[tracing::instrument(
        name = "templates.load",
        skip_all,
        fields(%path),
    )]
    pub async fn load(
        path: Utf8PathBuf,
        resolver: Arc<AssetResolver>,
    ) -> Result<Self, TemplateLoadingError> {
        let root = path.clone();
        let span = tracing::Span::current();

        let mut env = tokio::task::spawn_blocking(move || {
            span.in_scope(move || {
                let mut env = minijinja::Environment::new();
                let root = root.canonicalize_utf8()?;
                info!(%root, "Loading templates from filesystem");
                for entry in walkdir::WalkDir::new(&root)
                    .min_depth(1)
                    .into_iter()
                    .filter_entry(|e| !is_hidden(e))
                {
                    let entry = entry?;
                    if !entry.file_type().is_file() {
                        continue;
                    }

                    let path = Utf8PathBuf::try_from(entry.into_path())?;
                    if path.extension() != Some("html") {
                        continue;
                    }

                    let relative = path.strip_prefix(&root)?;
                    debug!(%relative, "Registering template");
                    let template = std::fs::read_to_string(&path)?;
                    env.add_template_owned(relative.as_str().to_owned(), template)?;
                }

                Ok::<_, TemplateLoadingError>(env)
            })
        })
        .await??;

        self::functions::register(&mut env, resolver);

        Ok(Self {
            environment: Arc::new(env),
            path,
        })
    }

    /// The directory the templates were loaded from
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Names of the loaded templates, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.environment.templates().map(|(name, _)| name).collect();
        names.sort_unstable();
        names
    }

    /// Render the template `name` with the given context
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not exist or fails to render,
    /// for example because it references an unknown asset entry.
    pub fn render<C: Serialize>(&self, name: &str, context: &C) -> Result<String, TemplateError> {
        let template =
            self.environment
                .get_template(name)
                .map_err(|source| TemplateError::Missing {
                    template: name.to_owned(),
                    source,
                })?;

        template
            .render(context)
            .map_err(|source| TemplateError::Render {
                template: name.to_owned(),
                source,
            })
    }

    /// Render every template with an empty context.
    ///
    /// Returns the renders, keyed by template name.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered
    pub fn check(&self) -> Result<BTreeMap<String, String>, TemplateError> {
        let mut out = BTreeMap::new();
        for name in self.names() {
            let rendered = self.render(name, &())?;
            out.insert(name.to_owned(), rendered);
        }
        Ok(out)
    }
}

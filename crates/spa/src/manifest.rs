// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

/// The manifest written by `vite build`, mapping each source path known to
/// the bundler to the chunk it produced.
///
/// Deserializing a manifest does not check the import graph, use
/// [`Manifest::validate`] for that. The [`crate::ManifestLoader`] always
/// validates what it loads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: IndexMap<String, ManifestEntry>,
}

/// A single chunk in the Vite manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// The hashed output file of this chunk, relative to the output directory
    pub file: String,

    /// The source file this chunk was built from
    #[serde(default)]
    pub src: Option<String>,

    /// The name of the chunk
    #[serde(default)]
    pub name: Option<String>,

    /// Stylesheets emitted for this chunk, in the order they must be applied
    #[serde(default)]
    pub css: Vec<String>,

    /// Other static assets (images, fonts) referenced by this chunk
    #[serde(default)]
    pub assets: Vec<String>,

    /// Manifest keys of the chunks this one statically imports
    #[serde(default)]
    pub imports: Vec<String>,

    /// Manifest keys of the chunks this one imports with `import()`
    #[serde(default)]
    pub dynamic_imports: Vec<String>,

    /// Whether this chunk is an entry point declared to the bundler
    #[serde(default)]
    pub is_entry: bool,

    /// Whether this chunk is only reachable through a dynamic import
    #[serde(default)]
    pub is_dynamic_entry: bool,
}

impl ManifestEntry {
    /// Create an entry for the given output file, with no stylesheet and no
    /// import
    #[must_use]
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            src: None,
            name: None,
            css: Vec::new(),
            assets: Vec::new(),
            imports: Vec::new(),
            dynamic_imports: Vec::new(),
            is_entry: false,
            is_dynamic_entry: false,
        }
    }

    /// Mark this chunk as an entry point
    #[must_use]
    pub fn entry(mut self) -> Self {
        self.is_entry = true;
        self
    }

    /// Add stylesheets to this chunk
    #[must_use]
    pub fn with_css<I, S>(mut self, css: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.css.extend(css.into_iter().map(Into::into));
        self
    }

    /// Add static imports to this chunk
    #[must_use]
    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports.extend(imports.into_iter().map(Into::into));
        self
    }
}

/// The import graph of a manifest is not usable
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportGraphError {
    /// An entry ends up importing itself
    #[error("import cycle through {entry:?}")]
    Cyclic {
        /// The entry which was reached twice on the same import path
        entry: String,
    },

    /// An entry imports a key which is not in the manifest
    #[error("{importer:?} imports {import:?}, which is not in the manifest")]
    MissingImport {
        /// The entry declaring the import
        importer: String,

        /// The missing manifest key
        import: String,
    },
}

impl Manifest {
    /// Build a manifest out of a list of entries, without validating it
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ManifestEntry)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Look up a chunk by its manifest key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    /// Number of chunks in the manifest
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no chunk at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the chunks, in the order they appear in the manifest
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys of the chunks marked as entry points
    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, entry)| entry.is_entry)
            .map(|(key, _)| key)
    }

    /// Check that every import points to a chunk of the manifest and that
    /// the import graph has no cycle
    ///
    /// # Errors
    ///
    /// Returns an error on the first dangling import or cycle found.
    pub fn validate(&self) -> Result<(), ImportGraphError> {
        // Finished chunks are shared across roots so that each chunk is
        // walked once
        let mut walk = ImportWalk::new(self);
        for (key, entry) in &self.entries {
            if walk.seen.insert(key.as_str()) {
                walk.descend(key.as_str(), entry, &mut |_, _| {})?;
            }
        }

        Ok(())
    }

    /// Walk the static imports of `key` depth-first, calling `visit` once for
    /// every chunk reached, in the order they are first discovered.
    ///
    /// The chunk at `key` itself is not visited. Does nothing if `key` is not
    /// in the manifest.
    pub(crate) fn walk_imports<'a, F>(
        &'a self,
        key: &'a str,
        mut visit: F,
    ) -> Result<(), ImportGraphError>
    where
        F: FnMut(&'a str, &'a ManifestEntry),
    {
        let Some(entry) = self.entries.get(key) else {
            return Ok(());
        };

        let mut walk = ImportWalk::new(self);
        walk.seen.insert(key);
        walk.descend(key, entry, &mut visit)
    }
}

struct ImportWalk<'a> {
    manifest: &'a Manifest,
    /// Chunks on the current import path
    path: HashSet<&'a str>,
    /// Chunks already reached
    seen: HashSet<&'a str>,
}

impl<'a> ImportWalk<'a> {
    fn new(manifest: &'a Manifest) -> Self {
        Self {
            manifest,
            path: HashSet::new(),
            seen: HashSet::new(),
        }
    }

    /// Depth-first walk from `key`, with an explicit stack so that long
    /// import chains don't exhaust the thread stack
    fn descend<F>(
        &mut self,
        key: &'a str,
        entry: &'a ManifestEntry,
        visit: &mut F,
    ) -> Result<(), ImportGraphError>
    where
        F: FnMut(&'a str, &'a ManifestEntry),
    {
        // Chunks on the current path, with the index of their next import
        let mut stack: Vec<(&'a str, &'a ManifestEntry, usize)> = vec![(key, entry, 0)];
        self.path.insert(key);

        while let Some(top) = stack.last_mut() {
            let (importer, entry) = (top.0, top.1);
            let Some(import) = entry.imports.get(top.2) else {
                self.path.remove(importer);
                stack.pop();
                continue;
            };
            top.2 += 1;

            let import = import.as_str();
            if self.path.contains(import) {
                return Err(ImportGraphError::Cyclic {
                    entry: import.to_owned(),
                });
            }

            // Anything seen but not on the current path was fully walked already
            if !self.seen.insert(import) {
                continue;
            }

            let Some(child) = self.manifest.entries.get(import) else {
                return Err(ImportGraphError::MissingImport {
                    importer: importer.to_owned(),
                    import: import.to_owned(),
                });
            };

            visit(import, child);
            self.path.insert(import);
            stack.push((import, child, 0));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_vite_manifest() {
        let manifest: Manifest = serde_json::from_str(
            r#"{
                "_shared-B7PI925R.js": {
                    "file": "assets/shared-B7PI925R.js",
                    "name": "shared",
                    "css": ["assets/shared-ChJ_j-JJ.css"]
                },
                "src/main.ts": {
                    "file": "assets/main-BRBmoGS9.js",
                    "name": "main",
                    "src": "src/main.ts",
                    "isEntry": true,
                    "imports": ["_shared-B7PI925R.js"],
                    "dynamicImports": ["src/lazy.ts"],
                    "css": ["assets/main-5UjPuW-k.css"],
                    "assets": ["assets/logo-BuPIv-2h.svg"]
                },
                "src/lazy.ts": {
                    "file": "assets/lazy-DQk8rpl1.js",
                    "src": "src/lazy.ts",
                    "isDynamicEntry": true,
                    "somethingNew": 42
                }
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.len(), 3);
        let main = manifest.get("src/main.ts").unwrap();
        assert_eq!(main.file, "assets/main-BRBmoGS9.js");
        assert!(main.is_entry);
        assert_eq!(main.imports, ["_shared-B7PI925R.js"]);
        assert_eq!(main.dynamic_imports, ["src/lazy.ts"]);
        assert_eq!(main.assets, ["assets/logo-BuPIv-2h.svg"]);

        let lazy = manifest.get("src/lazy.ts").unwrap();
        assert!(lazy.is_dynamic_entry);
        assert!(!lazy.is_entry);
        assert!(lazy.css.is_empty());

        let entry_points: Vec<_> = manifest.entry_points().collect();
        assert_eq!(entry_points, ["src/main.ts"]);

        manifest.validate().unwrap();
    }

    #[test]
    fn reject_entry_without_file() {
        let res = serde_json::from_str::<Manifest>(r#"{ "src/main.ts": { "isEntry": true } }"#);
        assert!(res.is_err());

        let res = serde_json::from_str::<Manifest>(r#"{ "src/main.ts": { "file": 42 } }"#);
        assert!(res.is_err());
    }

    #[test]
    fn validate_cycles() {
        let manifest = Manifest::from_entries([
            ("a", ManifestEntry::new("a.js").entry().with_imports(["b"])),
            ("b", ManifestEntry::new("b.js").with_imports(["a"])),
        ]);
        assert_eq!(
            manifest.validate(),
            Err(ImportGraphError::Cyclic { entry: "a".into() })
        );

        let manifest = Manifest::from_entries([(
            "a",
            ManifestEntry::new("a.js").entry().with_imports(["a"]),
        )]);
        assert_eq!(
            manifest.validate(),
            Err(ImportGraphError::Cyclic { entry: "a".into() })
        );
    }

    #[test]
    fn validate_diamond_is_not_a_cycle() {
        let manifest = Manifest::from_entries([
            ("a", ManifestEntry::new("a.js").entry().with_imports(["b", "c"])),
            ("b", ManifestEntry::new("b.js").with_imports(["d"])),
            ("c", ManifestEntry::new("c.js").with_imports(["d"])),
            ("d", ManifestEntry::new("d.js")),
        ]);
        manifest.validate().unwrap();
    }

    #[test]
    fn validate_missing_import() {
        let manifest = Manifest::from_entries([(
            "a",
            ManifestEntry::new("a.js").entry().with_imports(["nope"]),
        )]);
        assert_eq!(
            manifest.validate(),
            Err(ImportGraphError::MissingImport {
                importer: "a".into(),
                import: "nope".into(),
            })
        );
    }

    #[test]
    fn walk_in_discovery_order() {
        let manifest = Manifest::from_entries([
            ("a", ManifestEntry::new("a.js").entry().with_imports(["b", "c"])),
            ("b", ManifestEntry::new("b.js").with_imports(["d"])),
            ("c", ManifestEntry::new("c.js").with_imports(["d", "e"])),
            ("d", ManifestEntry::new("d.js")),
            ("e", ManifestEntry::new("e.js")),
        ]);

        let mut visited = Vec::new();
        manifest
            .walk_imports("a", |key, _| visited.push(key))
            .unwrap();
        assert_eq!(visited, ["b", "d", "c", "e"]);
    }

    /// A linear chain `k0 -> k1 -> ... -> k{len - 1}`
    fn chain(len: usize) -> Manifest {
        Manifest::from_entries((0..len).map(|i| {
            let mut entry = ManifestEntry::new(format!("k{i}.js"));
            if i == 0 {
                entry = entry.entry();
            }
            if i + 1 < len {
                entry = entry.with_imports([format!("k{}", i + 1)]);
            }
            (format!("k{i}"), entry)
        }))
    }

    #[test]
    fn walk_long_import_chain() {
        let manifest = chain(100_000);
        manifest.validate().unwrap();

        let mut visited = 0;
        let mut last = "";
        manifest
            .walk_imports("k0", |key, _| {
                visited += 1;
                last = key;
            })
            .unwrap();
        assert_eq!(visited, 99_999);
        assert_eq!(last, "k99999");
    }

    #[test]
    fn validate_long_cycle() {
        let mut manifest = chain(100_000);
        manifest
            .entries
            .get_mut("k99999")
            .unwrap()
            .imports
            .push("k0".to_owned());
        assert_eq!(
            manifest.validate(),
            Err(ImportGraphError::Cyclic { entry: "k0".into() })
        );
    }
}

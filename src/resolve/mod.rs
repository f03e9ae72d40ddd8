use crate::error::ConfigError;
use crate::model::EdgeKind;
use crate::path::RelPath;
use crate::project::ProjectConfig;
use std::path::Path;

pub mod alias;
pub mod candidates;
pub mod fileset;

use alias::AliasMapper;
use fileset::FileSet;

/// How a specifier is treated before any lookup happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierClass {
    Relative,
    Alias,
    Package,
}

/// Validated, immutable resolution settings for one indexing run.
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    pub aliases: AliasMapper,
    pub extensions: Vec<String>,
    pub index_files: Vec<String>,
}

impl ResolveConfig {
    pub fn from_project(root: &Path, project: &ProjectConfig) -> Result<Self, ConfigError> {
        let extensions = project
            .extensions
            .iter()
            .map(|ext| alias::normalize_extension(ext))
            .collect::<Result<Vec<_>, _>>()?;
        if extensions.is_empty() {
            return Err(ConfigError::EmptyList { field: "extensions" });
        }
        let index_files = project
            .index_files
            .iter()
            .map(|name| normalize_index_file(name))
            .collect::<Result<Vec<_>, _>>()?;
        if index_files.is_empty() {
            return Err(ConfigError::EmptyList { field: "index_files" });
        }
        let aliases = AliasMapper::new(root, &project.alias_specs(), &extensions)?;
        Ok(Self {
            aliases,
            extensions,
            index_files,
        })
    }
}

// Index names are a single path segment (`index`, `main`).
fn normalize_index_file(raw: &str) -> Result<String, ConfigError> {
    let name = raw.trim();
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ConfigError::InvalidIndexFile {
            name: raw.to_string(),
        });
    }
    Ok(name.to_string())
}

/// Outcome of resolving one specifier. `target` is `None` for packages and
/// for local specifiers that exhausted every candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub target: Option<RelPath>,
    pub kind: EdgeKind,
}

impl Resolution {
    fn resolved(target: RelPath, kind: EdgeKind) -> Self {
        Self {
            target: Some(target),
            kind,
        }
    }

    fn package() -> Self {
        Self {
            target: None,
            kind: EdgeKind::Package,
        }
    }

    fn unresolved() -> Self {
        Self {
            target: None,
            kind: EdgeKind::Unresolved,
        }
    }
}

pub fn classify(specifier: &str, aliases: &AliasMapper) -> SpecifierClass {
    if specifier.starts_with('.') || specifier.starts_with('/') {
        return SpecifierClass::Relative;
    }
    if aliases.match_alias(specifier).is_some() {
        return SpecifierClass::Alias;
    }
    SpecifierClass::Package
}

/// Drop `?query` and `#hash` suffixes used by bundlers (`./a.svg?raw`).
///
/// A leading `#` is part of the name (`#db/client` subpath imports).
pub fn strip_specifier(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.get(1..).and_then(|rest| rest.find(['?', '#'])) {
        Some(idx) => &raw[..idx + 1],
        None => raw,
    }
}

/// Resolves specifiers against a frozen file set. Cheap to share across
/// worker threads: everything it holds is read-only.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    files: &'a FileSet,
    config: &'a ResolveConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(files: &'a FileSet, config: &'a ResolveConfig) -> Self {
        Self { files, config }
    }

    pub fn resolve(&self, source_file: &RelPath, raw_specifier: &str) -> Resolution {
        let specifier = strip_specifier(raw_specifier);
        if specifier.is_empty() {
            return Resolution::unresolved();
        }
        match classify(specifier, &self.config.aliases) {
            SpecifierClass::Relative => {
                let fragment = if let Some(from_root) = specifier.strip_prefix('/') {
                    RelPath::new(from_root)
                } else {
                    RelPath::join_dir(source_file.parent().as_ref(), specifier)
                };
                match fragment {
                    Ok(fragment) => self.lookup(&fragment, &self.config.extensions, EdgeKind::Relative),
                    Err(_) => Resolution::unresolved(),
                }
            }
            SpecifierClass::Alias => {
                let Some(mapping) = self.config.aliases.match_alias(specifier) else {
                    return Resolution::package();
                };
                match alias::substitute_with(mapping, specifier) {
                    Some(fragment) => self.lookup(&fragment, &mapping.extensions, EdgeKind::Alias),
                    None => Resolution::unresolved(),
                }
            }
            SpecifierClass::Package => Resolution::package(),
        }
    }

    fn lookup(&self, fragment: &RelPath, extensions: &[String], kind: EdgeKind) -> Resolution {
        match candidates::resolve_fragment(self.files, fragment, extensions, &self.config.index_files) {
            Some(target) => Resolution::resolved(target, kind),
            None => Resolution::unresolved(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{AliasEntry, ProjectConfig};
    use tempfile::TempDir;

    fn rel(raw: &str) -> RelPath {
        RelPath::new(raw).unwrap()
    }

    fn setup(dirs: &[&str], aliases: &[(&str, &str)]) -> (TempDir, ResolveConfig) {
        let dir = TempDir::new().unwrap();
        for d in dirs {
            std::fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        let mut project = ProjectConfig::default();
        project.aliases = aliases
            .iter()
            .map(|(prefix, base)| AliasEntry {
                prefix: prefix.to_string(),
                base_dir: base.to_string(),
                extensions: Vec::new(),
            })
            .collect();
        let config = ResolveConfig::from_project(dir.path(), &project).unwrap();
        (dir, config)
    }

    #[test]
    fn classifies_specifiers() {
        let (_dir, config) = setup(&["src/db"], &[("@db", "src/db")]);
        assert_eq!(classify("./x", &config.aliases), SpecifierClass::Relative);
        assert_eq!(classify("../x", &config.aliases), SpecifierClass::Relative);
        assert_eq!(classify("@db/x", &config.aliases), SpecifierClass::Alias);
        assert_eq!(classify("@dbx", &config.aliases), SpecifierClass::Package);
        assert_eq!(classify("react", &config.aliases), SpecifierClass::Package);
        assert_eq!(classify("node:fs", &config.aliases), SpecifierClass::Package);
    }

    #[test]
    fn alias_scenario_resolves_to_index() {
        let (_dir, config) = setup(&["src/db"], &[("@db", "src/db")]);
        let files = FileSet::from_paths([rel("src/api/routes.ts"), rel("src/db/index.ts")]);
        let resolver = Resolver::new(&files, &config);
        let got = resolver.resolve(&rel("src/api/routes.ts"), "@db");
        assert_eq!(got, Resolution::resolved(rel("src/db/index.ts"), EdgeKind::Alias));
    }

    #[test]
    fn longest_alias_is_used_for_lookup() {
        let (_dir, config) = setup(
            &["src/db", "src/dbutils"],
            &[("@db", "src/db"), ("@db-utils", "src/dbutils")],
        );
        let files = FileSet::from_paths([rel("src/dbutils/helper.ts"), rel("src/db/helper.ts")]);
        let resolver = Resolver::new(&files, &config);
        let got = resolver.resolve(&rel("src/a.ts"), "@db-utils/helper");
        assert_eq!(got.target.unwrap().as_str(), "src/dbutils/helper.ts");
    }

    #[test]
    fn relative_specifiers_resolve_from_source_dir() {
        let (_dir, config) = setup(&[], &[]);
        let files = FileSet::from_paths([rel("src/db/client.ts"), rel("index.ts")]);
        let resolver = Resolver::new(&files, &config);
        let got = resolver.resolve(&rel("src/api/routes.ts"), "../db/client");
        assert_eq!(got, Resolution::resolved(rel("src/db/client.ts"), EdgeKind::Relative));
        let top = resolver.resolve(&rel("main.ts"), "./index");
        assert_eq!(top.target.unwrap().as_str(), "index.ts");
        let rooted = resolver.resolve(&rel("src/api/routes.ts"), "/src/db/client");
        assert_eq!(rooted.target.unwrap().as_str(), "src/db/client.ts");
    }

    #[test]
    fn unresolved_and_package_outcomes() {
        let (_dir, config) = setup(&["src/db"], &[("@db", "src/db")]);
        let files = FileSet::from_paths([rel("src/a.ts")]);
        let resolver = Resolver::new(&files, &config);
        assert_eq!(resolver.resolve(&rel("src/a.ts"), "./missing"), Resolution::unresolved());
        assert_eq!(resolver.resolve(&rel("src/a.ts"), "@db/missing"), Resolution::unresolved());
        assert_eq!(resolver.resolve(&rel("src/a.ts"), "../../outside"), Resolution::unresolved());
        assert_eq!(resolver.resolve(&rel("src/a.ts"), "lodash"), Resolution::package());
        assert_eq!(resolver.resolve(&rel("src/a.ts"), ""), Resolution::unresolved());
    }

    #[test]
    fn query_suffixes_are_ignored() {
        let (_dir, config) = setup(&[], &[]);
        let files = FileSet::from_paths([rel("src/logo.svg")]);
        let resolver = Resolver::new(&files, &config);
        let got = resolver.resolve(&rel("src/app.ts"), "./logo.svg?raw");
        assert_eq!(got.target.unwrap().as_str(), "src/logo.svg");
    }

    #[test]
    fn hash_specifiers_keep_their_leading_hash() {
        assert_eq!(strip_specifier("#db/client"), "#db/client");
        assert_eq!(strip_specifier("#db/client?raw"), "#db/client");
        assert_eq!(strip_specifier("./a.css#x"), "./a.css");
        assert_eq!(strip_specifier("#"), "#");

        let (_dir, config) = setup(&["src/db"], &[("#db/*", "src/db/*")]);
        let files = FileSet::from_paths([rel("src/db/client.ts")]);
        let resolver = Resolver::new(&files, &config);
        assert_eq!(
            resolver.resolve(&rel("src/api/routes.ts"), "#db/client"),
            Resolution::resolved(rel("src/db/client.ts"), EdgeKind::Alias)
        );
        assert_eq!(resolver.resolve(&rel("src/a.ts"), "#internal"), Resolution::package());
    }

    #[test]
    fn root_alias_resolves_from_project_root() {
        let (_dir, config) = setup(&[], &[("@/*", "./*")]);
        let files = FileSet::from_paths([rel("lib/db/index.ts")]);
        let resolver = Resolver::new(&files, &config);
        assert_eq!(
            resolver.resolve(&rel("app/page.ts"), "@/lib/db"),
            Resolution::resolved(rel("lib/db/index.ts"), EdgeKind::Alias)
        );
        assert_eq!(resolver.resolve(&rel("app/page.ts"), "@/../x"), Resolution::unresolved());
    }

    #[test]
    fn malformed_extensions_and_index_files_are_config_errors() {
        let dir = TempDir::new().unwrap();
        for bad in ["", ".", "/../x", "ts\\x"] {
            let mut project = ProjectConfig::default();
            project.extensions = vec![".ts".to_string(), bad.to_string()];
            let err = ResolveConfig::from_project(dir.path(), &project).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidExtension { .. }), "{bad:?}");
        }
        for bad in ["", "..", "lib/index"] {
            let mut project = ProjectConfig::default();
            project.index_files = vec![bad.to_string()];
            let err = ResolveConfig::from_project(dir.path(), &project).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidIndexFile { .. }), "{bad:?}");
        }
        let mut project = ProjectConfig::default();
        project.extensions = vec!["ts".to_string(), " .tsx ".to_string()];
        let config = ResolveConfig::from_project(dir.path(), &project).unwrap();
        assert_eq!(config.extensions, vec![".ts".to_string(), ".tsx".to_string()]);
    }

    #[test]
    fn empty_extension_list_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let mut project = ProjectConfig::default();
        project.extensions.clear();
        let err = ResolveConfig::from_project(dir.path(), &project).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyList { field: "extensions" }));
    }
}

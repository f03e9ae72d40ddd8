use crate::error::{ConfigError, PathError};
use crate::path::RelPath;
use std::path::Path;
use tracing::{debug, warn};

/// One configured alias: `prefix` is replaced by `base_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMapping {
    pub prefix: String,
    /// `None` maps the prefix onto the project root (`"@/*": ["./*"]`).
    pub base_dir: Option<RelPath>,
    /// Extension search order for specifiers resolved through this alias.
    pub extensions: Vec<String>,
}

/// Unvalidated alias entry as it comes out of project configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasSpec {
    pub prefix: String,
    pub base_dir: String,
    pub extensions: Vec<String>,
}

/// Longest-prefix alias substitution over an immutable mapping table.
#[derive(Debug, Clone, Default)]
pub struct AliasMapper {
    // Sorted by prefix length, longest first.
    mappings: Vec<AliasMapping>,
}

impl AliasMapper {
    /// Validate and freeze alias configuration.
    ///
    /// Prefixes are normalized (`@db/*`, `@db/` and `@db` are the same
    /// alias). Identical duplicates are merged; the same prefix pointing at
    /// two different directories is an error, as is a base directory that is
    /// absolute, escapes the root, or does not exist under `root`. The bare
    /// `*` catch-all is skipped.
    pub fn new(
        root: &Path,
        specs: &[AliasSpec],
        default_extensions: &[String],
    ) -> Result<Self, ConfigError> {
        let mut mappings: Vec<AliasMapping> = Vec::new();
        for spec in specs {
            if spec.prefix.trim() == "*" {
                warn!(base_dir = %spec.base_dir, "skipping catch-all alias *");
                continue;
            }
            let prefix = normalize_prefix(&spec.prefix);
            if prefix.is_empty() {
                return Err(ConfigError::EmptyPrefix);
            }
            let raw_base = match spec.base_dir.trim() {
                "*" => "",
                other => other.trim_end_matches("/*"),
            };
            let base_dir = match RelPath::new(raw_base) {
                Ok(dir) => Some(dir),
                Err(PathError::Empty) => None,
                Err(source) => {
                    return Err(ConfigError::InvalidBaseDir {
                        prefix,
                        base_dir: spec.base_dir.clone(),
                        source,
                    });
                }
            };
            if let Some(dir) = &base_dir {
                if !root.join(dir.as_str()).is_dir() {
                    return Err(ConfigError::MissingBaseDir {
                        prefix,
                        base_dir: spec.base_dir.clone(),
                    });
                }
            }
            if let Some(existing) = mappings.iter().find(|m| m.prefix == prefix) {
                if existing.base_dir != base_dir {
                    return Err(ConfigError::ConflictingAlias {
                        prefix,
                        first: display_dir(existing.base_dir.as_ref()),
                        second: display_dir(base_dir.as_ref()),
                    });
                }
                debug!(prefix = %prefix, "merging duplicate alias entry");
                continue;
            }
            let extensions = if spec.extensions.is_empty() {
                default_extensions.to_vec()
            } else {
                spec.extensions
                    .iter()
                    .map(|ext| normalize_extension(ext))
                    .collect::<Result<Vec<_>, _>>()?
            };
            mappings.push(AliasMapping {
                prefix,
                base_dir,
                extensions,
            });
        }
        mappings.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Ok(Self { mappings })
    }

    pub fn mappings(&self) -> &[AliasMapping] {
        &self.mappings
    }

    /// The alias that owns `specifier`, if any. Matching happens on a path
    /// segment boundary so `@db` never claims `@db-utils/helper`.
    pub fn match_alias(&self, specifier: &str) -> Option<&AliasMapping> {
        self.mappings.iter().find(|m| prefix_matches(specifier, &m.prefix))
    }

    /// Replace the matched alias prefix with its base directory.
    ///
    /// The result is root-relative; `None` when no alias matches, the
    /// remainder climbs above the project root, or nothing but the root
    /// itself is left.
    pub fn substitute(&self, specifier: &str) -> Option<RelPath> {
        let mapping = self.match_alias(specifier)?;
        substitute_with(mapping, specifier)
    }
}

pub(crate) fn substitute_with(mapping: &AliasMapping, specifier: &str) -> Option<RelPath> {
    let rest = specifier[mapping.prefix.len()..].trim_start_matches('/');
    if rest.is_empty() {
        return mapping.base_dir.clone();
    }
    RelPath::join_dir(mapping.base_dir.as_ref(), rest).ok()
}

fn display_dir(dir: Option<&RelPath>) -> String {
    dir.map(RelPath::to_string).unwrap_or_else(|| ".".to_string())
}

fn prefix_matches(specifier: &str, prefix: &str) -> bool {
    match specifier.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub(crate) fn normalize_prefix(raw: &str) -> String {
    raw.trim()
        .trim_end_matches('*')
        .trim_end_matches('/')
        .to_string()
}

/// `ts` and `.ts` are the same extension. Empty values and anything that
/// would add a path segment are rejected.
pub(crate) fn normalize_extension(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let ext = if trimmed.starts_with('.') {
        trimmed.to_string()
    } else {
        format!(".{trimmed}")
    };
    if ext == "." || ext.contains(['/', '\\']) {
        return Err(ConfigError::InvalidExtension {
            extension: raw.to_string(),
        });
    }
    Ok(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(dirs: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for d in dirs {
            std::fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        dir
    }

    fn spec(prefix: &str, base_dir: &str) -> AliasSpec {
        AliasSpec {
            prefix: prefix.to_string(),
            base_dir: base_dir.to_string(),
            extensions: Vec::new(),
        }
    }

    fn exts() -> Vec<String> {
        vec![".ts".to_string(), ".js".to_string()]
    }

    #[test]
    fn longest_prefix_wins() {
        let dir = project(&["src/db", "src/dbutils"]);
        let mapper = AliasMapper::new(
            dir.path(),
            &[spec("@db", "src/db"), spec("@db-utils", "src/dbutils")],
            &exts(),
        )
        .unwrap();
        assert_eq!(mapper.substitute("@db-utils/helper").unwrap().as_str(), "src/dbutils/helper");
        assert_eq!(mapper.substitute("@db/client").unwrap().as_str(), "src/db/client");
        assert_eq!(mapper.substitute("@db").unwrap().as_str(), "src/db");
    }

    #[test]
    fn nested_prefixes_prefer_the_longer_one() {
        let dir = project(&["src", "src/shared"]);
        let mapper = AliasMapper::new(
            dir.path(),
            &[spec("@/*", "src/*"), spec("@/shared/*", "src/shared/*")],
            &exts(),
        )
        .unwrap();
        assert_eq!(mapper.match_alias("@/shared/x").unwrap().prefix, "@/shared");
        assert_eq!(mapper.substitute("@/shared/x").unwrap().as_str(), "src/shared/x");
        assert_eq!(mapper.substitute("@/other").unwrap().as_str(), "src/other");
    }

    #[test]
    fn output_is_root_relative() {
        let dir = project(&["src/db"]);
        let mapper = AliasMapper::new(dir.path(), &[spec("@db/", "./src/db/")], &exts()).unwrap();
        let out = mapper.substitute("@db/x").unwrap();
        assert_eq!(out.as_str(), "src/db/x");
        assert!(!out.as_str().starts_with('/'));
    }

    #[test]
    fn no_match_and_escape_return_none() {
        let dir = project(&["src/db"]);
        let mapper = AliasMapper::new(dir.path(), &[spec("@db", "src/db")], &exts()).unwrap();
        assert!(mapper.substitute("react").is_none());
        assert!(mapper.substitute("@dbx/y").is_none());
        assert!(mapper.substitute("@db/../../../etc").is_none());
    }

    #[test]
    fn alias_extensions_default_to_project_order() {
        let dir = project(&["src/db", "src/ui"]);
        let mut ui = spec("@ui", "src/ui");
        ui.extensions = vec!["tsx".to_string()];
        let mapper = AliasMapper::new(dir.path(), &[spec("@db", "src/db"), ui], &exts()).unwrap();
        assert_eq!(mapper.match_alias("@db").unwrap().extensions, exts());
        assert_eq!(mapper.match_alias("@ui/x").unwrap().extensions, vec![".tsx".to_string()]);
    }

    #[test]
    fn conflicting_duplicates_are_rejected() {
        let dir = project(&["src/db", "lib/db"]);
        let err = AliasMapper::new(
            dir.path(),
            &[spec("@db", "src/db"), spec("@db/*", "lib/db/*")],
            &exts(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingAlias { .. }));
    }

    #[test]
    fn identical_duplicates_are_merged() {
        let dir = project(&["src/db"]);
        let mapper = AliasMapper::new(
            dir.path(),
            &[spec("@db", "src/db"), spec("@db/*", "src/db/*")],
            &exts(),
        )
        .unwrap();
        assert_eq!(mapper.mappings().len(), 1);
    }

    #[test]
    fn invalid_base_dirs_are_rejected() {
        let dir = project(&[]);
        let missing = AliasMapper::new(dir.path(), &[spec("@db", "src/db")], &exts()).unwrap_err();
        assert!(matches!(missing, ConfigError::MissingBaseDir { .. }));
        let absolute = AliasMapper::new(dir.path(), &[spec("@db", "/proj/src")], &exts()).unwrap_err();
        assert!(matches!(absolute, ConfigError::InvalidBaseDir { .. }));
        let escape = AliasMapper::new(dir.path(), &[spec("@db", "../x")], &exts()).unwrap_err();
        assert!(matches!(escape, ConfigError::InvalidBaseDir { .. }));
        let empty = AliasMapper::new(dir.path(), &[spec("/*", "src")], &exts()).unwrap_err();
        assert!(matches!(empty, ConfigError::EmptyPrefix));
        std::fs::write(dir.path().join("file.ts"), "").unwrap();
        let not_dir = AliasMapper::new(dir.path(), &[spec("@f", "file.ts")], &exts()).unwrap_err();
        assert!(matches!(not_dir, ConfigError::MissingBaseDir { .. }));
    }

    #[test]
    fn root_base_dir_maps_onto_the_project_root() {
        let dir = project(&[]);
        for base in ["./*", "./", ".", "*"] {
            let mapper = AliasMapper::new(dir.path(), &[spec("@/*", base)], &exts()).unwrap();
            assert_eq!(mapper.mappings()[0].base_dir, None);
            assert_eq!(mapper.substitute("@/lib/db").unwrap().as_str(), "lib/db");
            assert!(mapper.substitute("@").is_none());
            assert!(mapper.substitute("@/../x").is_none());
        }
    }

    #[test]
    fn catch_all_prefix_is_skipped() {
        let dir = project(&["src", "src/db"]);
        let mapper = AliasMapper::new(
            dir.path(),
            &[spec("*", "src/*"), spec("@db", "src/db")],
            &exts(),
        )
        .unwrap();
        assert_eq!(mapper.mappings().len(), 1);
        assert!(mapper.substitute("react").is_none());
    }

    #[test]
    fn hash_prefixed_aliases_match() {
        let dir = project(&["src/db"]);
        let mapper = AliasMapper::new(dir.path(), &[spec("#db/*", "src/db/*")], &exts()).unwrap();
        assert_eq!(mapper.substitute("#db/client").unwrap().as_str(), "src/db/client");
        assert!(mapper.substitute("#dbx").is_none());
    }

    #[test]
    fn alias_extensions_are_validated() {
        let dir = project(&["src/ui"]);
        for bad in ["", ".", "/../x", "ts/x"] {
            let mut ui = spec("@ui", "src/ui");
            ui.extensions = vec![bad.to_string()];
            let err = AliasMapper::new(dir.path(), &[ui], &exts()).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidExtension { .. }), "{bad:?}");
        }
    }
}

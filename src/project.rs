//! Project configuration: alias prefixes, extension search order and index
//! file names.
//!
//! Looked up at the project root in this order:
//! 1. `.kota.yaml`
//! 2. `tsconfig.json` (`compilerOptions.baseUrl` + `compilerOptions.paths`)
//! 3. built-in defaults (no aliases)

use crate::error::{ConfigError, PathError};
use crate::path::RelPath;
use crate::resolve::alias::AliasSpec;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

pub const PROJECT_CONFIG_FILE: &str = ".kota.yaml";
pub const TSCONFIG_FILE: &str = "tsconfig.json";

const DEFAULT_EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".mts", ".cts", ".d.ts", ".json",
];
const DEFAULT_INDEX_FILES: &[&str] = &["index"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AliasEntry {
    pub prefix: String,
    pub base_dir: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub aliases: Vec<AliasEntry>,
    pub extensions: Vec<String>,
    pub index_files: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            aliases: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            index_files: DEFAULT_INDEX_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ProjectConfig {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let yaml_path = root.join(PROJECT_CONFIG_FILE);
        if yaml_path.is_file() {
            let content = read(&yaml_path)?;
            let config = Self::from_yaml(&content).map_err(|message| ConfigError::Parse {
                path: yaml_path.clone(),
                message,
            })?;
            info!(path = %yaml_path.display(), aliases = config.aliases.len(), "loaded project config");
            return Ok(config);
        }

        let tsconfig_path = root.join(TSCONFIG_FILE);
        if tsconfig_path.is_file() {
            let content = read(&tsconfig_path)?;
            let config = Self::from_tsconfig(&content).map_err(|err| match err {
                TsconfigError::Parse(message) => ConfigError::Parse {
                    path: tsconfig_path.clone(),
                    message,
                },
                TsconfigError::Config(err) => err,
            })?;
            info!(path = %tsconfig_path.display(), aliases = config.aliases.len(), "loaded tsconfig paths");
            return Ok(config);
        }

        debug!(root = %root.display(), "no project config found, using defaults");
        Ok(Self::default())
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(content).map_err(|err| err.to_string())
    }

    fn from_tsconfig(content: &str) -> Result<Self, TsconfigError> {
        let stripped = strip_jsonc_comments(content);
        let value: Value =
            serde_json::from_str(&stripped).map_err(|err| TsconfigError::Parse(err.to_string()))?;
        let mut config = Self::default();
        let Some(compiler) = value.get("compilerOptions") else {
            return Ok(config);
        };
        let base_url = compiler
            .get("baseUrl")
            .and_then(Value::as_str)
            .unwrap_or(".");
        let Some(paths) = compiler.get("paths").and_then(Value::as_object) else {
            return Ok(config);
        };
        for (pattern, targets) in paths {
            let Some(target) = targets
                .as_array()
                .and_then(|list| list.first())
                .and_then(Value::as_str)
            else {
                return Err(TsconfigError::Parse(format!(
                    "paths[{pattern:?}] must be a non-empty array of strings"
                )));
            };
            if pattern == "*" {
                warn!(mapped_to = %target, "skipping catch-all tsconfig path *");
                continue;
            }
            let wildcard = pattern.ends_with("/*");
            if pattern.contains('*') && !wildcard {
                return Err(TsconfigError::Config(ConfigError::UnsupportedPattern {
                    pattern: pattern.clone(),
                }));
            }
            let target_wildcard = target == "*" || target.ends_with("/*");
            if wildcard != target_wildcard && target.contains('*') {
                return Err(TsconfigError::Config(ConfigError::UnsupportedPattern {
                    pattern: format!("{pattern} -> {target}"),
                }));
            }
            let target_dir = if target == "*" {
                ""
            } else {
                target.trim_end_matches("/*")
            };
            let base_dir = format!("{base_url}/{target_dir}");
            // Validation of escapes happens when the alias table is built.
            let base_dir = match RelPath::new(&base_dir) {
                Ok(dir) => dir.into_string(),
                Err(PathError::Empty) => ".".to_string(),
                Err(_) => base_dir,
            };
            config.aliases.push(AliasEntry {
                prefix: pattern.clone(),
                base_dir,
                extensions: Vec::new(),
            });
        }
        Ok(config)
    }

    pub(crate) fn alias_specs(&self) -> Vec<AliasSpec> {
        self.aliases
            .iter()
            .map(|entry| AliasSpec {
                prefix: entry.prefix.clone(),
                base_dir: entry.base_dir.clone(),
                extensions: entry.extensions.clone(),
            })
            .collect()
    }
}

enum TsconfigError {
    Parse(String),
    Config(ConfigError),
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Strip `//` and `/* */` comments outside of string literals.
fn strip_jsonc_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                out.push(ch);
                while let Some(c) = chars.next() {
                    out.push(c);
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if c == '"' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

//! Root-relative path identity.
//!
//! Every path that is stored in the graph or tested against the [`FileSet`]
//! is a [`RelPath`]. Construction normalizes the value (forward slashes, no
//! `.` segments, no trailing slash, `..` folded) and rejects anything that is
//! absolute or climbs above the project root, so two `RelPath`s naming the
//! same file always compare equal as strings.
//!
//! [`FileSet`]: crate::resolve::fileset::FileSet

use crate::error::PathError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Component, Path};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    /// Normalize a root-relative path string.
    pub fn new(raw: &str) -> Result<Self, PathError> {
        let raw = raw.replace('\\', "/");
        if raw.starts_with('/') || has_drive_prefix(&raw) {
            return Err(PathError::Absolute(raw));
        }
        let mut parts: Vec<&str> = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(PathError::EscapesRoot(raw.clone()));
                    }
                }
                other => parts.push(other),
            }
        }
        if parts.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(parts.join("/")))
    }

    /// Wrap a value derived from an existing `RelPath` by a suffix swap.
    pub(crate) fn from_trusted(value: String) -> Self {
        Self(value)
    }

    /// Re-relativize an absolute path against the project root.
    ///
    /// The root is expected to be canonical; `abs` is normalized lexically
    /// before the prefix is stripped, so `root/src/../lib/x.ts` works.
    pub fn from_abs(root: &Path, abs: &Path) -> Result<Self, PathError> {
        let rel = abs.strip_prefix(root).map_err(|_| PathError::OutsideRoot {
            path: abs.to_path_buf(),
            root: root.to_path_buf(),
        })?;
        let mut parts = Vec::new();
        for comp in rel.components() {
            match comp {
                Component::Normal(os) => parts.push(os.to_string_lossy().into_owned()),
                Component::ParentDir => parts.push("..".to_string()),
                Component::CurDir => {}
                Component::RootDir | Component::Prefix(_) => {
                    return Err(PathError::Absolute(abs.display().to_string()));
                }
            }
        }
        Self::new(&parts.join("/"))
    }

    /// Join a relative fragment (which may contain `..`) onto this path.
    pub fn join(&self, fragment: &str) -> Result<Self, PathError> {
        Self::new(&format!("{}/{}", self.0, fragment))
    }

    /// Join a fragment onto an optional directory; `None` is the root itself.
    pub fn join_dir(dir: Option<&RelPath>, fragment: &str) -> Result<Self, PathError> {
        match dir {
            Some(dir) => dir.join(fragment),
            None => Self::new(fragment),
        }
    }

    /// Parent directory, `None` when the path sits directly under the root.
    pub fn parent(&self) -> Option<RelPath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| RelPath(parent.to_string()))
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Append a raw suffix to the final segment (`src/x` + `.ts`).
    pub fn with_suffix(&self, suffix: &str) -> RelPath {
        RelPath(format!("{}{}", self.0, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for RelPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

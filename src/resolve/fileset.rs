use crate::path::RelPath;
use std::collections::HashSet;

/// The authoritative set of project files, keyed by root-relative path.
///
/// Built once per run from the directory walk and never mutated afterwards.
/// Lookups only accept [`RelPath`], so an absolute candidate cannot be tested
/// against it by accident.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: HashSet<RelPath>,
}

impl FileSet {
    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = RelPath>,
    {
        Self {
            files: paths.into_iter().collect(),
        }
    }

    pub fn contains(&self, path: &RelPath) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn lookups_share_the_walk_coordinate_space() {
        let root = Path::new("/proj");
        let walked = RelPath::from_abs(root, &root.join("src/db/index.ts")).unwrap();
        let files = FileSet::from_paths([walked]);

        let from_fragment = RelPath::new("./src/api/../db/index.ts").unwrap();
        assert!(files.contains(&from_fragment));

        let via_abs = RelPath::from_abs(root, &root.join("src").join("db").join("index.ts")).unwrap();
        assert!(files.contains(&via_abs));
    }
}

use crate::model::ImportKind;
use anyhow::Result;

/// One import/require specifier found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpecifier {
    pub raw: String,
    pub kind: ImportKind,
    pub type_only: bool,
    pub line: i64,
}

#[derive(Debug, Default)]
pub struct ExtractedFile {
    pub imports: Vec<ImportSpecifier>,
}

pub trait ImportExtractor: Send {
    fn extract(&mut self, source: &str) -> Result<ExtractedFile>;
}

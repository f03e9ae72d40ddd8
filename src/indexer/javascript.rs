use crate::indexer::extract::{ExtractedFile, ImportExtractor, ImportSpecifier};
use crate::model::ImportKind;
use anyhow::{Result, anyhow};
use tree_sitter::{Node, Parser};

pub struct JavascriptExtractor {
    parser: Parser,
}

pub struct TypescriptExtractor {
    parser: Parser,
}

pub struct TsxExtractor {
    parser: Parser,
}

impl JavascriptExtractor {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_javascript::LANGUAGE;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }
}

impl TypescriptExtractor {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }
}

impl TsxExtractor {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_typescript::LANGUAGE_TSX;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }
}

impl ImportExtractor for JavascriptExtractor {
    fn extract(&mut self, source: &str) -> Result<ExtractedFile> {
        extract_with_parser(&mut self.parser, source)
    }
}

impl ImportExtractor for TypescriptExtractor {
    fn extract(&mut self, source: &str) -> Result<ExtractedFile> {
        extract_with_parser(&mut self.parser, source)
    }
}

impl ImportExtractor for TsxExtractor {
    fn extract(&mut self, source: &str) -> Result<ExtractedFile> {
        extract_with_parser(&mut self.parser, source)
    }
}

fn extract_with_parser(parser: &mut Parser, source: &str) -> Result<ExtractedFile> {
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow!("parser returned no tree"))?;
    let mut output = ExtractedFile::default();
    walk_node(tree.root_node(), source, &mut output);
    Ok(output)
}

fn walk_node(node: Node<'_>, source: &str, output: &mut ExtractedFile) {
    match node.kind() {
        "import_statement" => handle_import(node, source, output),
        "export_statement" => handle_export(node, source, output),
        "call_expression" => handle_call(node, source, output),
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk_node(child, source, output);
    }
}

fn handle_import(node: Node<'_>, source: &str, output: &mut ExtractedFile) {
    let type_only = has_type_keyword(node);
    if let Some(raw) = node
        .child_by_field_name("source")
        .and_then(|n| string_value(n, source))
    {
        push(output, node, raw, ImportKind::Static, type_only);
        return;
    }
    // TS `import fs = require("fs")`
    let mut cursor = node.walk();
    let require_clause = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "import_require_clause");
    if let Some(raw) = require_clause
        .and_then(|clause| clause.child_by_field_name("source"))
        .and_then(|n| string_value(n, source))
    {
        push(output, node, raw, ImportKind::Require, type_only);
    }
}

fn handle_export(node: Node<'_>, source: &str, output: &mut ExtractedFile) {
    let Some(raw) = node
        .child_by_field_name("source")
        .and_then(|n| string_value(n, source))
    else {
        return;
    };
    let type_only = has_type_keyword(node);
    push(output, node, raw, ImportKind::Reexport, type_only);
}

fn handle_call(node: Node<'_>, source: &str, output: &mut ExtractedFile) {
    let Some(callee) = node.child_by_field_name("function") else {
        return;
    };
    let kind = match callee.kind() {
        "import" => ImportKind::Dynamic,
        "identifier" if node_text(callee, source) == "require" => ImportKind::Require,
        _ => return,
    };
    let Some(args) = node.child_by_field_name("arguments") else {
        return;
    };
    let Some(first) = args.named_child(0) else {
        return;
    };
    if let Some(raw) = string_value(first, source) {
        push(output, node, raw, kind, false);
    }
}

fn push(output: &mut ExtractedFile, node: Node<'_>, raw: String, kind: ImportKind, type_only: bool) {
    output.imports.push(ImportSpecifier {
        raw,
        kind,
        type_only,
        line: node.start_position().row as i64 + 1,
    });
}

// `import type ...` / `export type ... from`: the keyword is the anonymous
// token right after `import`/`export`.
fn has_type_keyword(node: Node<'_>) -> bool {
    node.child(1)
        .map(|child| !child.is_named() && child.kind() == "type")
        .unwrap_or(false)
}

/// Literal value of a string or substitution-free template string.
fn string_value(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "string" => unquote_string_literal(&node_text(node, source)),
        "template_string" => {
            let mut cursor = node.walk();
            let has_substitution = node
                .named_children(&mut cursor)
                .any(|child| child.kind() == "template_substitution");
            if has_substitution {
                None
            } else {
                unquote_string_literal(&node_text(node, source))
            }
        }
        _ => None,
    }
}

fn unquote_string_literal(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() < 2 {
        return None;
    }
    let first = trimmed.chars().next()?;
    if first == '"' || first == '\'' || first == '`' {
        let last = trimmed.chars().last()?;
        if last == first {
            return Some(trimmed[1..trimmed.len() - 1].to_string());
        }
    }
    None
}

fn node_text(node: Node<'_>, source: &str) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    source.get(start..end).unwrap_or("").trim().to_string()
}

use crate::path::RelPath;
use crate::resolve::fileset::FileSet;

// TS sources import the emitted name (`./x.js`) of a `./x.ts` module.
const TS_SIBLINGS: &[(&str, &[&str])] = &[
    (".js", &[".ts", ".tsx"]),
    (".jsx", &[".tsx"]),
    (".mjs", &[".mts"]),
    (".cjs", &[".cts"]),
];

/// Ordered on-disk candidates for a root-relative fragment.
///
/// Order: the fragment itself, TS siblings of a `.js`-style fragment, the
/// fragment with each extension appended, then `<fragment>/<index><ext>` for
/// every index name (outer) and extension (inner). Duplicates keep their
/// first position.
pub fn candidates(fragment: &RelPath, extensions: &[String], index_files: &[String]) -> Vec<RelPath> {
    let mut out: Vec<RelPath> = Vec::new();
    let mut push = |candidate: RelPath| {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    };

    push(fragment.clone());

    let raw = fragment.as_str();
    for (js_ext, ts_exts) in TS_SIBLINGS {
        if let Some(stem) = raw.strip_suffix(js_ext) {
            if stem.is_empty() || stem.ends_with('/') {
                continue;
            }
            for ts_ext in ts_exts.iter() {
                push(RelPath::from_trusted(format!("{stem}{ts_ext}")));
            }
        }
    }

    for ext in extensions {
        push(fragment.with_suffix(ext));
    }

    for index in index_files {
        let Ok(dir_index) = fragment.join(index) else {
            continue;
        };
        for ext in extensions {
            push(dir_index.with_suffix(ext));
        }
    }
    out
}

/// First candidate present in `files`, honoring candidate order.
pub fn resolve_fragment(
    files: &FileSet,
    fragment: &RelPath,
    extensions: &[String],
    index_files: &[String],
) -> Option<RelPath> {
    candidates(fragment, extensions, index_files)
        .into_iter()
        .find(|candidate| files.contains(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(raw: &str) -> RelPath {
        RelPath::new(raw).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn candidate_order_is_exact_then_extensions_then_index() {
        let got = candidates(&rel("src/x"), &strings(&[".ts", ".js"]), &strings(&["index"]));
        let got: Vec<&str> = got.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            got,
            vec!["src/x", "src/x.ts", "src/x.js", "src/x/index.ts", "src/x/index.js"]
        );
    }

    #[test]
    fn extension_order_decides_between_siblings() {
        let files = FileSet::from_paths([rel("src/x.ts"), rel("src/x.js")]);
        let ts_first = resolve_fragment(&files, &rel("src/x"), &strings(&[".ts", ".js"]), &[]);
        assert_eq!(ts_first.unwrap().as_str(), "src/x.ts");
        let js_first = resolve_fragment(&files, &rel("src/x"), &strings(&[".js", ".ts"]), &[]);
        assert_eq!(js_first.unwrap().as_str(), "src/x.js");
    }

    #[test]
    fn directory_index_fallback() {
        let files = FileSet::from_paths([rel("src/db/index.ts")]);
        let got = resolve_fragment(&files, &rel("src/db"), &strings(&[".ts"]), &strings(&["index"]));
        assert_eq!(got.unwrap().as_str(), "src/db/index.ts");
    }

    #[test]
    fn js_specifier_finds_ts_source() {
        let files = FileSet::from_paths([rel("src/util.ts")]);
        let got = resolve_fragment(&files, &rel("src/util.js"), &strings(&[".ts"]), &[]);
        assert_eq!(got.unwrap().as_str(), "src/util.ts");
    }

    #[test]
    fn exact_file_beats_ts_sibling() {
        let files = FileSet::from_paths([rel("src/util.ts"), rel("src/util.js")]);
        let got = resolve_fragment(&files, &rel("src/util.js"), &strings(&[".ts"]), &[]);
        assert_eq!(got.unwrap().as_str(), "src/util.js");
    }

    #[test]
    fn no_candidate_present() {
        let files = FileSet::from_paths([rel("src/other.ts")]);
        assert!(resolve_fragment(&files, &rel("src/x"), &strings(&[".ts"]), &strings(&["index"])).is_none());
    }
}

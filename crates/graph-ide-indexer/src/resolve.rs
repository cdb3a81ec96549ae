//! Cross-file name resolution: module specifiers, imports, re-export chains

use crate::declarations::{ExportTarget, FileAnalysis, ImportBinding};
use graph_ide_core::{split_symbol_id, symbol_id, SymbolId, SymbolTable};
use std::collections::{HashMap, HashSet};

/// Re-export chains longer than this are treated as unresolvable.
const MAX_EXPORT_DEPTH: usize = 16;

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "d.ts", "js", "jsx", "mjs", "cjs"];

/// Resolve a relative import specifier to a project file path.
///
/// Bare specifiers (`react`, `@scope/pkg`) are library imports and never resolve.
pub fn resolve_module_specifier(from_file: &str, specifier: &str, files: &HashSet<String>) -> Option<String> {
    if !specifier.starts_with('.') {
        return None;
    }
    let base_dir = from_file.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let joined = normalize_join(base_dir, specifier)?;

    if files.contains(&joined) {
        return Some(joined);
    }

    // ESM-style `./x.js` that actually points at `./x.ts`.
    for js_ext in [".js", ".jsx", ".mjs", ".cjs"] {
        if let Some(stem) = joined.strip_suffix(js_ext) {
            for ts_ext in ["ts", "tsx", "mts", "cts"] {
                let candidate = format!("{}.{}", stem, ts_ext);
                if files.contains(&candidate) {
                    return Some(candidate);
                }
            }
        }
    }

    let with_ext = SOURCE_EXTENSIONS
        .iter()
        .map(|ext| format!("{}.{}", joined, ext))
        .find(|candidate| files.contains(candidate));
    if with_ext.is_some() {
        return with_ext;
    }

    let prefix = if joined.is_empty() { String::new() } else { format!("{}/", joined) };
    SOURCE_EXTENSIONS
        .iter()
        .map(|ext| format!("{}index.{}", prefix, ext))
        .find(|candidate| files.contains(candidate))
}

fn normalize_join(base_dir: &str, specifier: &str) -> Option<String> {
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Escaping the project root cannot name a project file.
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Whole-program view over every analysed file plus the global symbol map.
pub struct ProgramIndex<'a> {
    files: HashMap<&'a str, &'a FileAnalysis>,
    symbols: &'a SymbolTable,
}

impl<'a> ProgramIndex<'a> {
    pub fn new(analyses: &'a [FileAnalysis], symbols: &'a SymbolTable) -> Self {
        Self {
            files: analyses.iter().map(|a| (a.path.as_str(), a)).collect(),
            symbols,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        self.symbols
    }

    /// Resolve a bare identifier used in `file` to its declaring symbol.
    pub fn resolve_name(&self, file: &str, name: &str) -> Option<SymbolId> {
        self.resolve_local(file, name, 0)
    }

    fn resolve_local(&self, file: &str, name: &str, depth: usize) -> Option<SymbolId> {
        let analysis = self.files.get(file)?;
        if let Some(binding) = analysis.imports.get(name) {
            return match binding {
                ImportBinding::Named {
                    module: Some(module),
                    imported,
                } => self.resolve_export(module, imported, depth + 1),
                _ => None,
            };
        }
        analysis
            .declared
            .contains_key(name)
            .then(|| symbol_id(file, name))
    }

    /// Follow `exported` out of `file` to the declaration it names.
    ///
    /// `default` resolves to the default-exported declaration's own name.
    pub fn resolve_export(&self, file: &str, exported: &str, depth: usize) -> Option<SymbolId> {
        if depth > MAX_EXPORT_DEPTH {
            tracing::debug!("Re-export chain through {} too deep for '{}'", file, exported);
            return None;
        }
        let analysis = self.files.get(file)?;
        match analysis.exports.get(exported) {
            Some(ExportTarget::Local(local)) => self.resolve_local(file, local, depth),
            Some(ExportTarget::ReExport {
                module: Some(module),
                imported,
            }) => self.resolve_export(module, imported, depth + 1),
            Some(ExportTarget::ReExport { module: None, .. }) => None,
            None if exported == "default" => None,
            None => analysis
                .star_exports
                .iter()
                .find_map(|star| self.resolve_export(star, exported, depth + 1)),
        }
    }

    /// Resolve `object.property` used in `file`: namespace member, class static
    /// member, then same-file `object.property`.
    pub fn resolve_member(&self, file: &str, object: &str, property: &str) -> Option<SymbolId> {
        let analysis = self.files.get(file)?;
        if let Some(ImportBinding::Namespace { module }) = analysis.imports.get(object) {
            return module
                .as_deref()
                .and_then(|module| self.resolve_export(module, property, 0));
        }

        if let Some(target) = self.resolve_name(file, object) {
            if let Some((target_file, target_name)) = split_symbol_id(&target) {
                let member = symbol_id(target_file, &format!("{}.{}", target_name, property));
                if self.symbols.contains(&member) {
                    return Some(member);
                }
            }
        }

        let fallback = symbol_id(file, &format!("{}.{}", object, property));
        self.symbols.contains(&fallback).then_some(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn relative_specifiers_try_extensions_and_index() {
        let set = files(&["src/a.ts", "src/util/index.ts", "src/view.tsx", "lib/b.js", "src/esm.ts"]);
        assert_eq!(resolve_module_specifier("src/x.ts", "./a", &set).as_deref(), Some("src/a.ts"));
        assert_eq!(resolve_module_specifier("src/x.ts", "./a.ts", &set).as_deref(), Some("src/a.ts"));
        assert_eq!(resolve_module_specifier("src/x.ts", "./util", &set).as_deref(), Some("src/util/index.ts"));
        assert_eq!(resolve_module_specifier("src/x.ts", "./view", &set).as_deref(), Some("src/view.tsx"));
        assert_eq!(resolve_module_specifier("src/x.ts", "../lib/b", &set).as_deref(), Some("lib/b.js"));
        assert_eq!(resolve_module_specifier("src/x.ts", "./esm.js", &set).as_deref(), Some("src/esm.ts"));
    }

    #[test]
    fn bare_and_escaping_specifiers_do_not_resolve() {
        let set = files(&["react.ts", "a.ts"]);
        assert_eq!(resolve_module_specifier("a.ts", "react", &set), None);
        assert_eq!(resolve_module_specifier("a.ts", "../outside", &set), None);
        assert_eq!(resolve_module_specifier("a.ts", "./missing", &set), None);
    }
}

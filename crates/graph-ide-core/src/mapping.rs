//! Symbol → module resolution through glob-based mapping overrides
//!
//! A symbol is owned by at most one module. Lookup priority is
//! symbol id, then exact file path, then the most specific directory glob.

use crate::model::{split_symbol_id, ModuleNode};
use std::collections::HashMap;

/// A compiled directory mapping such as `src/auth/**` or `src/auth/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirPattern {
    base: String,
    recursive: bool,
}

impl DirPattern {
    /// Parse a directory pattern. A bare directory is treated as recursive.
    pub fn parse(pattern: &str) -> Self {
        let normalized = normalize_path(pattern);
        if let Some(base) = normalized.strip_suffix("/**").or_else(|| (normalized == "**").then_some("")) {
            DirPattern { base: base.to_string(), recursive: true }
        } else if let Some(base) = normalized.strip_suffix("/*").or_else(|| (normalized == "*").then_some("")) {
            DirPattern { base: base.to_string(), recursive: false }
        } else {
            DirPattern { base: normalized, recursive: true }
        }
    }

    pub fn matches(&self, file_path: &str) -> bool {
        let rest = if self.base.is_empty() {
            file_path
        } else {
            match file_path.strip_prefix(self.base.as_str()).and_then(|r| r.strip_prefix('/')) {
                Some(rest) => rest,
                None => return false,
            }
        };
        self.recursive || !rest.contains('/')
    }

    /// `segments * 10`, plus 5 for direct-children patterns.
    pub fn specificity(&self) -> u32 {
        let segments = self.base.split('/').filter(|s| !s.is_empty()).count() as u32;
        segments * 10 + if self.recursive { 0 } else { 5 }
    }
}

/// Resolves symbols to module ids.
#[derive(Debug, Clone, Default)]
pub struct MappingResolver {
    by_symbol: HashMap<String, String>,
    by_file: HashMap<String, String>,
    directories: Vec<(DirPattern, String)>,
}

impl MappingResolver {
    pub fn new(modules: &[ModuleNode]) -> Self {
        let mut resolver = MappingResolver::default();
        for module in modules {
            for symbol in &module.mappings.symbols {
                resolver
                    .by_symbol
                    .entry(normalize_symbol(symbol))
                    .or_insert_with(|| module.id.clone());
            }
            for file in &module.mappings.files {
                resolver
                    .by_file
                    .entry(normalize_path(file))
                    .or_insert_with(|| module.id.clone());
            }
            for dir in &module.mappings.directories {
                resolver.directories.push((DirPattern::parse(dir), module.id.clone()));
            }
        }
        resolver
    }

    /// Module owning `symbol_id`, or `None` when the symbol is unclassified.
    pub fn resolve_module(&self, symbol_id: &str) -> Option<&str> {
        if let Some(module) = self.by_symbol.get(symbol_id) {
            return Some(module);
        }
        let (file_path, _) = split_symbol_id(symbol_id)?;
        self.resolve_file(file_path)
    }

    /// Module owning a whole file (file mapping, then directory globs).
    pub fn resolve_file(&self, file_path: &str) -> Option<&str> {
        if let Some(module) = self.by_file.get(file_path) {
            return Some(module);
        }

        let mut best: Option<(u32, &str)> = None;
        for (pattern, module) in &self.directories {
            if !pattern.matches(file_path) {
                continue;
            }
            let score = pattern.specificity();
            if best.is_none_or(|(best_score, _)| score > best_score) {
                best = Some((score, module));
            }
        }
        best.map(|(_, module)| module)
    }
}

/// Strip `./` prefixes, trailing slashes and normalize separators.
pub fn normalize_path(path: &str) -> String {
    let mut p = path.trim().replace('\\', "/");
    while let Some(stripped) = p.strip_prefix("./") {
        p = stripped.to_string();
    }
    p.trim_end_matches('/').to_string()
}

fn normalize_symbol(symbol: &str) -> String {
    match split_symbol_id(symbol.trim()) {
        Some((file, name)) => format!("{}:{}", normalize_path(file), name),
        None => symbol.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModuleMappings;

    fn module(id: &str, directories: &[&str], files: &[&str], symbols: &[&str]) -> ModuleNode {
        ModuleNode {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            parent_id: None,
            mappings: ModuleMappings {
                directories: directories.iter().map(|s| s.to_string()).collect(),
                files: files.iter().map(|s| s.to_string()).collect(),
                symbols: symbols.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn direct_children_pattern_stops_at_one_level() {
        let pattern = DirPattern::parse("src/api/*");
        assert!(pattern.matches("src/api/users.ts"));
        assert!(!pattern.matches("src/api/v1/users.ts"));
        assert!(!pattern.matches("src/apiary.ts"));

        let recursive = DirPattern::parse("./src/api/**");
        assert!(recursive.matches("src/api/v1/users.ts"));
        assert_eq!(recursive.specificity(), 20);
        assert_eq!(pattern.specificity(), 25);
    }

    #[test]
    fn file_mapping_beats_directory_glob_regardless_of_order() {
        let modules = vec![
            module("mod-dir", &["src/**"], &[], &[]),
            module("mod-file", &[], &["src/auth/login.ts"], &[]),
        ];
        let resolver = MappingResolver::new(&modules);
        assert_eq!(resolver.resolve_module("src/auth/login.ts:login"), Some("mod-file"));

        let reversed: Vec<ModuleNode> = modules.into_iter().rev().collect();
        let resolver = MappingResolver::new(&reversed);
        assert_eq!(resolver.resolve_module("src/auth/login.ts:login"), Some("mod-file"));
    }

    #[test]
    fn symbol_mapping_beats_file_mapping() {
        let modules = vec![
            module("files", &[], &["src/auth/login.ts"], &[]),
            module("symbols", &[], &[], &["./src/auth/login.ts:hashPassword"]),
        ];
        let resolver = MappingResolver::new(&modules);
        assert_eq!(resolver.resolve_module("src/auth/login.ts:hashPassword"), Some("symbols"));
        assert_eq!(resolver.resolve_module("src/auth/login.ts:login"), Some("files"));
    }

    #[test]
    fn most_specific_directory_wins() {
        let modules = vec![
            module("deep", &["src/features/billing/**"], &[], &[]),
            module("shallow", &["src/**"], &[], &[]),
        ];
        let resolver = MappingResolver::new(&modules);
        assert_eq!(resolver.resolve_module("src/features/billing/invoice.ts:x"), Some("deep"));
        assert_eq!(resolver.resolve_module("src/main.ts:x"), Some("shallow"));
        assert_eq!(resolver.resolve_module("scripts/seed.ts:x"), None);
    }

    #[test]
    fn equal_directory_scores_keep_the_first_module() {
        let modules = vec![
            module("first", &["src/shared/**"], &[], &[]),
            module("second", &["src/shared/**"], &[], &[]),
            module("broad", &["src/**"], &[], &[]),
        ];
        let resolver = MappingResolver::new(&modules);
        assert_eq!(resolver.resolve_module("src/shared/util.ts:x"), Some("first"));

        // A later, more specific pattern still beats an earlier broad one.
        let reordered = vec![
            module("broad", &["src/**"], &[], &[]),
            module("second", &["src/shared/**"], &[], &[]),
            module("first", &["src/shared/**"], &[], &[]),
        ];
        let resolver = MappingResolver::new(&reordered);
        assert_eq!(resolver.resolve_module("src/shared/util.ts:x"), Some("second"));
    }
}

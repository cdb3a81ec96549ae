//! Edge pass: one linear scan of each file's arena

use crate::arena::NodeIdx;
use crate::declarations::FileAnalysis;
use crate::resolve::ProgramIndex;
use crate::scope::{containing_function, enclosing_class_name, is_value_reference, is_write, LocalScopes};
use graph_ide_core::{symbol_id, DependencyEdge, DependencyKind, SourceLocation, SymbolId, SymbolKind};
use std::collections::HashSet;

/// Accumulates deduplicated symbol edges across files.
#[derive(Debug, Default)]
pub struct EdgeCollector {
    seen: HashSet<String>,
    edges: Vec<DependencyEdge>,
}

impl EdgeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge unless it is a self-reference or already recorded.
    pub fn push(&mut self, source: SymbolId, target: SymbolId, kind: DependencyKind, location: SourceLocation) -> bool {
        if source == target {
            return false;
        }
        let key = DependencyEdge::key(&source, &target, kind);
        if !self.seen.insert(key) {
            return false;
        }
        self.edges.push(DependencyEdge::new(source, target, kind, location));
        true
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn into_edges(self) -> Vec<DependencyEdge> {
        self.edges
    }
}

/// Scans one file and records every edge whose site has a caller.
pub struct FileEdgeScanner<'a> {
    file: &'a FileAnalysis,
    index: &'a ProgramIndex<'a>,
    scopes: LocalScopes,
}

impl<'a> FileEdgeScanner<'a> {
    pub fn new(file: &'a FileAnalysis, index: &'a ProgramIndex<'a>) -> Self {
        Self {
            file,
            index,
            scopes: LocalScopes::build(&file.arena),
        }
    }

    pub fn scan(&self, collector: &mut EdgeCollector) {
        let arena = &self.file.arena;
        let before = collector.len();
        let symbols = self.index.symbols();
        let is_symbol = |name: &str| symbols.contains(&symbol_id(&self.file.path, name));

        for idx in 0..arena.len() {
            let Some((target, kind)) = self.classify_site(idx) else {
                continue;
            };
            let Some(caller) = containing_function(arena, idx, &is_symbol) else {
                continue;
            };
            let source = symbol_id(&self.file.path, &caller);
            let location = SourceLocation {
                file: self.file.path.clone(),
                line: arena.line(idx),
            };
            collector.push(source, target, kind, location);
        }

        tracing::debug!("{}: {} edges", self.file.path, collector.len() - before);
    }

    /// Resolve what a node depends on, if it is an edge site.
    fn classify_site(&self, idx: NodeIdx) -> Option<(SymbolId, DependencyKind)> {
        let arena = &self.file.arena;
        let symbols = self.index.symbols();

        match arena.kind(idx) {
            "call_expression" => {
                let callee = arena.child_by_field(idx, "function")?;
                let target = self.resolve_callee(callee)?;
                symbols.contains(&target).then_some((target, DependencyKind::Call))
            }
            "new_expression" => {
                let constructor = arena.child_by_field(idx, "constructor")?;
                let target = self.resolve_callee(constructor)?;
                (symbols.lookup(&target) == Some(SymbolKind::Class))
                    .then_some((target, DependencyKind::ClassInstantiation))
            }
            "jsx_opening_element" | "jsx_self_closing_element" => {
                let tag = arena.child_by_field(idx, "name")?;
                let starts_upper = arena
                    .text(tag)
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_uppercase());
                if !starts_upper {
                    return None;
                }
                let target = self.resolve_callee(tag)?;
                symbols.contains(&target).then_some((target, DependencyKind::ComponentUse))
            }
            "identifier" | "shorthand_property_identifier" | "shorthand_property_identifier_pattern" => {
                if !is_value_reference(arena, idx) {
                    return None;
                }
                let target = self.resolve_identifier(idx)?;
                match symbols.lookup(&target)? {
                    SymbolKind::Enum => Some((target, DependencyKind::EnumUse)),
                    kind if kind.is_global() => {
                        let edge_kind = if is_write(arena, idx) {
                            DependencyKind::GlobalWrite
                        } else {
                            DependencyKind::GlobalRead
                        };
                        Some((target, edge_kind))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn resolve_identifier(&self, idx: NodeIdx) -> Option<SymbolId> {
        let name = self.file.arena.text(idx);
        if self.scopes.is_shadowed(&self.file.arena, idx, name) {
            return None;
        }
        self.index
            .resolve_name(&self.file.path, name)
            .or_else(|| self.same_file(name))
    }

    /// Resolve a callee, constructor or JSX tag expression.
    fn resolve_callee(&self, expr: NodeIdx) -> Option<SymbolId> {
        let arena = &self.file.arena;
        match arena.kind(expr) {
            "identifier" => self.resolve_identifier(expr),
            "member_expression" => {
                let object = arena.child_by_field(expr, "object")?;
                let property = arena.field_text(expr, "property")?;
                match arena.kind(object) {
                    "identifier" => {
                        let name = arena.text(object);
                        if self.scopes.is_shadowed(arena, object, name) {
                            return None;
                        }
                        self.index.resolve_member(&self.file.path, name, property)
                    }
                    "this" => {
                        let class = enclosing_class_name(arena, expr)?;
                        self.same_file(&format!("{}.{}", class, property))
                    }
                    _ => None,
                }
            }
            // `<UI.Button>` in grammars that model dotted JSX names separately.
            "nested_identifier" => {
                let (object, property) = arena.text(expr).split_once('.')?;
                self.index.resolve_member(&self.file.path, object, property)
            }
            _ => None,
        }
    }

    fn same_file(&self, name: &str) -> Option<SymbolId> {
        let id = symbol_id(&self.file.path, name);
        self.index.symbols().contains(&id).then_some(id)
    }
}

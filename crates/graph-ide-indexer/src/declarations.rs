//! Per-file declaration pass: top-level symbols, import table, export table

use crate::arena::{NodeIdx, SyntaxArena};
use crate::resolve::resolve_module_specifier;
use graph_ide_core::{symbol_id, Parameter, Symbol, SymbolKind};
use std::collections::{HashMap, HashSet};

/// How a local name was brought in by an `import`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportBinding {
    /// `import { a as b }` or `import b` (`imported == "default"`).
    Named {
        module: Option<String>,
        imported: String,
    },
    /// `import * as ns`.
    Namespace { module: Option<String> },
}

/// What an exported name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// A binding of this file (a declaration or an imported name).
    Local(String),
    /// `export { a as b } from './m'`.
    ReExport {
        module: Option<String>,
        imported: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeSlot {
    Parameter(usize),
    Return,
}

/// A type annotation naming a bare identifier, resolved once every file is known.
#[derive(Debug, Clone)]
pub(crate) struct TypeRef {
    pub symbol: usize,
    pub slot: TypeSlot,
    pub name: String,
}

/// Everything the later passes need to know about one parsed file.
#[derive(Debug)]
pub struct FileAnalysis {
    pub path: String,
    pub arena: SyntaxArena,
    pub symbols: Vec<Symbol>,
    /// Top-level names declared in this file.
    pub declared: HashMap<String, SymbolKind>,
    /// Callable class members as `Class.member`.
    pub members: Vec<String>,
    pub imports: HashMap<String, ImportBinding>,
    pub exports: HashMap<String, ExportTarget>,
    /// Resolved targets of `export * from`.
    pub star_exports: Vec<String>,
    pub(crate) type_refs: Vec<TypeRef>,
}

pub fn analyze_file(path: String, arena: SyntaxArena, project_files: &HashSet<String>) -> FileAnalysis {
    let collected = {
        let mut collector = Collector::new(&arena, &path, project_files);
        for stmt in arena.named_children(SyntaxArena::ROOT) {
            collector.statement(stmt);
        }
        collector.finish()
    };

    FileAnalysis {
        path,
        arena,
        symbols: collected.symbols,
        declared: collected.declared,
        members: collected.members,
        imports: collected.imports,
        exports: collected.exports,
        star_exports: collected.star_exports,
        type_refs: collected.type_refs,
    }
}

const FUNCTION_VALUES: &[&str] = &["arrow_function", "function_expression", "function", "generator_function"];

struct Collector<'a> {
    arena: &'a SyntaxArena,
    path: &'a str,
    project_files: &'a HashSet<String>,
    symbols: Vec<Symbol>,
    declared: HashMap<String, SymbolKind>,
    members: Vec<String>,
    imports: HashMap<String, ImportBinding>,
    exports: HashMap<String, ExportTarget>,
    star_exports: Vec<String>,
    type_refs: Vec<TypeRef>,
    /// Names exported by a later `export { x }` clause.
    exported_later: HashSet<String>,
}

struct Collected {
    symbols: Vec<Symbol>,
    declared: HashMap<String, SymbolKind>,
    members: Vec<String>,
    imports: HashMap<String, ImportBinding>,
    exports: HashMap<String, ExportTarget>,
    star_exports: Vec<String>,
    type_refs: Vec<TypeRef>,
}

impl<'a> Collector<'a> {
    fn new(arena: &'a SyntaxArena, path: &'a str, project_files: &'a HashSet<String>) -> Self {
        Self {
            arena,
            path,
            project_files,
            symbols: Vec::new(),
            declared: HashMap::new(),
            members: Vec::new(),
            imports: HashMap::new(),
            exports: HashMap::new(),
            star_exports: Vec::new(),
            type_refs: Vec::new(),
            exported_later: HashSet::new(),
        }
    }

    fn finish(mut self) -> Collected {
        for symbol in &mut self.symbols {
            if self.exported_later.contains(&symbol.name) {
                symbol.exported = true;
            }
        }
        Collected {
            symbols: self.symbols,
            declared: self.declared,
            members: self.members,
            imports: self.imports,
            exports: self.exports,
            star_exports: self.star_exports,
            type_refs: self.type_refs,
        }
    }

    fn statement(&mut self, stmt: NodeIdx) {
        match self.arena.kind(stmt) {
            "import_statement" => self.import(stmt),
            "export_statement" => self.export(stmt),
            "ambient_declaration" => {
                let inner: Vec<NodeIdx> = self.arena.named_children(stmt).collect();
                for decl in inner {
                    self.declaration(decl, stmt, false);
                }
            }
            _ => {
                self.declaration(stmt, stmt, false);
            }
        }
    }

    /// Record a declaration node; returns the names it declared.
    fn declaration(&mut self, node: NodeIdx, doc_anchor: NodeIdx, exported: bool) -> Vec<String> {
        let arena = self.arena;
        let simple = |kind| arena.field_text(node, "name").map(|name| (name.to_string(), kind));

        let declared = match arena.kind(node) {
            "function_declaration" | "generator_function_declaration" => {
                let Some(name) = arena.field_text(node, "name") else {
                    return Vec::new();
                };
                self.push_symbol(name, SymbolKind::Function, node, doc_anchor, exported, Some(node));
                return vec![name.to_string()];
            }
            "class_declaration" | "abstract_class_declaration" => {
                let Some(name) = arena.field_text(node, "name") else {
                    return Vec::new();
                };
                self.push_symbol(name, SymbolKind::Class, node, doc_anchor, exported, None);
                self.class_members(name, node);
                return vec![name.to_string()];
            }
            "interface_declaration" => simple(SymbolKind::Interface),
            "type_alias_declaration" => simple(SymbolKind::Type),
            "enum_declaration" => simple(SymbolKind::Enum),
            "lexical_declaration" | "variable_declaration" => {
                return self.variable_declaration(node, doc_anchor, exported);
            }
            _ => None,
        };

        match declared {
            Some((name, kind)) => {
                self.push_symbol(&name, kind, node, doc_anchor, exported, None);
                vec![name]
            }
            None => Vec::new(),
        }
    }

    fn variable_declaration(&mut self, node: NodeIdx, doc_anchor: NodeIdx, exported: bool) -> Vec<String> {
        let arena = self.arena;
        let is_const = arena
            .children(node)
            .first()
            .is_some_and(|&first| arena.text(first) == "const");
        let base_kind = if is_const { SymbolKind::Constant } else { SymbolKind::Variable };

        let declarators: Vec<NodeIdx> = arena
            .named_children(node)
            .filter(|&c| arena.kind(c) == "variable_declarator")
            .collect();

        let mut names = Vec::new();
        for declarator in declarators {
            let Some(name_node) = arena.child_by_field(declarator, "name") else {
                continue;
            };
            // Destructuring declarations bind no single symbol.
            if arena.kind(name_node) != "identifier" {
                continue;
            }
            let name = arena.text(name_node);
            let value = arena.child_by_field(declarator, "value");
            let value_kind = value.map(|v| arena.kind(v));

            let (kind, function_node) = match value_kind {
                Some(k) if FUNCTION_VALUES.contains(&k) => (SymbolKind::Function, value),
                Some("object") => (SymbolKind::Object, None),
                _ => (base_kind, None),
            };
            self.push_symbol(name, kind, node, doc_anchor, exported, function_node);
            names.push(name.to_string());
        }
        names
    }

    fn class_members(&mut self, class_name: &str, class_node: NodeIdx) {
        let arena = self.arena;
        let Some(body) = arena.child_by_field(class_node, "body") else {
            return;
        };
        for member in arena.named_children(body) {
            let name_node = match arena.kind(member) {
                "method_definition" => arena.child_by_field(member, "name"),
                "public_field_definition" | "field_definition" => {
                    let name = arena
                        .child_by_field(member, "name")
                        .or_else(|| arena.child_by_field(member, "property"));
                    let callable = arena
                        .child_by_field(member, "value")
                        .is_some_and(|v| FUNCTION_VALUES.contains(&arena.kind(v)));
                    if callable { name } else { None }
                }
                _ => None,
            };
            let Some(name_node) = name_node else {
                continue;
            };
            if !matches!(
                arena.kind(name_node),
                "property_identifier" | "private_property_identifier" | "identifier"
            ) {
                continue;
            }
            let qualified = format!("{}.{}", class_name, arena.text(name_node));
            if !self.members.contains(&qualified) {
                self.members.push(qualified);
            }
        }
    }

    fn push_symbol(
        &mut self,
        name: &str,
        kind: SymbolKind,
        span: NodeIdx,
        doc_anchor: NodeIdx,
        exported: bool,
        function_node: Option<NodeIdx>,
    ) {
        // Declaration merging and overloads keep the first declaration.
        if self.declared.contains_key(name) {
            return;
        }
        self.declared.insert(name.to_string(), kind);

        let index = self.symbols.len();
        let (parameters, return_type_text) = match function_node {
            Some(func) => (Some(self.parameters(index, func)), self.return_type(index, func)),
            None => (None, None),
        };
        let node = self.arena.node(span);

        self.symbols.push(Symbol {
            id: symbol_id(self.path, name),
            name: name.to_string(),
            kind,
            file_path: self.path.to_string(),
            start_line: node.start_line,
            end_line: node.end_line,
            exported,
            description: jsdoc_description(self.arena, doc_anchor),
            parameters,
            return_type_id: None,
            return_type_text,
        });
    }

    fn parameters(&mut self, symbol: usize, func: NodeIdx) -> Vec<Parameter> {
        let arena = self.arena;
        // `x => ...` has a bare `parameter` instead of a parameter list.
        if let Some(single) = arena.child_by_field(func, "parameter") {
            return vec![Parameter {
                name: arena.text(single).to_string(),
                type_id: None,
                type_text: None,
            }];
        }
        let Some(list) = arena.child_by_field(func, "parameters") else {
            return Vec::new();
        };

        let mut params = Vec::new();
        for param in arena.named_children(list) {
            let (name_node, annotation) = match arena.kind(param) {
                "required_parameter" | "optional_parameter" => (
                    arena.child_by_field(param, "pattern"),
                    arena.child_by_field(param, "type"),
                ),
                "assignment_pattern" => (arena.child_by_field(param, "left"), None),
                "identifier" | "rest_pattern" | "object_pattern" | "array_pattern" => (Some(param), None),
                _ => (None, None),
            };
            let Some(name_node) = name_node else {
                continue;
            };
            let type_text = annotation.map(|a| {
                self.note_type_ref(symbol, TypeSlot::Parameter(params.len()), a);
                annotation_text(arena, a)
            });
            params.push(Parameter {
                name: arena.text(name_node).to_string(),
                type_id: None,
                type_text,
            });
        }
        params
    }

    fn return_type(&mut self, symbol: usize, func: NodeIdx) -> Option<String> {
        let annotation = self.arena.child_by_field(func, "return_type")?;
        self.note_type_ref(symbol, TypeSlot::Return, annotation);
        Some(annotation_text(self.arena, annotation))
    }

    fn note_type_ref(&mut self, symbol: usize, slot: TypeSlot, annotation: NodeIdx) {
        let arena = self.arena;
        let Some(inner) = arena.named_children(annotation).next() else {
            return;
        };
        if arena.kind(inner) == "type_identifier" {
            self.type_refs.push(TypeRef {
                symbol,
                slot,
                name: arena.text(inner).to_string(),
            });
        }
    }

    fn import(&mut self, stmt: NodeIdx) {
        let arena = self.arena;
        let Some(source) = arena.child_by_field(stmt, "source") else {
            return;
        };
        let module = resolve_module_specifier(self.path, unquote(arena.text(source)), self.project_files);
        let Some(clause) = arena.child_of_kind(stmt, "import_clause") else {
            return;
        };

        for part in arena.named_children(clause) {
            match arena.kind(part) {
                "identifier" => {
                    self.imports.insert(
                        arena.text(part).to_string(),
                        ImportBinding::Named {
                            module: module.clone(),
                            imported: "default".to_string(),
                        },
                    );
                }
                "namespace_import" => {
                    if let Some(local) = arena.child_of_kind(part, "identifier") {
                        self.imports.insert(
                            arena.text(local).to_string(),
                            ImportBinding::Namespace { module: module.clone() },
                        );
                    }
                }
                "named_imports" => {
                    for spec in arena.named_children(part).filter(|&s| arena.kind(s) == "import_specifier") {
                        let Some(imported) = arena.field_text(spec, "name") else {
                            continue;
                        };
                        let local = arena.field_text(spec, "alias").unwrap_or(imported);
                        self.imports.insert(
                            local.to_string(),
                            ImportBinding::Named {
                                module: module.clone(),
                                imported: unquote(imported).to_string(),
                            },
                        );
                    }
                }
                _ => {}
            }
        }
    }

    fn export(&mut self, stmt: NodeIdx) {
        let arena = self.arena;
        let is_default = arena.children(stmt).iter().any(|&c| arena.kind(c) == "default");
        let module = arena
            .child_by_field(stmt, "source")
            .and_then(|s| resolve_module_specifier(self.path, unquote(arena.text(s)), self.project_files));
        let has_source = arena.child_by_field(stmt, "source").is_some();

        if let Some(decl) = arena.child_by_field(stmt, "declaration") {
            let names = self.declaration(decl, stmt, true);
            if is_default {
                if let Some(first) = names.into_iter().next() {
                    self.exports.insert("default".to_string(), ExportTarget::Local(first));
                }
            } else {
                for name in names {
                    self.exports.insert(name.clone(), ExportTarget::Local(name));
                }
            }
            return;
        }

        if let Some(value) = arena.child_by_field(stmt, "value") {
            if !is_default {
                return;
            }
            // Anonymous default functions and classes are declared as `default`.
            match arena.kind(value) {
                "identifier" => {
                    let name = arena.text(value).to_string();
                    self.exported_later.insert(name.clone());
                    self.exports.insert("default".to_string(), ExportTarget::Local(name));
                }
                kind if FUNCTION_VALUES.contains(&kind) => {
                    self.push_symbol("default", SymbolKind::Function, stmt, stmt, true, Some(value));
                    self.exports.insert("default".to_string(), ExportTarget::Local("default".to_string()));
                }
                "class" => {
                    self.push_symbol("default", SymbolKind::Class, stmt, stmt, true, None);
                    self.class_members("default", value);
                    self.exports.insert("default".to_string(), ExportTarget::Local("default".to_string()));
                }
                _ => {}
            }
            return;
        }

        if let Some(clause) = arena.child_of_kind(stmt, "export_clause") {
            for spec in arena.named_children(clause).filter(|&s| arena.kind(s) == "export_specifier") {
                let Some(name) = arena.field_text(spec, "name") else {
                    continue;
                };
                let name = unquote(name);
                let exported_as = arena.field_text(spec, "alias").map(unquote).unwrap_or(name);
                let target = if has_source {
                    ExportTarget::ReExport {
                        module: module.clone(),
                        imported: name.to_string(),
                    }
                } else {
                    self.exported_later.insert(name.to_string());
                    ExportTarget::Local(name.to_string())
                };
                self.exports.insert(exported_as.to_string(), target);
            }
            return;
        }

        // `export * from './m'`; `export * as ns from` is not followed.
        if has_source && arena.child_of_kind(stmt, "namespace_export").is_none() {
            if let Some(module) = module {
                self.star_exports.push(module);
            }
        }
    }
}

fn annotation_text(arena: &SyntaxArena, annotation: NodeIdx) -> String {
    arena.text(annotation).trim_start_matches(':').trim().to_string()
}

pub(crate) fn unquote(text: &str) -> &str {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}

/// Description text of the `/** ... */` comment directly before `anchor`, up to the first `@tag`.
pub fn jsdoc_description(arena: &SyntaxArena, anchor: NodeIdx) -> Option<String> {
    let prev = arena.prev_sibling(anchor)?;
    if arena.kind(prev) != "comment" {
        return None;
    }
    let body = arena.text(prev).strip_prefix("/**")?.strip_suffix("*/")?;

    let mut lines = Vec::new();
    for line in body.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        if line.starts_with('@') {
            break;
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    if lines.is_empty() { None } else { Some(lines.join(" ")) }
}

//! Caller attribution, local-binding shadowing, and reference classification

use crate::arena::{NodeIdx, SyntaxArena};
use std::collections::{HashMap, HashSet};

/// Nodes that open a function scope.
pub const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

const CLASS_KINDS: &[&str] = &["class_declaration", "abstract_class_declaration", "class"];

/// Any ancestor of these kinds puts an identifier in a type position.
const TYPE_CONTEXTS: &[&str] = &[
    "type_annotation",
    "type_arguments",
    "type_parameters",
    "type_query",
    "type_alias_declaration",
    "interface_declaration",
    "implements_clause",
    "extends_type_clause",
];

pub const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", ">>>=", "**=", "||=", "&&=", "??=",
];

pub fn is_function(arena: &SyntaxArena, idx: NodeIdx) -> bool {
    FUNCTION_KINDS.contains(&arena.kind(idx))
}

/// Name of the function a site belongs to, as used in its symbol id.
///
/// Walks outward to the nearest named function declaration, class method
/// (`Class.method`) or function expression bound to a named variable that
/// `is_symbol` accepts. Functions local to another function are not symbols,
/// so their sites belong to the enclosing one. Anonymous function
/// expressions (callbacks, IIFEs) end the walk with `None`.
pub fn containing_function(
    arena: &SyntaxArena,
    idx: NodeIdx,
    is_symbol: impl Fn(&str) -> bool,
) -> Option<String> {
    for ancestor in arena.ancestors(idx) {
        let name = match arena.kind(ancestor) {
            "function_declaration" | "generator_function_declaration" => {
                arena.field_text(ancestor, "name").map(str::to_string)
            }
            "method_definition" => arena.field_text(ancestor, "name").and_then(|method| {
                let class = enclosing_class_name(arena, ancestor)?;
                Some(format!("{}.{}", class, method))
            }),
            "arrow_function" | "function_expression" | "function" | "generator_function" => {
                Some(bound_function_name(arena, ancestor)?)
            }
            _ => continue,
        };
        if let Some(name) = name.filter(|n| is_symbol(n.as_str())) {
            return Some(name);
        }
    }
    None
}

/// Name a function expression is bound under, if any.
fn bound_function_name(arena: &SyntaxArena, func: NodeIdx) -> Option<String> {
    let parent = arena.parent(func)?;
    match arena.kind(parent) {
        "variable_declarator" if arena.field(func) == Some("value") => {
            let name = arena.child_by_field(parent, "name")?;
            (arena.kind(name) == "identifier").then(|| arena.text(name).to_string())
        }
        // `export default () => ...`
        "export_statement" if arena.field(func) == Some("value") => Some("default".to_string()),
        "public_field_definition" | "field_definition" if arena.field(func) == Some("value") => {
            let name = arena
                .field_text(parent, "name")
                .or_else(|| arena.field_text(parent, "property"))?;
            let class = enclosing_class_name(arena, parent)?;
            Some(format!("{}.{}", class, name))
        }
        _ => None,
    }
}

/// Name of the class whose body contains `member`.
pub fn enclosing_class_name(arena: &SyntaxArena, member: NodeIdx) -> Option<String> {
    let class = arena
        .ancestors(member)
        .find(|&a| CLASS_KINDS.contains(&arena.kind(a)))?;
    if let Some(name) = arena.field_text(class, "name") {
        return Some(name.to_string());
    }
    // `const Foo = class { ... }` or `export default class { ... }`
    let parent = arena.parent(class)?;
    match arena.kind(parent) {
        "variable_declarator" => arena.field_text(parent, "name").map(str::to_string),
        "export_statement" => Some("default".to_string()),
        _ => None,
    }
}

/// Locally bound names of every function scope in a file.
#[derive(Debug, Default)]
pub struct LocalScopes {
    bindings: HashMap<NodeIdx, HashSet<String>>,
}

impl LocalScopes {
    pub fn build(arena: &SyntaxArena) -> Self {
        let mut bindings = HashMap::new();
        for func in (0..arena.len()).filter(|&i| is_function(arena, i)) {
            let names = function_bindings(arena, func);
            if !names.is_empty() {
                bindings.insert(func, names);
            }
        }
        Self { bindings }
    }

    /// Whether `name` at `idx` refers to a binding local to an enclosing function.
    pub fn is_shadowed(&self, arena: &SyntaxArena, idx: NodeIdx, name: &str) -> bool {
        arena
            .ancestors(idx)
            .filter_map(|a| self.bindings.get(&a))
            .any(|names| names.contains(name))
    }
}

fn function_bindings(arena: &SyntaxArena, func: NodeIdx) -> HashSet<String> {
    let mut names = HashSet::new();

    if let Some(single) = arena.child_by_field(func, "parameter") {
        collect_pattern(arena, single, &mut names);
    }
    if let Some(params) = arena.child_by_field(func, "parameters") {
        collect_pattern(arena, params, &mut names);
    }
    // A named function expression can refer to itself.
    if matches!(arena.kind(func), "function_expression" | "function" | "generator_function") {
        if let Some(name) = arena.field_text(func, "name") {
            names.insert(name.to_string());
        }
    }

    let Some(body) = arena.child_by_field(func, "body") else {
        return names;
    };
    // Nested functions own their own bindings; only their names leak out.
    for node in arena.descendants_pruned(body, |n| is_function(arena, n) || CLASS_KINDS.contains(&arena.kind(n))) {
        match arena.kind(node) {
            "variable_declarator" => {
                if let Some(name) = arena.child_by_field(node, "name") {
                    collect_pattern(arena, name, &mut names);
                }
            }
            "function_declaration" | "generator_function_declaration" | "class_declaration" => {
                if let Some(name) = arena.field_text(node, "name") {
                    names.insert(name.to_string());
                }
            }
            "catch_clause" => {
                if let Some(param) = arena.child_by_field(node, "parameter") {
                    collect_pattern(arena, param, &mut names);
                }
            }
            "for_in_statement" if arena.child_by_field(node, "kind").is_some() => {
                if let Some(left) = arena.child_by_field(node, "left") {
                    collect_pattern(arena, left, &mut names);
                }
            }
            _ => {}
        }
    }
    names
}

/// Collect the identifiers a binding pattern introduces.
fn collect_pattern(arena: &SyntaxArena, pattern: NodeIdx, names: &mut HashSet<String>) {
    // Default values and type annotations bind nothing.
    let prune = |n: NodeIdx| match arena.field(n) {
        Some("right") | Some("type") => true,
        Some("value") => arena.parent(n).is_some_and(|p| arena.kind(p) != "pair_pattern"),
        _ => false,
    };
    for node in arena.descendants_pruned(pattern, prune) {
        if matches!(arena.kind(node), "identifier" | "shorthand_property_identifier_pattern") {
            names.insert(arena.text(node).to_string());
        }
    }
}

/// Whether an identifier node is a value reference rather than a binding,
/// a specifier, or a type position.
pub fn is_value_reference(arena: &SyntaxArena, idx: NodeIdx) -> bool {
    let Some(parent) = arena.parent(idx) else {
        return false;
    };
    let field = arena.field(idx);
    let parent_kind = arena.kind(parent);

    let binding_site = match parent_kind {
        "variable_declarator"
        | "function_declaration"
        | "generator_function_declaration"
        | "function_expression"
        | "function"
        | "generator_function"
        | "class_declaration"
        | "abstract_class_declaration"
        | "class"
        | "enum_declaration"
        | "method_definition" => field == Some("name"),
        "arrow_function" => field == Some("parameter"),
        "catch_clause" => field == Some("parameter"),
        "required_parameter" | "optional_parameter" => field == Some("pattern"),
        "formal_parameters" | "rest_pattern" | "array_pattern" | "object_pattern" => true,
        "assignment_pattern" | "object_assignment_pattern" => field == Some("left"),
        "pair_pattern" => field == Some("value"),
        "jsx_opening_element" | "jsx_closing_element" | "jsx_self_closing_element" => field == Some("name"),
        "for_in_statement" => field == Some("left") && arena.child_by_field(parent, "kind").is_some(),
        "import_specifier" | "export_specifier" | "namespace_import" | "import_clause" | "namespace_export"
        | "import_require_clause" | "labeled_statement" => true,
        _ => false,
    };
    if binding_site && !is_destructuring_target(arena, idx) {
        return false;
    }

    !in_type_context(arena, idx)
}

/// Whether `idx` is assigned through a pattern on the left of an
/// assignment, as in `[a, b] = [b, a]` or `({ a } = next)`.
fn is_destructuring_target(arena: &SyntaxArena, idx: NodeIdx) -> bool {
    let mut node = idx;
    while let Some(parent) = arena.parent(node) {
        match arena.kind(parent) {
            "array_pattern" | "object_pattern" | "rest_pattern" => {}
            "pair_pattern" if arena.field(node) == Some("value") => {}
            "assignment_pattern" | "object_assignment_pattern" if arena.field(node) == Some("left") => {}
            "assignment_expression" => return node != idx && arena.field(node) == Some("left"),
            _ => return false,
        }
        node = parent;
    }
    false
}

fn in_type_context(arena: &SyntaxArena, idx: NodeIdx) -> bool {
    for ancestor in arena.ancestors(idx) {
        let kind = arena.kind(ancestor);
        if TYPE_CONTEXTS.contains(&kind) {
            return true;
        }
        if is_function(arena, ancestor) || kind == "program" {
            return false;
        }
    }
    false
}

/// Whether the identifier is assigned to or updated.
pub fn is_write(arena: &SyntaxArena, idx: NodeIdx) -> bool {
    let Some(parent) = arena.parent(idx) else {
        return false;
    };
    if is_destructuring_target(arena, idx) {
        return true;
    }
    match arena.kind(parent) {
        "assignment_expression" | "augmented_assignment_expression" => {
            if arena.field(idx) != Some("left") {
                return false;
            }
            arena
                .children(parent)
                .iter()
                .any(|&c| ASSIGNMENT_OPERATORS.contains(&arena.kind(c)))
        }
        "update_expression" => true,
        _ => false,
    }
}

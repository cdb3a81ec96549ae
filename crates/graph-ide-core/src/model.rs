//! Core data structures for the dependency graph and the architecture model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable symbol identifier: `<relative file path>:<name>`.
pub type SymbolId = String;

/// Build a symbol id from a project-relative path and a declaration name.
pub fn symbol_id(file_path: &str, name: &str) -> SymbolId {
    format!("{}:{}", file_path, name)
}

/// Split a symbol id back into `(file_path, name)`.
///
/// Names never contain `:`, so the last colon separates the two halves.
pub fn split_symbol_id(id: &str) -> Option<(&str, &str)> {
    id.rsplit_once(':')
}

/// Discriminates what kind of declaration a symbol represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Type,
    Enum,
    Constant,
    Variable,
    Object,
}

impl SymbolKind {
    /// Module-level bindings whose reads and writes are tracked.
    pub fn is_global(self) -> bool {
        matches!(self, SymbolKind::Constant | SymbolKind::Variable | SymbolKind::Object)
    }
}

/// One entry of a function's parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    /// Set when the annotated type is itself a project symbol.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub type_id: Option<SymbolId>,
    /// Raw annotation text, kept when the type is not a project symbol.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub type_text: Option<String>,
}

/// A named, top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub exported: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub return_type_id: Option<SymbolId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub return_type_text: Option<String>,
}

/// What kind of relationship a symbol-level edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    Call,
    ComponentUse,
    GlobalRead,
    GlobalWrite,
    ClassInstantiation,
    EnumUse,
}

impl DependencyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyKind::Call => "call",
            DependencyKind::ComponentUse => "component-use",
            DependencyKind::GlobalRead => "global-read",
            DependencyKind::GlobalWrite => "global-write",
            DependencyKind::ClassInstantiation => "class-instantiation",
            DependencyKind::EnumUse => "enum-use",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in source a relationship is expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

/// A directed edge between two symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// `<source>-><target>:<type>`; unique per extraction run.
    pub id: String,
    pub source: SymbolId,
    pub target: SymbolId,
    #[serde(rename = "type")]
    pub kind: DependencyKind,
    pub location: SourceLocation,
}

impl DependencyEdge {
    pub fn new(source: SymbolId, target: SymbolId, kind: DependencyKind, location: SourceLocation) -> Self {
        DependencyEdge {
            id: Self::key(&source, &target, kind),
            source,
            target,
            kind,
            location,
        }
    }

    /// Dedup key, also used as the edge id.
    pub fn key(source: &str, target: &str, kind: DependencyKind) -> String {
        format!("{}->{}:{}", source, target, kind)
    }
}

/// Glob-based ownership rules of a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMappings {
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Domain ids.
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Owning system id.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Module ids.
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Owning domain id, filled in once domains are known.
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub mappings: ModuleMappings,
}

/// Relationship between two architecture nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SemanticEdgeKind {
    DependsOn,
    CommunicatesWith,
}

impl SemanticEdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticEdgeKind::DependsOn => "depends-on",
            SemanticEdgeKind::CommunicatesWith => "communicates-with",
        }
    }
}

impl fmt::Display for SemanticEdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An aggregated edge at module, domain or system granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: SemanticEdgeKind,
    /// How many lower-level edges were folded into this one.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl SemanticEdge {
    pub fn new(source: String, target: String, kind: SemanticEdgeKind) -> Self {
        SemanticEdge {
            id: format!("{}:{}->{}", kind, source, target),
            source,
            target,
            kind,
            weight: 1,
        }
    }
}

/// Network dependency between modules, as classified by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalDependency {
    pub source_modules: Vec<String>,
    pub target_modules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Dependency on a service outside the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDependency {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source_modules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDependencies {
    #[serde(default)]
    pub internal: Vec<InternalDependency>,
    #[serde(default)]
    pub external: Vec<ExternalDependency>,
}

/// External service node surfaced in the final graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalService {
    pub id: String,
    pub name: String,
}

/// Terminal result of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedGraph {
    pub systems: Vec<SystemNode>,
    pub domains: Vec<DomainNode>,
    pub modules: Vec<ModuleNode>,
    #[serde(default)]
    pub externals: Vec<ExternalService>,
    pub edges: Vec<SemanticEdge>,
}

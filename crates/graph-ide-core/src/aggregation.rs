//! Folding symbol edges up the System → Domain → Module hierarchy

use crate::mapping::MappingResolver;
use crate::model::{
    DependencyEdge, DomainNode, ExternalDependencies, ExternalService, ModuleNode, SemanticEdge,
    SemanticEdgeKind,
};
use std::collections::HashMap;

/// Collects semantic edges, merging duplicates and dropping self-loops.
/// Output order is first-seen order, so repeated runs are stable.
#[derive(Debug, Default)]
pub struct EdgeAccumulator {
    index: HashMap<(String, String, SemanticEdgeKind), usize>,
    edges: Vec<SemanticEdge>,
}

impl EdgeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the edge was a self-loop and got dropped.
    pub fn add(&mut self, source: &str, target: &str, kind: SemanticEdgeKind) -> bool {
        if source == target {
            return false;
        }
        let key = (source.to_string(), target.to_string(), kind);
        match self.index.get(&key) {
            Some(&i) => self.edges[i].weight += 1,
            None => {
                self.index.insert(key, self.edges.len());
                self.edges
                    .push(SemanticEdge::new(source.to_string(), target.to_string(), kind));
            }
        }
        true
    }

    pub fn into_edges(self) -> Vec<SemanticEdge> {
        self.edges
    }
}

/// Fold symbol edges into module `depends-on` edges. Edges with an
/// unclassified endpoint, or internal to one module, are dropped.
pub fn aggregate_module_edges(edges: &[DependencyEdge], resolver: &MappingResolver) -> Vec<SemanticEdge> {
    let mut acc = EdgeAccumulator::new();
    let mut unclassified = 0usize;

    for edge in edges {
        let (Some(source), Some(target)) = (
            resolver.resolve_module(&edge.source),
            resolver.resolve_module(&edge.target),
        ) else {
            unclassified += 1;
            continue;
        };
        acc.add(source, target, SemanticEdgeKind::DependsOn);
    }

    tracing::debug!(
        "Module fold: {} symbol edges -> {} module edges ({} with unclassified endpoints)",
        edges.len(),
        acc.edges.len(),
        unclassified
    );
    acc.into_edges()
}

/// Fold edges one level up through a child → parent map, keeping each edge's kind.
pub fn fold_to_parents(edges: &[SemanticEdge], parents: &HashMap<String, String>) -> Vec<SemanticEdge> {
    let mut acc = EdgeAccumulator::new();
    for edge in edges {
        let (Some(source), Some(target)) = (parents.get(&edge.source), parents.get(&edge.target)) else {
            continue;
        };
        acc.add(source, target, edge.kind);
    }
    acc.into_edges()
}

/// Module id → owning domain id.
pub fn module_parents(modules: &[ModuleNode]) -> HashMap<String, String> {
    modules
        .iter()
        .filter_map(|m| m.parent_id.as_ref().map(|p| (m.id.clone(), p.clone())))
        .collect()
}

/// Domain id → owning system id.
pub fn domain_parents(domains: &[DomainNode]) -> HashMap<String, String> {
    domains
        .iter()
        .filter_map(|d| d.parent_id.as_ref().map(|p| (d.id.clone(), p.clone())))
        .collect()
}

/// Resolves the loose module references the collaborator emits
/// (`auth`, `Auth Module`, `module-auth`) to canonical module ids.
pub struct ModuleLookup<'a> {
    modules: &'a [ModuleNode],
}

impl<'a> ModuleLookup<'a> {
    pub fn new(modules: &'a [ModuleNode]) -> Self {
        Self { modules }
    }

    pub fn resolve(&self, reference: &str) -> Option<&'a str> {
        let reference = reference.trim();
        if let Some(m) = self.modules.iter().find(|m| m.id == reference) {
            return Some(&m.id);
        }
        if let Some(m) = self.modules.iter().find(|m| m.id.eq_ignore_ascii_case(reference)) {
            return Some(&m.id);
        }
        if let Some(m) = self.modules.iter().find(|m| m.name.eq_ignore_ascii_case(reference)) {
            return Some(&m.id);
        }
        let wanted = slugify(reference);
        self.modules
            .iter()
            .find(|m| slugify(&m.name) == wanted || slugify(&m.id) == wanted)
            .map(|m| m.id.as_str())
    }
}

fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Fold classified network dependencies into `communicates-with` edges at
/// module, domain and system granularity, deduplicated per granularity.
pub fn aggregate_external_dependencies(
    deps: &ExternalDependencies,
    modules: &[ModuleNode],
    domains: &[DomainNode],
) -> Vec<SemanticEdge> {
    let lookup = ModuleLookup::new(modules);
    let to_domain = module_parents(modules);
    let to_system = domain_parents(domains);
    let system_of = |module: &str| to_domain.get(module).and_then(|d| to_system.get(d));

    let mut module_level = EdgeAccumulator::new();
    let mut domain_level = EdgeAccumulator::new();
    let mut system_level = EdgeAccumulator::new();

    for dep in &deps.internal {
        let sources = resolve_all(&lookup, &dep.source_modules);
        let targets = resolve_all(&lookup, &dep.target_modules);
        for source in &sources {
            for target in &targets {
                module_level.add(source, target, SemanticEdgeKind::CommunicatesWith);
                if let (Some(s), Some(t)) = (to_domain.get(*source), to_domain.get(*target)) {
                    domain_level.add(s, t, SemanticEdgeKind::CommunicatesWith);
                }
                if let (Some(s), Some(t)) = (system_of(*source), system_of(*target)) {
                    system_level.add(s, t, SemanticEdgeKind::CommunicatesWith);
                }
            }
        }
    }

    for dep in &deps.external {
        for source in resolve_all(&lookup, &dep.source_modules) {
            module_level.add(source, &dep.id, SemanticEdgeKind::CommunicatesWith);
            if let Some(domain) = to_domain.get(source) {
                domain_level.add(domain, &dep.id, SemanticEdgeKind::CommunicatesWith);
            }
            if let Some(system) = system_of(source) {
                system_level.add(system, &dep.id, SemanticEdgeKind::CommunicatesWith);
            }
        }
    }

    let mut edges = module_level.into_edges();
    edges.extend(domain_level.into_edges());
    edges.extend(system_level.into_edges());
    edges
}

fn resolve_all<'m>(lookup: &ModuleLookup<'m>, refs: &[String]) -> Vec<&'m str> {
    refs.iter()
        .filter_map(|r| {
            let resolved = lookup.resolve(r);
            if resolved.is_none() {
                tracing::warn!("Unknown module reference in network dependency: {}", r);
            }
            resolved
        })
        .collect()
}

/// External services named by the classification, in declaration order.
pub fn external_services(deps: &ExternalDependencies) -> Vec<ExternalService> {
    let mut seen = std::collections::HashSet::new();
    deps.external
        .iter()
        .filter(|d| seen.insert(d.id.clone()))
        .map(|d| ExternalService {
            id: d.id.clone(),
            name: d.name.clone().unwrap_or_else(|| d.id.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DependencyKind, ExternalDependency, InternalDependency, ModuleMappings, SourceLocation,
    };

    fn module(id: &str, name: &str, dir: &str, parent: &str) -> ModuleNode {
        ModuleNode {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            parent_id: Some(parent.to_string()),
            mappings: ModuleMappings {
                directories: vec![dir.to_string()],
                ..ModuleMappings::default()
            },
        }
    }

    fn domain(id: &str, parent: &str) -> DomainNode {
        DomainNode {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            parent_id: Some(parent.to_string()),
            children: Vec::new(),
        }
    }

    fn edge(source: &str, target: &str) -> DependencyEdge {
        DependencyEdge::new(
            source.to_string(),
            target.to_string(),
            DependencyKind::Call,
            SourceLocation { file: "x".into(), line: 1 },
        )
    }

    #[test]
    fn module_fold_drops_internal_and_unclassified_edges() {
        let modules = vec![
            module("auth", "Auth", "src/auth/**", "identity"),
            module("billing", "Billing", "src/billing/**", "payments"),
        ];
        let resolver = MappingResolver::new(&modules);
        let edges = vec![
            edge("src/auth/a.ts:login", "src/auth/b.ts:hash"),
            edge("src/auth/a.ts:login", "src/auth/a.ts:check"),
            edge("src/billing/c.ts:charge", "src/auth/a.ts:login"),
            edge("src/billing/d.ts:refund", "src/auth/a.ts:check"),
            edge("scripts/x.ts:seed", "src/auth/a.ts:login"),
        ];

        let module_edges = aggregate_module_edges(&edges, &resolver);
        assert_eq!(module_edges.len(), 1);
        assert_eq!(module_edges[0].source, "billing");
        assert_eq!(module_edges[0].target, "auth");
        assert_eq!(module_edges[0].weight, 2);
        assert_eq!(module_edges[0].id, "depends-on:billing->auth");
    }

    #[test]
    fn parent_fold_never_emits_self_loops() {
        let modules = vec![
            module("a", "A", "a/**", "d1"),
            module("b", "B", "b/**", "d1"),
            module("c", "C", "c/**", "d2"),
        ];
        let domains = vec![domain("d1", "s1"), domain("d2", "s1")];
        let module_edges = vec![
            SemanticEdge::new("a".into(), "b".into(), SemanticEdgeKind::DependsOn),
            SemanticEdge::new("a".into(), "c".into(), SemanticEdgeKind::DependsOn),
            SemanticEdge::new("b".into(), "c".into(), SemanticEdgeKind::DependsOn),
        ];

        let domain_edges = fold_to_parents(&module_edges, &module_parents(&modules));
        assert_eq!(domain_edges.len(), 1);
        assert_eq!((domain_edges[0].source.as_str(), domain_edges[0].target.as_str()), ("d1", "d2"));

        let system_edges = fold_to_parents(&domain_edges, &domain_parents(&domains));
        assert!(system_edges.is_empty());
    }

    #[test]
    fn external_dependencies_fold_through_every_level() {
        let modules = vec![
            module("module-api", "API Gateway", "api/**", "d-edge"),
            module("module-orders", "Orders", "orders/**", "d-core"),
        ];
        let domains = vec![domain("d-edge", "s-web"), domain("d-core", "s-backend")];
        let deps = ExternalDependencies {
            internal: vec![InternalDependency {
                source_modules: vec!["api gateway".into()],
                target_modules: vec!["orders".into(), "missing".into()],
                description: None,
            }],
            external: vec![ExternalDependency {
                id: "stripe".into(),
                name: Some("Stripe".into()),
                source_modules: vec!["module-orders".into()],
                description: None,
            }],
        };

        let edges = aggregate_external_dependencies(&deps, &modules, &domains);
        let pairs: Vec<(&str, &str)> = edges.iter().map(|e| (e.source.as_str(), e.target.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("module-api", "module-orders"),
                ("module-orders", "stripe"),
                ("d-edge", "d-core"),
                ("d-core", "stripe"),
                ("s-web", "s-backend"),
                ("s-backend", "stripe"),
            ]
        );
        assert!(edges.iter().all(|e| e.kind == SemanticEdgeKind::CommunicatesWith));
        assert_eq!(external_services(&deps)[0].name, "Stripe");
    }
}

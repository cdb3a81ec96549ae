//! Per-stage payloads persisted in `step-<N>-cache.json`, and the pure
//! transformations between them

use graph_ide_core::{
    aggregate_external_dependencies, domain_parents, external_services, fold_to_parents,
    module_parents, DomainNode, ExternalDependencies, ModuleLookup, ModuleNode, SemanticEdge,
    SystemNode, UnifiedGraph,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemsData {
    pub systems: Vec<SystemNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModulesData {
    pub modules: Vec<ModuleNode>,
}

/// Domains plus the module list re-parented under them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainsData {
    pub domains: Vec<DomainNode>,
    pub modules: Vec<ModuleNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEdgesData {
    pub edges: Vec<SemanticEdge>,
    pub symbol_count: usize,
    pub symbol_edge_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainEdgesData {
    pub edges: Vec<SemanticEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalData {
    pub dependencies: ExternalDependencies,
    /// `communicates-with` edges at module, domain and system level.
    pub edges: Vec<SemanticEdge>,
}

/// Point every module at the domain that lists it and canonicalise the
/// domains' child lists to module ids.
///
/// The first domain to claim a module owns it. Modules no domain claims end
/// up without a parent.
pub fn reparent_modules(mut domains: Vec<DomainNode>, modules: &[ModuleNode]) -> DomainsData {
    let lookup = ModuleLookup::new(modules);
    let mut owner: Vec<Option<String>> = vec![None; modules.len()];

    for domain in &mut domains {
        let mut children = Vec::new();
        for reference in &domain.children {
            let Some(id) = lookup.resolve(reference) else {
                warn!("Domain {} lists unknown module {}", domain.id, reference);
                continue;
            };
            let Some(index) = modules.iter().position(|m| m.id == id) else {
                continue;
            };
            match &owner[index] {
                None => {
                    owner[index] = Some(domain.id.clone());
                    children.push(id.to_string());
                }
                Some(existing) if existing != &domain.id => {
                    warn!("Module {} already belongs to domain {}; ignoring {}", id, existing, domain.id);
                }
                Some(_) => {}
            }
        }
        domain.children = children;
    }

    let modules = modules
        .iter()
        .zip(owner)
        .map(|(module, parent)| {
            if parent.is_none() {
                warn!("Module {} is not part of any domain", module.id);
            }
            ModuleNode {
                parent_id: parent,
                ..module.clone()
            }
        })
        .collect();

    DomainsData { domains, modules }
}

/// Domain-level `depends-on` edges from module-level ones.
pub fn domain_edges(module_edges: &[SemanticEdge], modules: &[ModuleNode]) -> Vec<SemanticEdge> {
    fold_to_parents(module_edges, &module_parents(modules))
}

/// Network edges at every granularity from the classified dependencies.
pub fn external_edges(
    dependencies: ExternalDependencies,
    modules: &[ModuleNode],
    domains: &[DomainNode],
) -> ExternalData {
    let edges = aggregate_external_dependencies(&dependencies, modules, domains);
    ExternalData { dependencies, edges }
}

/// Merge every stage's output into the final graph.
///
/// System children are rebuilt from the domains' `parentId`, and system
/// `depends-on` edges are folded from the domain edges here.
pub fn assemble(
    systems: &SystemsData,
    domains: &DomainsData,
    module_edges: &ModuleEdgesData,
    domain_edges: &DomainEdgesData,
    external: &ExternalData,
) -> UnifiedGraph {
    let systems: Vec<SystemNode> = systems
        .systems
        .iter()
        .map(|system| SystemNode {
            children: domains
                .domains
                .iter()
                .filter(|d| d.parent_id.as_deref() == Some(system.id.as_str()))
                .map(|d| d.id.clone())
                .collect(),
            ..system.clone()
        })
        .collect();
    for domain in &domains.domains {
        let known = domain
            .parent_id
            .as_deref()
            .is_some_and(|p| systems.iter().any(|s| s.id == p));
        if !known {
            warn!("Domain {} has no known parent system", domain.id);
        }
    }

    let system_edges = fold_to_parents(&domain_edges.edges, &domain_parents(&domains.domains));

    let mut edges = module_edges.edges.clone();
    edges.extend(domain_edges.edges.iter().cloned());
    edges.extend(system_edges);
    edges.extend(external.edges.iter().cloned());

    UnifiedGraph {
        systems,
        domains: domains.domains.clone(),
        modules: domains.modules.clone(),
        externals: external_services(&external.dependencies),
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_ide_core::{ModuleMappings, SemanticEdgeKind};

    fn module(id: &str, name: &str) -> ModuleNode {
        ModuleNode {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            parent_id: Some("web".into()),
            mappings: ModuleMappings::default(),
        }
    }

    fn domain(id: &str, system: &str, children: &[&str]) -> DomainNode {
        DomainNode {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            parent_id: Some(system.into()),
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn reparent_resolves_loose_references_and_first_claim_wins() {
        let modules = vec![module("auth", "Auth"), module("billing", "Billing"), module("misc", "Misc")];
        let domains = vec![
            domain("identity", "web", &["Auth", "ghost"]),
            domain("money", "web", &["billing", "auth"]),
        ];

        let data = reparent_modules(domains, &modules);
        assert_eq!(data.domains[0].children, vec!["auth"]);
        assert_eq!(data.domains[1].children, vec!["billing"]);
        assert_eq!(data.modules[0].parent_id.as_deref(), Some("identity"));
        assert_eq!(data.modules[1].parent_id.as_deref(), Some("money"));
        assert_eq!(data.modules[2].parent_id, None);
    }

    #[test]
    fn assemble_rebuilds_children_and_folds_system_edges() {
        let systems = SystemsData {
            systems: vec![
                SystemNode {
                    id: "web".into(),
                    name: "Web".into(),
                    description: String::new(),
                    children: vec!["stale".into()],
                },
                SystemNode {
                    id: "api".into(),
                    name: "API".into(),
                    description: String::new(),
                    children: vec![],
                },
            ],
        };
        let domains = reparent_modules(
            vec![domain("ui", "web", &["pages"]), domain("data", "api", &["store"])],
            &[module("pages", "Pages"), module("store", "Store")],
        );
        let module_edges = ModuleEdgesData {
            edges: vec![SemanticEdge::new("pages".into(), "store".into(), SemanticEdgeKind::DependsOn)],
            symbol_count: 4,
            symbol_edge_count: 1,
        };
        let folded = DomainEdgesData {
            edges: domain_edges(&module_edges.edges, &domains.modules),
        };

        let graph = assemble(&systems, &domains, &module_edges, &folded, &ExternalData::default());
        assert_eq!(graph.systems[0].children, vec!["ui"]);
        assert_eq!(graph.systems[1].children, vec!["data"]);
        let ids: Vec<&str> = graph.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["depends-on:pages->store", "depends-on:ui->data", "depends-on:web->api"]
        );
    }
}

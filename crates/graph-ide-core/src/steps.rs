//! Pipeline stages and their declared dependency DAG

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PipelineStep {
    Systems = 1,
    Modules = 2,
    /// Domains, plus re-parenting modules under them.
    Domains = 3,
    ModuleEdges = 4,
    DomainEdges = 5,
    /// Network dependencies and the final aggregation.
    ExternalDependencies = 6,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 6] = [
        PipelineStep::Systems,
        PipelineStep::Modules,
        PipelineStep::Domains,
        PipelineStep::ModuleEdges,
        PipelineStep::DomainEdges,
        PipelineStep::ExternalDependencies,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    pub fn prerequisites(self) -> &'static [PipelineStep] {
        use PipelineStep::*;
        match self {
            Systems => &[],
            Modules => &[Systems],
            Domains => &[Systems, Modules],
            ModuleEdges => &[Modules],
            DomainEdges => &[Domains, ModuleEdges],
            ExternalDependencies => &[Modules, Domains],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PipelineStep::Systems => "systems",
            PipelineStep::Modules => "modules",
            PipelineStep::Domains => "domains",
            PipelineStep::ModuleEdges => "module-edges",
            PipelineStep::DomainEdges => "domain-edges",
            PipelineStep::ExternalDependencies => "external-dependencies",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.label())
    }
}

impl From<PipelineStep> for u8 {
    fn from(step: PipelineStep) -> u8 {
        step.number()
    }
}

impl TryFrom<u8> for PipelineStep {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        PipelineStep::from_number(n).ok_or_else(|| format!("unknown pipeline step {}", n))
    }
}

/// Edges run prerequisite → dependent.
pub fn step_graph() -> DiGraphMap<PipelineStep, ()> {
    let mut graph = DiGraphMap::new();
    for step in PipelineStep::ALL {
        graph.add_node(step);
        for &prerequisite in step.prerequisites() {
            graph.add_edge(prerequisite, step, ());
        }
    }
    graph
}

/// Topological order, always picking the lowest-numbered ready step.
pub fn execution_order() -> Vec<PipelineStep> {
    let graph = step_graph();
    let mut remaining: BTreeSet<PipelineStep> = graph.nodes().collect();
    let mut order: Vec<PipelineStep> = Vec::with_capacity(remaining.len());

    loop {
        let ready = remaining.iter().copied().find(|step| {
            graph
                .neighbors_directed(*step, Direction::Incoming)
                .all(|p| order.contains(&p))
        });
        let Some(next) = ready else { break };
        remaining.remove(&next);
        order.push(next);
    }
    order
}

/// Every step that transitively depends on `step`, excluding `step` itself.
pub fn dependents(step: PipelineStep) -> Vec<PipelineStep> {
    let graph = step_graph();
    let mut dfs = Dfs::new(&graph, step);
    let mut out = Vec::new();
    while let Some(node) = dfs.next(&graph) {
        if node != step {
            out.push(node);
        }
    }
    out.sort();
    out
}

/// The `stepDependencies` table persisted in the step manifest.
pub fn step_dependencies_table() -> BTreeMap<String, Option<Vec<u8>>> {
    PipelineStep::ALL
        .into_iter()
        .map(|step| {
            let prerequisites = step.prerequisites();
            let value = if prerequisites.is_empty() {
                None
            } else {
                Some(prerequisites.iter().map(|p| p.number()).collect())
            };
            (step.number().to_string(), value)
        })
        .collect()
}

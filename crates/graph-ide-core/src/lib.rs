//! graph-ide core: data model, mapping resolution, aggregation and stage cache

pub mod aggregation;
pub mod cache;
pub mod config;
pub mod error;
pub mod mapping;
pub mod model;
pub mod steps;
pub mod symbols;
pub mod walker;


#[cfg(test)]
pub mod test_utils;

pub use aggregation::{
    aggregate_external_dependencies, aggregate_module_edges, domain_parents, external_services,
    fold_to_parents, module_parents, EdgeAccumulator, ModuleLookup,
};
pub use cache::{CacheManager, CacheManifest, FileDigest, StepCacheEntry, StepManifest, CACHE_DIR};
pub use config::{GraphIdeConfig, ProviderConfig};
pub use error::CacheError;
pub use mapping::{DirPattern, MappingResolver};
pub use model::{
    symbol_id, split_symbol_id, DependencyEdge, DependencyKind, DomainNode, ExternalDependencies,
    ExternalDependency, ExternalService, InternalDependency, ModuleMappings, ModuleNode, Parameter,
    SemanticEdge, SemanticEdgeKind, SourceLocation, Symbol, SymbolId, SymbolKind, SystemNode,
    UnifiedGraph,
};
pub use steps::PipelineStep;
pub use symbols::SymbolTable;
pub use walker::{FileWalker, WalkedFile};

//! Six-stage analysis pipeline with per-stage caching

use crate::stages::{
    assemble, domain_edges, external_edges, reparent_modules, DomainEdgesData, DomainsData,
    ExternalData, ModuleEdgesData, ModulesData, SystemsData,
};
use anyhow::{Context, Result};
use graph_ide_ai::prompt::{
    domains_prompt, external_dependencies_prompt, modules_prompt, systems_prompt,
};
use graph_ide_ai::response::{parse_domains, parse_external_dependencies, parse_modules, parse_systems};
use graph_ide_ai::{
    AbortSignal, ClassificationProvider, ClassificationRequest, ClassificationTask,
    DescriptionCache, ProjectOverview,
};
use graph_ide_core::steps::execution_order;
use graph_ide_core::{
    aggregate_module_edges, CacheManager, FileWalker, GraphIdeConfig, MappingResolver,
    PipelineStep, Symbol, UnifiedGraph,
};
use graph_ide_indexer::{ExtractOptions, ExtractionResult, SymbolExtractor};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Outcome of one pipeline run. Never an `Err`: failures are reported here
/// together with the stages that did complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub graph: Option<UnifiedGraph>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub completed_steps: Vec<PipelineStep>,
    /// Stages served from cache rather than recomputed.
    #[serde(default)]
    pub cached_steps: Vec<PipelineStep>,
    /// Symbol id to description, filled by `analyze --describe`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub descriptions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Discard every cached stage before running.
    pub force_refresh: bool,
}

/// Everything produced so far in one run.
#[derive(Default)]
struct RunState {
    systems: Option<SystemsData>,
    modules: Option<ModulesData>,
    domains: Option<DomainsData>,
    module_edges: Option<ModuleEdgesData>,
    domain_edges: Option<DomainEdgesData>,
    external: Option<ExternalData>,
    completed: Vec<PipelineStep>,
    cached: Vec<PipelineStep>,
    recomputed: HashSet<PipelineStep>,
}

impl RunState {
    fn require<'a, T>(value: &'a Option<T>, step: PipelineStep) -> Result<&'a T> {
        value
            .as_ref()
            .with_context(|| format!("{} has not produced a result", step))
    }
}

pub struct PipelineOrchestrator {
    root: PathBuf,
    config: GraphIdeConfig,
    cache: CacheManager,
    provider: Arc<dyn ClassificationProvider>,
    signal: AbortSignal,
    descriptions: DescriptionCache,
}

impl PipelineOrchestrator {
    pub fn new(
        root: impl AsRef<Path>,
        config: GraphIdeConfig,
        provider: Arc<dyn ClassificationProvider>,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        anyhow::ensure!(root.is_dir(), "{} is not a directory", root.display());
        let walker = FileWalker::from_config(&root, &config)?;
        Ok(Self {
            cache: CacheManager::new(&root, walker),
            root,
            config,
            provider,
            signal: AbortSignal::new(),
            descriptions: DescriptionCache::default(),
        })
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Handle for cancelling in-flight classification calls.
    pub fn abort_signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    pub fn descriptions(&self) -> &DescriptionCache {
        &self.descriptions
    }

    /// Run every stage in dependency order, reusing valid cached stages.
    pub async fn run(&self, options: RunOptions) -> PipelineReport {
        let mut state = RunState::default();
        match self.run_stages(options, &mut state).await {
            Ok(graph) => {
                info!(
                    "Analysis complete: {} systems, {} domains, {} modules, {} edges",
                    graph.systems.len(),
                    graph.domains.len(),
                    graph.modules.len(),
                    graph.edges.len()
                );
                PipelineReport {
                    success: true,
                    graph: Some(graph),
                    error: None,
                    completed_steps: state.completed,
                    cached_steps: state.cached,
                    descriptions: BTreeMap::new(),
                }
            }
            Err(e) => {
                warn!("Analysis failed: {:#}", e);
                PipelineReport {
                    success: false,
                    graph: None,
                    error: Some(format!("{:#}", e)),
                    completed_steps: state.completed,
                    cached_steps: state.cached,
                    descriptions: BTreeMap::new(),
                }
            }
        }
    }

    async fn run_stages(&self, options: RunOptions, state: &mut RunState) -> Result<UnifiedGraph> {
        if options.force_refresh {
            self.cache.invalidate_all()?;
        } else {
            self.cache.ensure_fresh()?;
        }

        for step in execution_order() {
            let span = tracing::info_span!("stage", step = step.number(), label = step.label());
            self.run_step(step, state).instrument(span).await?;
            state.completed.push(step);
        }

        let graph = assemble(
            RunState::require(&state.systems, PipelineStep::Systems)?,
            RunState::require(&state.domains, PipelineStep::Domains)?,
            RunState::require(&state.module_edges, PipelineStep::ModuleEdges)?,
            RunState::require(&state.domain_edges, PipelineStep::DomainEdges)?,
            RunState::require(&state.external, PipelineStep::ExternalDependencies)?,
        );
        self.cache
            .save_analysis(&graph)
            .context("Failed to save semantic analysis")?;
        Ok(graph)
    }

    async fn run_step(&self, step: PipelineStep, state: &mut RunState) -> Result<()> {
        match step {
            PipelineStep::Systems => {
                let data = match self.cached::<SystemsData>(step, state) {
                    Some(data) => data,
                    None => {
                        let prompt = systems_prompt(&self.overview());
                        let text = self.classify(ClassificationTask::Systems, prompt).await?;
                        let data = SystemsData {
                            systems: parse_systems(&text).context("invalid systems classification")?,
                        };
                        self.persist(step, &data, state)?;
                        data
                    }
                };
                info!("{} systems", data.systems.len());
                state.systems = Some(data);
            }
            PipelineStep::Modules => {
                let data = match self.cached::<ModulesData>(step, state) {
                    Some(data) => data,
                    None => {
                        let systems = RunState::require(&state.systems, PipelineStep::Systems)?;
                        let prompt = modules_prompt(&self.overview(), &systems.systems);
                        let text = self.classify(ClassificationTask::Modules, prompt).await?;
                        let data = ModulesData {
                            modules: parse_modules(&text).context("invalid modules classification")?,
                        };
                        self.persist(step, &data, state)?;
                        data
                    }
                };
                info!("{} modules", data.modules.len());
                state.modules = Some(data);
            }
            PipelineStep::Domains => {
                let data = match self.cached::<DomainsData>(step, state) {
                    Some(data) => data,
                    None => {
                        let systems = RunState::require(&state.systems, PipelineStep::Systems)?;
                        let modules = RunState::require(&state.modules, PipelineStep::Modules)?;
                        let prompt = domains_prompt(&systems.systems, &modules.modules);
                        let text = self.classify(ClassificationTask::Domains, prompt).await?;
                        let domains = parse_domains(&text).context("invalid domains classification")?;
                        let data = reparent_modules(domains, &modules.modules);
                        self.persist(step, &data, state)?;
                        data
                    }
                };
                info!("{} domains", data.domains.len());
                state.domains = Some(data);
            }
            PipelineStep::ModuleEdges => {
                let data = match self.cached::<ModuleEdgesData>(step, state) {
                    Some(data) => data,
                    None => {
                        // Domain reparenting only touches parentId, so the
                        // stage-3 module list carries the same mappings.
                        let modules = match &state.domains {
                            Some(domains) => &domains.modules,
                            None => &RunState::require(&state.modules, PipelineStep::Modules)?.modules,
                        };
                        let extraction = self.extract()?;
                        let resolver = MappingResolver::new(modules);
                        let data = ModuleEdgesData {
                            edges: aggregate_module_edges(&extraction.edges, &resolver),
                            symbol_count: extraction.total_symbols,
                            symbol_edge_count: extraction.edges.len(),
                        };
                        self.persist(step, &data, state)?;
                        data
                    }
                };
                info!(
                    "{} module edges from {} symbol edges",
                    data.edges.len(),
                    data.symbol_edge_count
                );
                state.module_edges = Some(data);
            }
            PipelineStep::DomainEdges => {
                let data = match self.cached::<DomainEdgesData>(step, state) {
                    Some(data) => data,
                    None => {
                        let domains = RunState::require(&state.domains, PipelineStep::Domains)?;
                        let module_edges = RunState::require(&state.module_edges, PipelineStep::ModuleEdges)?;
                        let data = DomainEdgesData {
                            edges: domain_edges(&module_edges.edges, &domains.modules),
                        };
                        self.persist(step, &data, state)?;
                        data
                    }
                };
                info!("{} domain edges", data.edges.len());
                state.domain_edges = Some(data);
            }
            PipelineStep::ExternalDependencies => {
                let data = match self.cached::<ExternalData>(step, state) {
                    Some(data) => data,
                    None => {
                        let domains = RunState::require(&state.domains, PipelineStep::Domains)?;
                        let prompt = external_dependencies_prompt(&domains.modules, &domains.domains);
                        let text = self
                            .classify(ClassificationTask::ExternalDependencies, prompt)
                            .await?;
                        let dependencies = parse_external_dependencies(&text)
                            .context("invalid external dependency classification")?;
                        let data = external_edges(dependencies, &domains.modules, &domains.domains);
                        self.persist(step, &data, state)?;
                        data
                    }
                };
                info!(
                    "{} internal and {} external network dependencies",
                    data.dependencies.internal.len(),
                    data.dependencies.external.len()
                );
                state.external = Some(data);
            }
        }
        Ok(())
    }

    /// A valid cached payload, unless an upstream stage was recomputed in
    /// this run.
    fn cached<T: DeserializeOwned>(&self, step: PipelineStep, state: &mut RunState) -> Option<T> {
        if step.prerequisites().iter().any(|p| state.recomputed.contains(p)) {
            debug!("{} has a recomputed prerequisite", step);
            return None;
        }
        if !self.cache.is_step_cache_valid(step) {
            return None;
        }
        let entry = self.cache.load_step_cache::<T>(step)?;
        info!("Using cached result for {}", step);
        state.cached.push(step);
        Some(entry.data)
    }

    fn persist<T: Serialize>(&self, step: PipelineStep, data: &T, state: &mut RunState) -> Result<()> {
        self.cache
            .save_step_cache(step, data)
            .with_context(|| format!("Failed to cache {}", step))?;
        state.recomputed.insert(step);
        Ok(())
    }

    async fn classify(&self, task: ClassificationTask, prompt: String) -> Result<String> {
        info!("Requesting {} classification from {}", task, self.provider.name());
        let request = ClassificationRequest {
            task,
            prompt,
            project_path: self.root.clone(),
        };
        let text = self
            .provider
            .classify(request, self.signal.clone())
            .await
            .with_context(|| format!("{} classification failed", task))?;
        if self.signal.is_aborted() {
            anyhow::bail!("{} classification aborted", task);
        }
        Ok(text)
    }

    fn overview(&self) -> ProjectOverview {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        ProjectOverview {
            name,
            files: self.project_files(),
        }
    }

    fn project_files(&self) -> Vec<String> {
        match FileWalker::from_config(&self.root, &self.config) {
            Ok(walker) => walker.walk().into_iter().map(|f| f.relative).collect(),
            Err(e) => {
                warn!("Could not list project files: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Symbols and symbol-level edges for the whole project.
    pub fn extract(&self) -> Result<ExtractionResult> {
        let extractor = SymbolExtractor::new(ExtractOptions::from(self.config.clone()));
        let result = extractor.extract(&self.root)?;
        for error in &result.errors {
            warn!("Skipped {}: {}", error.file, error.message);
        }
        Ok(result)
    }

    /// Queue every symbol without a cached description and generate them one
    /// at a time. Returns how many descriptions were generated.
    pub async fn describe_symbols(&mut self, extraction: &ExtractionResult) -> usize {
        let mut queued = 0;
        for symbol in extraction.symbols() {
            let Some(source) = self.symbol_source(symbol) else {
                continue;
            };
            if self.descriptions.enqueue(symbol, &source) {
                queued += 1;
            }
        }
        info!("Generating descriptions for {} symbols", queued);
        self.descriptions
            .drain(self.provider.as_ref(), &self.root, &self.signal)
            .await
    }

    /// Cached description for a symbol, if its source is unchanged.
    pub fn description(&self, symbol: &Symbol) -> Option<String> {
        let source = self.symbol_source(symbol)?;
        self.descriptions.get(&symbol.id, &source).map(str::to_string)
    }

    /// Every known description for the extracted symbols, JSDoc or generated.
    pub fn symbol_descriptions(&self, extraction: &ExtractionResult) -> BTreeMap<String, String> {
        extraction
            .symbols()
            .filter_map(|symbol| Some((symbol.id.clone(), self.description(symbol)?)))
            .collect()
    }

    fn symbol_source(&self, symbol: &Symbol) -> Option<String> {
        let content = std::fs::read_to_string(self.root.join(&symbol.file_path)).ok()?;
        let start = symbol.start_line.saturating_sub(1) as usize;
        let len = (symbol.end_line.saturating_sub(symbol.start_line) + 1) as usize;
        let lines: Vec<&str> = content.lines().skip(start).take(len).collect();
        if lines.is_empty() {
            return None;
        }
        Some(lines.join("\n"))
    }
}

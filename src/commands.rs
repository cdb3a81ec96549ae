//! CLI command implementations

use anyhow::Context;
use graph_ide_ai::providers::create_provider;
use graph_ide_core::{CacheManager, FileWalker, GraphIdeConfig, PipelineStep, UnifiedGraph};
use graph_ide_indexer::{ExtractOptions, SymbolExtractor};
use graph_ide_pipeline::{PipelineOrchestrator, RunOptions};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct AnalyzeOptions {
    pub force: bool,
    pub responses: Option<PathBuf>,
    pub provider: Option<String>,
    pub describe: bool,
    pub output: Option<PathBuf>,
}

pub async fn analyze(root: PathBuf, options: AnalyzeOptions) -> anyhow::Result<()> {
    tracing::info!("Analyzing project: {}", root.display());

    let mut config = GraphIdeConfig::load(&root)?;
    match (&options.provider, &options.responses) {
        (Some(name), _) => config.provider.name = name.clone(),
        (None, Some(_)) => config.provider.name = "static".to_string(),
        (None, None) => {}
    }
    let provider = create_provider(&config.provider, options.responses.as_deref())?;
    let mut orchestrator = PipelineOrchestrator::new(&root, config, Arc::from(provider))?;

    // Ctrl-C aborts the in-flight classification call.
    let signal = orchestrator.abort_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; aborting classification");
            signal.abort();
        }
    });

    let mut report = orchestrator
        .run(RunOptions {
            force_refresh: options.force,
        })
        .await;

    if options.describe && report.success {
        let extraction = orchestrator.extract()?;
        let generated = orchestrator.describe_symbols(&extraction).await;
        tracing::info!("Generated {} symbol descriptions", generated);
        report.descriptions = orchestrator.symbol_descriptions(&extraction);
    }

    write_json(&report, options.output.as_deref())?;
    if !report.success {
        anyhow::bail!(
            "analysis failed after {} of 6 stages: {}",
            report.completed_steps.len(),
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

pub fn extract(root: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Extracting symbols: {}", root.display());

    let config = GraphIdeConfig::load(&root)?;
    let extractor = SymbolExtractor::new(ExtractOptions::from(config));
    let result = extractor.extract(&root)?;

    tracing::info!(
        "Extracted {} symbols and {} edges from {} files",
        result.total_symbols,
        result.edges.len(),
        result.total_files
    );
    write_json(&result, output.as_deref())
}

pub fn status(root: PathBuf) -> anyhow::Result<()> {
    let cache = cache_manager(&root)?;
    println!("Project fingerprint {}", cache.compute_project_fingerprint());
    for (step, valid) in cache.step_status() {
        println!("{:<32} {}", step.to_string(), if valid { "cached" } else { "stale" });
    }
    match cache.load_analysis::<UnifiedGraph>() {
        Some(entry) => println!(
            "Last analysis {}: {} systems, {} domains, {} modules, {} edges",
            entry.timestamp,
            entry.data.systems.len(),
            entry.data.domains.len(),
            entry.data.modules.len(),
            entry.data.edges.len()
        ),
        None => println!("No saved analysis"),
    }
    Ok(())
}

pub fn clear(root: PathBuf, step: Option<u8>) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", root.display());
    let cache = cache_manager(&root)?;

    match step {
        Some(n) => {
            let step = PipelineStep::from_number(n)
                .with_context(|| format!("No pipeline stage numbered {}", n))?;
            let removed = cache.invalidate_step(step)?;
            let names: Vec<String> = removed.iter().map(ToString::to_string).collect();
            tracing::info!("Cleared {}", names.join(", "));
        }
        None => {
            cache.invalidate_all()?;
            tracing::info!("Cache cleared");
        }
    }
    Ok(())
}

fn cache_manager(root: &Path) -> anyhow::Result<CacheManager> {
    let config = GraphIdeConfig::load(root)?;
    let walker = FileWalker::from_config(root, &config)?;
    Ok(CacheManager::new(root, walker))
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

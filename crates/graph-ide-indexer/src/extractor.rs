//! Whole-program symbol and dependency extraction

use crate::declarations::{analyze_file, FileAnalysis, TypeSlot};
use crate::edges::{EdgeCollector, FileEdgeScanner};
use crate::error::ExtractError;
use crate::parser::{SourceLanguage, SourceParser};
use crate::resolve::ProgramIndex;
use graph_ide_core::{symbol_id, DependencyEdge, FileWalker, GraphIdeConfig, Symbol, SymbolId, SymbolKind, SymbolTable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Which files an extraction run looks at.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub config: GraphIdeConfig,
}

impl From<GraphIdeConfig> for ExtractOptions {
    fn from(config: GraphIdeConfig) -> Self {
        Self { config }
    }
}

/// Symbols declared in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSymbols {
    pub file_path: String,
    pub symbols: Vec<Symbol>,
}

/// A file that could not be analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub files: Vec<FileSymbols>,
    pub edges: Vec<DependencyEdge>,
    pub total_symbols: usize,
    pub total_files: usize,
    pub errors: Vec<FileError>,
}

impl ExtractionResult {
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.files.iter().flat_map(|f| f.symbols.iter())
    }

    pub fn symbol(&self, id: &str) -> Option<&Symbol> {
        self.symbols().find(|s| s.id == id)
    }
}

pub struct SymbolExtractor {
    options: ExtractOptions,
}

impl SymbolExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Walk `root` and extract every matching file.
    pub fn extract(&self, root: &Path) -> anyhow::Result<ExtractionResult> {
        anyhow::ensure!(root.is_dir(), "project root {} is not a directory", root.display());
        let walker = FileWalker::from_config(root, &self.options.config)?;
        let walked = walker.walk();
        tracing::info!("Extracting symbols from {} files under {}", walked.len(), root.display());

        let mut sources = Vec::with_capacity(walked.len());
        let mut errors = Vec::new();
        for file in walked {
            match std::fs::read(&file.absolute) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(content) => sources.push((file.relative, content)),
                    Err(_) => errors.push(file_error(&file.relative, ExtractError::InvalidUtf8(file.relative.clone()))),
                },
                Err(source) => errors.push(file_error(
                    &file.relative,
                    ExtractError::Read {
                        path: file.absolute.clone(),
                        source,
                    },
                )),
            }
        }

        let mut result = self.extract_sources(sources);
        errors.extend(result.errors);
        result.errors = errors;
        Ok(result)
    }

    /// Extract from in-memory `(relative path, content)` pairs.
    pub fn extract_sources(&self, sources: Vec<(String, String)>) -> ExtractionResult {
        let mut errors = Vec::new();
        let project_files: HashSet<String> = sources
            .iter()
            .filter(|(path, _)| SourceLanguage::from_path(path).is_some())
            .map(|(path, _)| path.clone())
            .collect();

        // Pass 1: parse and collect declarations per file.
        let mut parser = SourceParser::new();
        let mut analyses: Vec<FileAnalysis> = Vec::with_capacity(sources.len());
        for (path, content) in sources {
            match parser.parse_to_arena(&path, content) {
                Ok(arena) => analyses.push(analyze_file(path, arena, &project_files)),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path, e);
                    errors.push(file_error(&path, e));
                }
            }
        }

        let symbols = build_symbol_table(&analyses);

        // Pass 2: annotation types that name project symbols.
        let resolved_types = {
            let index = ProgramIndex::new(&analyses, &symbols);
            resolve_type_refs(&analyses, &index)
        };
        for (file, symbol, slot, id) in resolved_types {
            apply_type_id(&mut analyses[file].symbols[symbol], slot, id);
        }

        // Pass 3: edges.
        let index = ProgramIndex::new(&analyses, &symbols);
        let mut collector = EdgeCollector::new();
        for analysis in &analyses {
            FileEdgeScanner::new(analysis, &index).scan(&mut collector);
        }
        let edges = collector.into_edges();

        let files: Vec<FileSymbols> = analyses
            .into_iter()
            .map(|a| FileSymbols {
                file_path: a.path,
                symbols: a.symbols,
            })
            .collect();
        let total_symbols = files.iter().map(|f| f.symbols.len()).sum();
        tracing::info!(
            "Extracted {} symbols and {} edges from {} files",
            total_symbols,
            edges.len(),
            files.len()
        );

        ExtractionResult {
            total_files: files.len(),
            total_symbols,
            files,
            edges,
            errors,
        }
    }
}

impl Default for SymbolExtractor {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

fn file_error(path: &str, error: ExtractError) -> FileError {
    FileError {
        file: path.to_string(),
        message: error.to_string(),
    }
}

/// Global map of every declaration plus callable class members.
fn build_symbol_table(analyses: &[FileAnalysis]) -> SymbolTable {
    let mut table = SymbolTable::new();
    for analysis in analyses {
        for symbol in &analysis.symbols {
            table.insert(symbol.id.clone(), symbol.kind);
        }
        for member in &analysis.members {
            table.insert(symbol_id(&analysis.path, member), SymbolKind::Function);
        }
    }
    table
}

fn resolve_type_refs(analyses: &[FileAnalysis], index: &ProgramIndex<'_>) -> Vec<(usize, usize, TypeSlot, SymbolId)> {
    let mut resolved = Vec::new();
    for (file_idx, analysis) in analyses.iter().enumerate() {
        for type_ref in &analysis.type_refs {
            if let Some(id) = index.resolve_name(&analysis.path, &type_ref.name) {
                resolved.push((file_idx, type_ref.symbol, type_ref.slot, id));
            }
        }
    }
    resolved
}

fn apply_type_id(symbol: &mut Symbol, slot: TypeSlot, id: SymbolId) {
    match slot {
        TypeSlot::Parameter(i) => {
            if let Some(param) = symbol.parameters.as_mut().and_then(|p| p.get_mut(i)) {
                param.type_id = Some(id);
                param.type_text = None;
            }
        }
        TypeSlot::Return => {
            symbol.return_type_id = Some(id);
            symbol.return_type_text = None;
        }
    }
}

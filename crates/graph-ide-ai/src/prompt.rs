//! Prompt templates for each classification task

use graph_ide_core::{DomainNode, ModuleNode, Symbol, SystemNode};
use std::collections::BTreeMap;

/// Summary of the project handed to the classification prompts.
#[derive(Debug, Clone, Default)]
pub struct ProjectOverview {
    pub name: String,
    /// Project-relative source file paths.
    pub files: Vec<String>,
}

impl ProjectOverview {
    /// Directory → file count, capped at `depth` path segments.
    pub fn directory_summary(&self, depth: usize) -> BTreeMap<String, usize> {
        let mut dirs = BTreeMap::new();
        for file in &self.files {
            let segments: Vec<&str> = file.split('/').collect();
            let dir_segments = segments.len().saturating_sub(1).min(depth);
            let dir = if dir_segments == 0 {
                ".".to_string()
            } else {
                segments[..dir_segments].join("/")
            };
            *dirs.entry(dir).or_insert(0) += 1;
        }
        dirs
    }

    fn directory_listing(&self, depth: usize) -> String {
        self.directory_summary(depth)
            .iter()
            .map(|(dir, count)| format!("- {}/ ({} files)", dir, count))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// System prompt sent with every classification request.
pub const CLASSIFICATION_SYSTEM_PROMPT: &str = r#"You are a software architect analysing a TypeScript/JavaScript codebase.
You may explore the project with the tools you are given, but your final answer
must be a single JSON object in exactly the shape requested, with no commentary
outside it. Identifiers must be short kebab-case strings."#;

fn systems_listing(systems: &[SystemNode]) -> String {
    systems
        .iter()
        .map(|s| format!("- {} ({}): {}", s.id, s.name, s.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn modules_listing(modules: &[ModuleNode]) -> String {
    modules
        .iter()
        .map(|m| {
            format!(
                "- {} ({}), parent {}: {} [dirs: {}]",
                m.id,
                m.name,
                m.parent_id.as_deref().unwrap_or("none"),
                m.description,
                m.mappings.directories.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn domains_listing(domains: &[DomainNode]) -> String {
    domains
        .iter()
        .map(|d| {
            format!(
                "- {} ({}), system {}: modules {}",
                d.id,
                d.name,
                d.parent_id.as_deref().unwrap_or("none"),
                d.children.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stage 1: top-level deployable systems.
pub fn systems_prompt(overview: &ProjectOverview) -> String {
    format!(
        r#"Identify the top-level systems of the project "{}" ({} source files).
A system is an independently deployable or runnable unit (web app, API server, worker, CLI, shared library).

Source directories:
{}

Return JSON:
{{
  "systems": [
    {{ "id": "web-app", "name": "Web App", "description": "One sentence.", "children": [] }}
  ]
}}"#,
        overview.name,
        overview.files.len(),
        overview.directory_listing(3)
    )
}

/// Stage 2: modules with directory/file/symbol mappings.
pub fn modules_prompt(overview: &ProjectOverview, systems: &[SystemNode]) -> String {
    format!(
        r#"Split the project "{}" into modules. Every module belongs to one of these systems:
{}

Source directories:
{}

Map each module to source code with any of:
- "directories": "dir/**" (recursive) or "dir/*" (direct children only)
- "files": exact relative file paths
- "symbols": "path/to/file.ts:SymbolName"

Return JSON:
{{
  "modules": [
    {{
      "id": "auth",
      "name": "Authentication",
      "description": "One sentence.",
      "parentId": "<system id>",
      "mappings": {{ "directories": ["src/auth/**"], "files": [], "symbols": [] }}
    }}
  ]
}}"#,
        overview.name,
        systems_listing(systems),
        overview.directory_listing(4)
    )
}

/// Stage 3: business domains grouping the modules.
pub fn domains_prompt(systems: &[SystemNode], modules: &[ModuleNode]) -> String {
    format!(
        r#"Group these modules into business domains. Each domain belongs to one system and
lists its modules in "children"; every module should appear in exactly one domain.

Systems:
{}

Modules:
{}

Return JSON:
{{
  "domains": [
    {{ "id": "identity", "name": "Identity", "description": "One sentence.", "parentId": "<system id>", "children": ["<module id>"] }}
  ]
}}"#,
        systems_listing(systems),
        modules_listing(modules)
    )
}

/// Stage 6: network dependencies between modules and to outside services.
pub fn external_dependencies_prompt(modules: &[ModuleNode], domains: &[DomainNode]) -> String {
    format!(
        r#"Find network communication in the project: HTTP/RPC/queue calls between modules of
this project ("internal") and calls to third-party or separately hosted services ("external").
Refer to modules by id.

Modules:
{}

Domains:
{}

Return JSON:
{{
  "internal": [
    {{ "sourceModules": ["<module id>"], "targetModules": ["<module id>"], "description": "REST calls to /api" }}
  ],
  "external": [
    {{ "id": "stripe", "name": "Stripe", "sourceModules": ["<module id>"], "description": "Payments API" }}
  ]
}}"#,
        modules_listing(modules),
        domains_listing(domains)
    )
}

/// One-sentence description of a symbol without JSDoc.
pub fn symbol_description_prompt(symbol: &Symbol, source: &str) -> String {
    format!(
        r#"Describe in one sentence what this {:?} does.

File: {}
Name: {}
Lines: {}-{}

```
{}
```

Return JSON: {{ "description": "..." }}"#,
        symbol.kind,
        symbol.file_path,
        symbol.name,
        symbol.start_line,
        symbol.end_line,
        source
    )
}

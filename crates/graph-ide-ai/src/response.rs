//! Extraction and validation of collaborator JSON responses

use graph_ide_core::{
    DomainNode, ExternalDependencies, ExternalDependency, InternalDependency, ModuleMappings, ModuleNode,
    SystemNode,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("collaborator returned an empty response")]
    Empty,

    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{context} is not a JSON object")]
    NotAnObject { context: String },

    #[error("{context} is missing required field '{field}'")]
    MissingField { context: String, field: &'static str },

    #[error("{context} field '{field}' should be {expected}")]
    WrongType {
        context: String,
        field: &'static str,
        expected: &'static str,
    },
}

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)```").ok())
        .as_ref()
}

/// Pull the JSON payload out of a free-text response: a fenced code block,
/// else the first balanced `{...}` block, else the raw text.
pub fn extract_json_block(text: &str) -> &str {
    if let Some(inner) = fence_pattern()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
    {
        return inner.as_str().trim();
    }
    first_object(text).unwrap_or_else(|| text.trim())
}

/// First balanced `{...}` span, skipping braces inside string literals.
fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_object(text: &str) -> Result<Map<String, Value>, ResponseError> {
    if text.trim().is_empty() {
        return Err(ResponseError::Empty);
    }
    match serde_json::from_str::<Value>(extract_json_block(text))? {
        Value::Object(map) => Ok(map),
        _ => Err(ResponseError::NotAnObject {
            context: "response".to_string(),
        }),
    }
}

/// Field accessors that report which entry and field failed.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    context: String,
}

impl<'a> Fields<'a> {
    fn of(value: &'a Value, context: String) -> Result<Self, ResponseError> {
        match value {
            Value::Object(map) => Ok(Self { map, context }),
            _ => Err(ResponseError::NotAnObject { context }),
        }
    }

    fn wrong(&self, field: &'static str, expected: &'static str) -> ResponseError {
        ResponseError::WrongType {
            context: self.context.clone(),
            field,
            expected,
        }
    }

    fn required_str(&self, field: &'static str) -> Result<String, ResponseError> {
        match self.map.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(Value::String(_)) | None | Some(Value::Null) => Err(ResponseError::MissingField {
                context: self.context.clone(),
                field,
            }),
            Some(_) => Err(self.wrong(field, "a string")),
        }
    }

    fn optional_str(&self, field: &'static str) -> Result<Option<String>, ResponseError> {
        match self.map.get(field) {
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            None | Some(Value::Null) => Ok(None),
            Some(_) => Err(self.wrong(field, "a string")),
        }
    }

    /// Array of strings; absent means empty.
    fn string_list(&self, field: &'static str) -> Result<Vec<String>, ResponseError> {
        match self.map.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.trim().to_string()),
                    _ => Err(self.wrong(field, "an array of strings")),
                })
                .collect(),
            Some(_) => Err(self.wrong(field, "an array of strings")),
        }
    }

    fn required_list(&self, field: &'static str) -> Result<Vec<String>, ResponseError> {
        if !self.map.contains_key(field) {
            return Err(ResponseError::MissingField {
                context: self.context.clone(),
                field,
            });
        }
        self.string_list(field)
    }
}

fn required_array<'a>(map: &'a Map<String, Value>, field: &'static str) -> Result<&'a Vec<Value>, ResponseError> {
    match map.get(field) {
        Some(Value::Array(items)) => Ok(items),
        None | Some(Value::Null) => Err(ResponseError::MissingField {
            context: "response".to_string(),
            field,
        }),
        Some(_) => Err(ResponseError::WrongType {
            context: "response".to_string(),
            field,
            expected: "an array",
        }),
    }
}

/// `{"systems": [{id, name, description?, children?}]}`
pub fn parse_systems(text: &str) -> Result<Vec<SystemNode>, ResponseError> {
    let root = parse_object(text)?;
    required_array(&root, "systems")?
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let fields = Fields::of(entry, format!("systems[{}]", i))?;
            Ok(SystemNode {
                id: fields.required_str("id")?,
                name: fields.required_str("name")?,
                description: fields.optional_str("description")?.unwrap_or_default(),
                children: fields.string_list("children")?,
            })
        })
        .collect()
}

/// `{"modules": [{id, name, description?, parentId?, mappings?: {directories, files, symbols}}]}`
pub fn parse_modules(text: &str) -> Result<Vec<ModuleNode>, ResponseError> {
    let root = parse_object(text)?;
    required_array(&root, "modules")?
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let context = format!("modules[{}]", i);
            let fields = Fields::of(entry, context.clone())?;
            let mappings = match entry.get("mappings") {
                None | Some(Value::Null) => ModuleMappings::default(),
                Some(value) => {
                    let m = Fields::of(value, format!("{}.mappings", context))?;
                    ModuleMappings {
                        directories: m.string_list("directories")?,
                        files: m.string_list("files")?,
                        symbols: m.string_list("symbols")?,
                    }
                }
            };
            Ok(ModuleNode {
                id: fields.required_str("id")?,
                name: fields.required_str("name")?,
                description: fields.optional_str("description")?.unwrap_or_default(),
                parent_id: fields.optional_str("parentId")?,
                mappings,
            })
        })
        .collect()
}

/// `{"domains": [{id, name, description?, parentId?, children?}]}`
pub fn parse_domains(text: &str) -> Result<Vec<DomainNode>, ResponseError> {
    let root = parse_object(text)?;
    required_array(&root, "domains")?
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let fields = Fields::of(entry, format!("domains[{}]", i))?;
            Ok(DomainNode {
                id: fields.required_str("id")?,
                name: fields.required_str("name")?,
                description: fields.optional_str("description")?.unwrap_or_default(),
                parent_id: fields.optional_str("parentId")?,
                children: fields.string_list("children")?,
            })
        })
        .collect()
}

/// `{"internal": [{sourceModules, targetModules, description?}], "external": [{id, name?, sourceModules, description?}]}`
pub fn parse_external_dependencies(text: &str) -> Result<ExternalDependencies, ResponseError> {
    let root = parse_object(text)?;

    let internal = required_array(&root, "internal")?
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let fields = Fields::of(entry, format!("internal[{}]", i))?;
            Ok(InternalDependency {
                source_modules: fields.required_list("sourceModules")?,
                target_modules: fields.required_list("targetModules")?,
                description: fields.optional_str("description")?,
            })
        })
        .collect::<Result<Vec<_>, ResponseError>>()?;

    let external = required_array(&root, "external")?
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let fields = Fields::of(entry, format!("external[{}]", i))?;
            Ok(ExternalDependency {
                id: fields.required_str("id")?,
                name: fields.optional_str("name")?,
                source_modules: fields.required_list("sourceModules")?,
                description: fields.optional_str("description")?,
            })
        })
        .collect::<Result<Vec<_>, ResponseError>>()?;

    Ok(ExternalDependencies { internal, external })
}

/// A symbol description: `{"description": "..."}` or plain text.
pub fn parse_description(text: &str) -> Result<String, ResponseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ResponseError::Empty);
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(extract_json_block(trimmed)) {
        if let Some(Value::String(description)) = map.get("description") {
            return Ok(description.trim().to_string());
        }
    }
    Ok(trimmed.to_string())
}

//! Unit tests for graph-ide-indexer module

use crate::extractor::{ExtractionResult, SymbolExtractor};
use graph_ide_core::{DependencyKind, SymbolKind};
use std::fs;

fn extract(files: &[(&str, &str)]) -> ExtractionResult {
    let sources = files
        .iter()
        .map(|(path, content)| (path.to_string(), content.to_string()))
        .collect();
    SymbolExtractor::default().extract_sources(sources)
}

fn edge_ids(result: &ExtractionResult) -> Vec<String> {
    let mut ids: Vec<String> = result.edges.iter().map(|e| e.id.clone()).collect();
    ids.sort();
    ids
}

#[test]
fn test_cross_file_call_through_import() {
    let result = extract(&[
        ("utils.ts", "export function helperFunc(x: number) { return x * 2; }\n"),
        (
            "main.ts",
            "import { helperFunc } from './utils';\nexport function run() {\n  return helperFunc(1) + helperFunc(2);\n}\n",
        ),
    ]);

    assert_eq!(result.edges.len(), 1);
    let edge = &result.edges[0];
    assert_eq!(edge.source, "main.ts:run");
    assert_eq!(edge.target, "utils.ts:helperFunc");
    assert_eq!(edge.kind, DependencyKind::Call);
    assert_eq!(edge.location.file, "main.ts");
    assert_eq!(edge.location.line, 3);
}

#[test]
fn test_imported_and_same_file_callers_are_distinct() {
    let result = extract(&[
        (
            "utils.ts",
            "export function helperFunc(x: number) { return x * 2; }\nexport function anotherHelper() { return helperFunc(3) + helperFunc(4); }\n",
        ),
        (
            "main.ts",
            "import { helperFunc } from './utils';\nexport function mainFunc() {\n  helperFunc(1);\n  return helperFunc(2);\n}\n",
        ),
    ]);

    assert_eq!(
        edge_ids(&result),
        vec![
            "main.ts:mainFunc->utils.ts:helperFunc:call",
            "utils.ts:anotherHelper->utils.ts:helperFunc:call",
        ]
    );
}

#[test]
fn test_local_function_sites_belong_to_enclosing_symbol() {
    let result = extract(&[(
        "a.ts",
        "export function helper() {}\nexport function outer() {\n  const inner = () => { helper(); };\n  inner();\n}\n",
    )]);

    assert_eq!(edge_ids(&result), vec!["a.ts:outer->a.ts:helper:call"]);
    assert!(result.edges.iter().all(|e| result.symbol(&e.source).is_some()));
}

#[test]
fn test_anonymous_default_export_is_callable() {
    let result = extract(&[
        ("a.ts", "export function helper() {}\nexport default function () { helper(); }\n"),
        ("b.ts", "import run from './a';\nexport function main() { run(); }\n"),
    ]);

    assert_eq!(
        edge_ids(&result),
        vec!["a.ts:default->a.ts:helper:call", "b.ts:main->a.ts:default:call"]
    );
}

#[test]
fn test_destructuring_assignment_writes_globals() {
    let result = extract(&[("a.ts", "let a = 1, b = 2;\nexport function swap() { [a, b] = [b, a]; }\n")]);

    assert_eq!(
        edge_ids(&result),
        vec![
            "a.ts:swap->a.ts:a:global-read",
            "a.ts:swap->a.ts:a:global-write",
            "a.ts:swap->a.ts:b:global-read",
            "a.ts:swap->a.ts:b:global-write",
        ]
    );
}

#[test]
fn test_global_reads_and_writes() {
    let result = extract(&[(
        "state.ts",
        r#"
let counter = 0;
export function increment() { counter++; }
export function report() { console.log(counter); return counter + counter; }
"#,
    )]);

    assert_eq!(
        edge_ids(&result),
        vec![
            "state.ts:increment->state.ts:counter:global-write",
            "state.ts:report->state.ts:counter:global-read",
        ]
    );
}

#[test]
fn test_read_and_write_of_same_global_are_distinct() {
    let result = extract(&[(
        "totals.ts",
        "export let total = 0;\nexport function add(n: number) { total = total + n; }\n",
    )]);

    assert_eq!(
        edge_ids(&result),
        vec![
            "totals.ts:add->totals.ts:total:global-read",
            "totals.ts:add->totals.ts:total:global-write",
        ]
    );
}

#[test]
fn test_repeated_instantiation_collapses() {
    let result = extract(&[
        ("cache.ts", "export class Cache { get(k: string) { return k; } }\n"),
        (
            "app.ts",
            r#"
import { Cache } from './cache';
export function build() {
  const a = new Cache();
  const b = new Cache();
  const c = new Cache();
  return [a, b, c];
}
"#,
        ),
    ]);

    assert_eq!(edge_ids(&result), vec!["app.ts:build->cache.ts:Cache:class-instantiation"]);
}

#[test]
fn test_jsx_component_use() {
    let result = extract(&[
        ("Button.tsx", "export function Button() { return <button>Click</button>; }\n"),
        (
            "App.tsx",
            "import { Button } from './Button';\nexport const App = () => <div><Button /></div>;\n",
        ),
    ]);

    assert_eq!(edge_ids(&result), vec!["App.tsx:App->Button.tsx:Button:component-use"]);
}

#[test]
fn test_enum_use_and_parameter_type() {
    let result = extract(&[
        ("colors.ts", "export enum Color { Red, Green }\n"),
        (
            "paint.ts",
            "import { Color } from './colors';\nexport function paint(c: Color) { return c === Color.Red ? 'red' : 'green'; }\n",
        ),
    ]);

    assert_eq!(edge_ids(&result), vec!["paint.ts:paint->colors.ts:Color:enum-use"]);
    let paint = result.symbol("paint.ts:paint").unwrap();
    let params = paint.parameters.as_ref().unwrap();
    assert_eq!(params[0].type_id.as_deref(), Some("colors.ts:Color"));
    assert_eq!(params[0].type_text, None);
}

#[test]
fn test_type_ids_resolve_through_imports() {
    let result = extract(&[
        ("types.ts", "export interface User { name: string }\n"),
        (
            "svc.ts",
            "import { User } from './types';\nexport function greet(user: User, times: number): User { return user; }\n",
        ),
    ]);

    let greet = result.symbol("svc.ts:greet").unwrap();
    let params = greet.parameters.as_ref().unwrap();
    assert_eq!(params[0].type_id.as_deref(), Some("types.ts:User"));
    assert_eq!(params[1].type_id, None);
    assert_eq!(params[1].type_text.as_deref(), Some("number"));
    assert_eq!(greet.return_type_id.as_deref(), Some("types.ts:User"));
    assert_eq!(greet.return_type_text, None);
}

#[test]
fn test_default_export_name_recovery() {
    let result = extract(&[
        ("logger.ts", "export default function createLogger() { return {}; }\n"),
        (
            "main.ts",
            "import makeLogger from './logger';\nexport function boot() { return makeLogger(); }\n",
        ),
    ]);

    assert_eq!(edge_ids(&result), vec!["main.ts:boot->logger.ts:createLogger:call"]);
    assert!(result.symbol("logger.ts:createLogger").unwrap().exported);
}

#[test]
fn test_barrel_reexports() {
    let result = extract(&[
        ("lib/a.ts", "export function alpha() {}\n"),
        ("lib/b.ts", "export function beta() {}\n"),
        ("lib/index.ts", "export * from './a';\nexport { beta as gamma } from './b';\n"),
        (
            "main.ts",
            "import { alpha, gamma } from './lib';\nfunction go() { alpha(); gamma(); }\n",
        ),
    ]);

    assert_eq!(
        edge_ids(&result),
        vec!["main.ts:go->lib/a.ts:alpha:call", "main.ts:go->lib/b.ts:beta:call"]
    );
}

#[test]
fn test_member_calls() {
    let result = extract(&[
        ("utils.ts", "export function fmt(v: string) { return v; }\n"),
        (
            "store.ts",
            r#"
import * as utils from './utils';
export class Store {
  static create() { return new Store(); }
  save() { return utils.fmt('x'); }
  reset() { this.save(); }
}
export function init() { return Store.create(); }
"#,
        ),
    ]);

    insta::assert_snapshot!(edge_ids(&result).join("\n"), @r"
    store.ts:Store.create->store.ts:Store:class-instantiation
    store.ts:Store.reset->store.ts:Store.save:call
    store.ts:Store.save->utils.ts:fmt:call
    store.ts:init->store.ts:Store.create:call
    ");
}

#[test]
fn test_anonymous_functions_have_no_caller() {
    let result = extract(&[(
        "jobs.ts",
        r#"
export function work() { return 1; }
export function outer() {
  [1, 2].forEach(function () { work(); });
  setTimeout(() => work(), 0);
}
(function () { work(); })();
"#,
    )]);

    assert!(result.edges.is_empty(), "unexpected edges: {:?}", edge_ids(&result));
}

#[test]
fn test_locals_shadow_globals() {
    let result = extract(&[(
        "cfg.ts",
        r#"
let config = { debug: false };
export function a(config) { return config.debug; }
export function b() { const config = {}; return config; }
export function c() { return config.debug; }
"#,
    )]);

    assert_eq!(
        result.symbol("cfg.ts:config").map(|s| s.kind),
        Some(SymbolKind::Object)
    );
    assert_eq!(edge_ids(&result), vec!["cfg.ts:c->cfg.ts:config:global-read"]);
}

#[test]
fn test_library_calls_are_ignored() {
    let result = extract(&[(
        "view.tsx",
        r#"
import React, { useState } from 'react';
import { format } from 'date-fns';
export function Clock() {
  const [now] = useState(new Date());
  console.log(format(now, 'p'));
  return <span>{String(now)}</span>;
}
"#,
    )]);

    assert!(result.edges.is_empty());
    assert_eq!(result.total_symbols, 1);
}

#[test]
fn test_extraction_from_disk_is_idempotent() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("node_modules/lib")).unwrap();
    fs::write(root.join("src/a.ts"), "export function a() { return b(); }\nimport { b } from './b';\n").unwrap();
    fs::write(root.join("src/b.ts"), "export function b() { return 1; }\n").unwrap();
    fs::write(root.join("node_modules/lib/index.ts"), "export function hidden() {}\n").unwrap();
    fs::write(root.join("src/bad.ts"), [0xFF, 0xFE, 0xFD]).unwrap();
    fs::write(root.join("README.md"), "# docs\n").unwrap();

    let extractor = SymbolExtractor::default();
    let first = extractor.extract(root).unwrap();
    let second = extractor.extract(root).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total_files, 2);
    assert_eq!(first.total_symbols, 2);
    assert_eq!(edge_ids(&first), vec!["src/a.ts:a->src/b.ts:b:call"]);
    assert_eq!(first.errors.len(), 1);
    assert_eq!(first.errors[0].file, "src/bad.ts");
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    assert!(SymbolExtractor::default().extract(&missing).is_err());
}

#[test]
fn test_syntax_errors_keep_recognised_declarations() {
    let result = extract(&[(
        "broken.ts",
        "export function ok() { return 1; }\nfunction broken( {\n",
    )]);

    assert!(result.errors.is_empty());
    assert!(result.symbol("broken.ts:ok").is_some());
}

#[test]
fn test_result_serializes_with_camel_case_fields() {
    let result = extract(&[("a.ts", "export let count = 0;\nexport function bump() {\n  count += 1;\n}\n")]);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["totalSymbols"], 2);
    assert_eq!(json["files"][0]["filePath"], "a.ts");
    assert_eq!(json["files"][0]["symbols"][0]["startLine"], 1);
    assert_eq!(json["edges"][0]["id"], "a.ts:bump->a.ts:count:global-write");
    assert_eq!(json["edges"][0]["type"], "global-write");
}

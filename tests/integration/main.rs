//! Integration tests for graph-ide
//!
//! These tests drive the CLI binary and the pipeline crates together
//! against a small project on disk.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "src/config.ts",
        "export const settings = { retries: 3 };\nexport enum Mode { Fast, Safe }\n",
    );
    write(
        dir.path(),
        "src/jobs/runner.ts",
        r#"import { settings, Mode } from "../config";
import { log } from "../util/log";

export class Runner {
  run(mode: Mode) {
    log("retries " + settings.retries);
    return mode === Mode.Fast;
  }
}

export function start() {
  const runner = new Runner();
  return runner.run(Mode.Safe);
}
"#,
    );
    write(
        dir.path(),
        "src/util/log.ts",
        "export function log(message: string) {\n  console.log(message);\n}\n",
    );
    write(dir.path(), "node_modules/lib/index.js", "export function ignored() {}\n");
    dir
}

fn responses() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "systems.json",
        r#"{"systems": [{"id": "worker", "name": "Worker", "description": "Background jobs"}]}"#,
    );
    write(
        dir.path(),
        "modules.json",
        r#"{"modules": [
  {"id": "jobs", "name": "Jobs", "mappings": {"directories": ["src/jobs"]}},
  {"id": "platform", "name": "Platform", "mappings": {"files": ["src/config.ts"], "directories": ["src/util/*"]}}
]}"#,
    );
    write(
        dir.path(),
        "domains.json",
        r#"{"domains": [
  {"id": "execution", "name": "Execution", "parentId": "worker", "children": ["jobs"]},
  {"id": "foundation", "name": "Foundation", "parentId": "worker", "children": ["platform"]}
]}"#,
    );
    write(
        dir.path(),
        "external-dependencies.json",
        r#"{"internal": [], "external": [{"id": "sentry", "name": "Sentry", "sourceModules": ["Platform"]}]}"#,
    );
    dir
}

fn graph_ide(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_graph-ide"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute graph-ide")
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new(env!("CARGO_BIN_EXE_graph-ide"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("graph-ide"));
    assert!(stdout.contains("analyze"));
}

#[test]
fn test_extract_command() {
    let project = project();
    let output = graph_ide(project.path(), &["extract"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["totalFiles"], 3);

    let edges: Vec<String> = result["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect();
    assert!(edges.contains(&"src/jobs/runner.ts:start->src/jobs/runner.ts:Runner:class-instantiation".to_string()));
    assert!(edges.contains(&"src/jobs/runner.ts:Runner.run->src/util/log.ts:log:call".to_string()));
    assert!(edges.contains(&"src/jobs/runner.ts:Runner.run->src/config.ts:settings:global-read".to_string()));
    assert!(edges.contains(&"src/jobs/runner.ts:start->src/config.ts:Mode:enum-use".to_string()));
}

#[test]
fn test_analyze_status_clear() {
    let project = project();
    let responses = responses();
    let report_path = project.path().join("report.json");

    let output = graph_ide(
        project.path(),
        &[
            "analyze",
            "--responses",
            responses.path().to_str().unwrap(),
            "--output",
            report_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["success"], true);
    assert_eq!(report["completedSteps"], serde_json::json!([1, 2, 3, 4, 5, 6]));
    assert_eq!(report["graph"]["systems"][0]["children"], serde_json::json!(["execution", "foundation"]));

    let edge_ids: Vec<&str> = report["graph"]["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert!(edge_ids.contains(&"depends-on:jobs->platform"));
    assert!(edge_ids.contains(&"depends-on:execution->foundation"));
    assert!(edge_ids.contains(&"communicates-with:platform->sentry"));
    assert!(edge_ids.contains(&"communicates-with:worker->sentry"));

    let status = graph_ide(project.path(), &["status"]);
    let stdout = String::from_utf8_lossy(&status.stdout);
    assert_eq!(stdout.matches("cached").count(), 6, "{}", stdout);

    let clear = graph_ide(project.path(), &["clear"]);
    assert!(clear.status.success());
    let status = graph_ide(project.path(), &["status"]);
    let stdout = String::from_utf8_lossy(&status.stdout);
    assert_eq!(stdout.matches("stale").count(), 6, "{}", stdout);
}

#[test]
fn test_analyze_describe_reports_descriptions() {
    let project = project();
    let responses = responses();
    write(
        responses.path(),
        "symbol-description.json",
        r#"{"description": "Does background work."}"#,
    );

    let output = graph_ide(
        project.path(),
        &["analyze", "--describe", "--responses", responses.path().to_str().unwrap()],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["descriptions"]["src/util/log.ts:log"], "Does background work.");
    assert_eq!(report["descriptions"]["src/jobs/runner.ts:start"], "Does background work.");
}

#[test]
fn test_clear_single_step_keeps_upstream_stages() {
    let project = project();
    let responses = responses();
    let output = graph_ide(
        project.path(),
        &["analyze", "--responses", responses.path().to_str().unwrap()],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let clear = graph_ide(project.path(), &["clear", "--step", "4"]);
    assert!(clear.status.success(), "{}", String::from_utf8_lossy(&clear.stderr));

    let status = graph_ide(project.path(), &["status"]);
    let stdout = String::from_utf8_lossy(&status.stdout);
    assert_eq!(stdout.matches("cached").count(), 4, "{}", stdout);
    assert_eq!(stdout.matches("stale").count(), 2, "{}", stdout);
    assert!(stdout.contains("Last analysis"), "{}", stdout);
    assert!(stdout.contains("Project fingerprint"), "{}", stdout);

    let bad = graph_ide(project.path(), &["clear", "--step", "9"]);
    assert!(!bad.status.success());
}

#[test]
fn test_analyze_fails_without_responses_for_a_stage() {
    let project = project();
    let responses = responses();
    std::fs::remove_file(responses.path().join("domains.json")).unwrap();

    let output = graph_ide(
        project.path(),
        &["analyze", "--responses", responses.path().to_str().unwrap()],
    );
    assert!(!output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["success"], false);
    assert_eq!(report["completedSteps"], serde_json::json!([1, 2]));
}

/// The pipeline crates can be driven directly without the binary.
#[test]
fn test_pipeline_library() {
    use graph_ide_ai::providers::StaticProvider;
    use graph_ide_core::GraphIdeConfig;
    use graph_ide_pipeline::{PipelineOrchestrator, RunOptions};
    use std::sync::Arc;

    let project = project();
    let responses = responses();
    let provider = Arc::new(StaticProvider::from_dir(responses.path()).unwrap());
    let orchestrator =
        PipelineOrchestrator::new(project.path(), GraphIdeConfig::default(), provider.clone()).unwrap();

    let report = tokio_test::block_on(orchestrator.run(RunOptions::default()));
    assert!(report.success, "{:?}", report.error);
    assert_eq!(provider.call_count(), 4);

    let again = tokio_test::block_on(orchestrator.run(RunOptions::default()));
    assert_eq!(again.cached_steps.len(), 6);
    assert_eq!(provider.call_count(), 4);
    assert_eq!(again.graph, report.graph);
}

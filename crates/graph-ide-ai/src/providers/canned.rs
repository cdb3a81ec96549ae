//! Static provider: canned responses per task, for offline runs and tests

use crate::bridge::{AbortSignal, ClassificationProvider, ClassificationRequest, ClassificationTask};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

pub struct StaticProvider {
    responses: HashMap<ClassificationTask, String>,
    calls: Mutex<Vec<ClassificationTask>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, task: ClassificationTask, response: impl Into<String>) -> Self {
        self.responses.insert(task, response.into());
        self
    }

    /// Load `<task>.json` (or `<task>.txt`) for every task found in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        anyhow::ensure!(dir.is_dir(), "responses directory {} does not exist", dir.display());
        let mut provider = Self::new();
        for task in ClassificationTask::ALL {
            for ext in ["json", "txt"] {
                let path = dir.join(format!("{}.{}", task.as_str(), ext));
                if path.is_file() {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    provider.responses.insert(task, content);
                    break;
                }
            }
        }
        tracing::debug!("Loaded {} canned responses from {}", provider.responses.len(), dir.display());
        Ok(provider)
    }

    /// Tasks answered so far, in call order.
    pub fn calls(&self) -> Vec<ClassificationTask> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl Default for StaticProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ClassificationProvider for StaticProvider {
    async fn classify(&self, request: ClassificationRequest, signal: AbortSignal) -> Result<String> {
        if signal.is_aborted() {
            return Ok(String::new());
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.task);
        }
        self.responses
            .get(&request.task)
            .cloned()
            .with_context(|| format!("no canned response for task '{}'", request.task))
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(task: ClassificationTask) -> ClassificationRequest {
        ClassificationRequest {
            task,
            prompt: String::new(),
            project_path: ".".into(),
        }
    }

    #[tokio::test]
    async fn answers_from_directory_and_counts_calls() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("systems.json"), r#"{"systems": []}"#).unwrap();
        std::fs::write(dir.path().join("symbol-description.txt"), "Does things.").unwrap();

        let provider = StaticProvider::from_dir(dir.path()).unwrap();
        let systems = provider
            .classify(request(ClassificationTask::Systems), AbortSignal::new())
            .await
            .unwrap();
        assert_eq!(systems, r#"{"systems": []}"#);

        let missing = provider
            .classify(request(ClassificationTask::Modules), AbortSignal::new())
            .await;
        assert!(missing.is_err());
        assert_eq!(provider.calls(), vec![ClassificationTask::Systems, ClassificationTask::Modules]);
    }

    #[tokio::test]
    async fn aborted_calls_are_empty_and_uncounted() {
        let provider = StaticProvider::new().with_response(ClassificationTask::Domains, "{}");
        let signal = AbortSignal::new();
        signal.abort();
        let out = provider.classify(request(ClassificationTask::Domains), signal).await.unwrap();
        assert_eq!(out, "");
        assert_eq!(provider.call_count(), 0);
    }
}

//! Classification collaborator boundary: tasks, requests, cancellation, provider trait

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// What the collaborator is being asked to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationTask {
    Systems,
    Modules,
    Domains,
    ExternalDependencies,
    SymbolDescription,
}

impl ClassificationTask {
    pub const ALL: [ClassificationTask; 5] = [
        ClassificationTask::Systems,
        ClassificationTask::Modules,
        ClassificationTask::Domains,
        ClassificationTask::ExternalDependencies,
        ClassificationTask::SymbolDescription,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ClassificationTask::Systems => "systems",
            ClassificationTask::Modules => "modules",
            ClassificationTask::Domains => "domains",
            ClassificationTask::ExternalDependencies => "external-dependencies",
            ClassificationTask::SymbolDescription => "symbol-description",
        }
    }
}

impl fmt::Display for ClassificationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRequest {
    pub task: ClassificationTask,
    pub prompt: String,
    pub project_path: PathBuf,
}

/// Cooperative cancellation for an in-flight classification call.
///
/// Clones share state; aborting any clone aborts them all.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    inner: Arc<AbortInner>,
}

#[derive(Debug, Default)]
struct AbortInner {
    aborted: AtomicBool,
    notify: Notify,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Resolves once `abort` has been called.
    pub async fn aborted(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

/// A backend that answers classification prompts with one finalized text block.
///
/// An aborted call resolves to an empty string rather than a partial response.
#[async_trait::async_trait]
pub trait ClassificationProvider: Send + Sync {
    async fn classify(&self, request: ClassificationRequest, signal: AbortSignal) -> Result<String>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn abort_wakes_waiters() {
        let signal = AbortSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.aborted().await });

        tokio::task::yield_now().await;
        assert!(!signal.is_aborted());
        signal.abort();
        handle.await.unwrap();
        assert!(signal.is_aborted());
    }

    #[test]
    fn task_names_are_kebab_case() {
        let json = serde_json::to_string(&ClassificationTask::ExternalDependencies).unwrap();
        assert_eq!(json, "\"external-dependencies\"");
        assert_eq!(ClassificationTask::SymbolDescription.to_string(), "symbol-description");
    }
}

//! Symbol description cache and generation queue

use crate::bridge::{AbortSignal, ClassificationProvider, ClassificationRequest, ClassificationTask};
use crate::prompt::symbol_description_prompt;
use crate::response::parse_description;
use graph_ide_core::cache::hash_bytes;
use graph_ide_core::Symbol;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::time::{Duration, Instant};

/// Where a cached description came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionSource {
    JsDoc,
    Generated,
}

/// Cache entry with expiration
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub description: String,
    pub source: DescriptionSource,
    pub timestamp: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        self.timestamp.elapsed() > self.ttl
    }
}

/// Key for cache lookups
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct CacheKey {
    symbol_id: String,
    content_hash: String,
}

impl CacheKey {
    fn new(symbol_id: &str, source: &str) -> Self {
        Self {
            symbol_id: symbol_id.to_string(),
            content_hash: hash_bytes(source.as_bytes()),
        }
    }
}

#[derive(Debug, Clone)]
struct PendingDescription {
    symbol: Symbol,
    source: String,
}

/// Per-symbol descriptions, owned by whoever drives generation.
///
/// Entries are keyed by symbol id plus a digest of the symbol's source text, so
/// editing a symbol's body makes its old description unreachable.
pub struct DescriptionCache {
    entries: HashMap<CacheKey, CacheEntry>,
    queue: VecDeque<PendingDescription>,
    queued: HashSet<CacheKey>,
    default_ttl: Duration,
}

impl DescriptionCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            default_ttl,
        }
    }

    /// Get cached description if available and not expired
    pub fn get(&self, symbol_id: &str, source: &str) -> Option<&str> {
        self.entries
            .get(&CacheKey::new(symbol_id, source))
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.description.as_str())
    }

    pub fn insert(&mut self, symbol_id: &str, source: &str, description: String, origin: DescriptionSource) {
        let entry = CacheEntry {
            description,
            source: origin,
            timestamp: Instant::now(),
            ttl: self.default_ttl,
        };
        self.entries.insert(CacheKey::new(symbol_id, source), entry);
    }

    /// Queue a symbol for generation. Returns `true` if it was queued.
    ///
    /// Symbols carrying a JSDoc description are cached directly instead.
    pub fn enqueue(&mut self, symbol: &Symbol, source: &str) -> bool {
        if let Some(doc) = &symbol.description {
            self.insert(&symbol.id, source, doc.clone(), DescriptionSource::JsDoc);
            return false;
        }
        if self.get(&symbol.id, source).is_some() {
            return false;
        }
        let key = CacheKey::new(&symbol.id, source);
        if !self.queued.insert(key) {
            return false;
        }
        self.queue.push_back(PendingDescription {
            symbol: symbol.clone(),
            source: source.to_string(),
        });
        true
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Generate descriptions for everything queued, one request at a time.
    ///
    /// Failed symbols are logged and skipped. Aborting stops the drain and
    /// leaves the remaining symbols queued. Returns how many were generated.
    pub async fn drain(
        &mut self,
        provider: &dyn ClassificationProvider,
        project_path: &Path,
        signal: &AbortSignal,
    ) -> usize {
        let mut generated = 0;
        while let Some(item) = self.queue.pop_front() {
            if signal.is_aborted() {
                self.queue.push_front(item);
                break;
            }
            let request = ClassificationRequest {
                task: ClassificationTask::SymbolDescription,
                prompt: symbol_description_prompt(&item.symbol, &item.source),
                project_path: project_path.to_path_buf(),
            };
            let text = match provider.classify(request, signal.clone()).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Description request for {} failed: {:#}", item.symbol.id, e);
                    self.queued.remove(&CacheKey::new(&item.symbol.id, &item.source));
                    continue;
                }
            };
            if text.is_empty() && signal.is_aborted() {
                self.queue.push_front(item);
                break;
            }
            self.queued.remove(&CacheKey::new(&item.symbol.id, &item.source));
            match parse_description(&text) {
                Ok(description) => {
                    self.insert(&item.symbol.id, &item.source, description, DescriptionSource::Generated);
                    generated += 1;
                }
                Err(e) => tracing::warn!("Unusable description for {}: {}", item.symbol.id, e),
            }
        }
        tracing::debug!("Generated {} descriptions, {} still pending", generated, self.queue.len());
        generated
    }

    /// Clear expired entries
    pub fn cleanup_expired(&mut self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            expired_entries: self.entries.values().filter(|e| e.is_expired()).count(),
            jsdoc_entries: self
                .entries
                .values()
                .filter(|e| e.source == DescriptionSource::JsDoc)
                .count(),
            pending: self.queue.len(),
        }
    }
}

impl Default for DescriptionCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}

/// Cache statistics
#[derive(Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub jsdoc_entries: usize,
    pub pending: usize,
}

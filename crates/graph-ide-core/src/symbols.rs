//! Flat project-wide symbol map for O(1) "is this a project symbol" checks

use crate::model::{SymbolId, SymbolKind};
use std::collections::HashMap;

/// Maps symbol ids (`file:name`, `file:Class.member`) to their kind.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: HashMap<SymbolId, SymbolKind>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a symbol. The first declaration of an id wins.
    pub fn insert(&mut self, id: SymbolId, kind: SymbolKind) {
        self.symbols.entry(id).or_insert(kind);
    }

    pub fn lookup(&self, id: &str) -> Option<SymbolKind> {
        self.symbols.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.symbols.contains_key(id)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_declaration_wins() {
        let mut table = SymbolTable::new();
        table.insert("a.ts:x".into(), SymbolKind::Variable);
        table.insert("a.ts:x".into(), SymbolKind::Function);

        assert_eq!(table.lookup("a.ts:x"), Some(SymbolKind::Variable));
        assert!(table.contains("a.ts:x"));
        assert!(!table.contains("b.ts:x"));
    }
}

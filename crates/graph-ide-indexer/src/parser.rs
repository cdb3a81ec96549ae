//! Grammar selection and tree-sitter parsing for the ECMAScript family

use crate::arena::SyntaxArena;
use crate::error::ExtractError;
use std::path::Path;
use tree_sitter::{Language, Parser, Tree};

/// Grammar used for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    TypeScript,
    Tsx,
    /// Plain and JSX JavaScript share one grammar.
    JavaScript,
}

impl SourceLanguage {
    /// Determine grammar from file extension
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        match ext {
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceLanguage::JavaScript),
            _ => None,
        }
    }

    pub fn grammar(self) -> Language {
        match self {
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            SourceLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

/// Reusable parser; switches grammar only when the language changes.
pub struct SourceParser {
    parser: Parser,
    current: Option<SourceLanguage>,
}

impl SourceParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            current: None,
        }
    }

    pub fn parse(&mut self, language: SourceLanguage, content: &str) -> Result<Tree, ExtractError> {
        if self.current != Some(language) {
            self.parser
                .set_language(&language.grammar())
                .map_err(|e| ExtractError::Grammar(e.to_string()))?;
            self.current = Some(language);
        }
        self.parser.parse(content, None).ok_or(ExtractError::ParseAborted)
    }

    /// Parse a file's content straight into an owned arena.
    pub fn parse_to_arena(&mut self, path: &str, content: String) -> Result<SyntaxArena, ExtractError> {
        let language = SourceLanguage::from_path(path)
            .ok_or_else(|| ExtractError::UnsupportedFile(path.to_string()))?;
        let tree = self.parse(language, &content)?;
        let arena = SyntaxArena::from_tree(&tree, content);
        if arena.has_errors() {
            tracing::debug!("{} parsed with syntax errors; continuing with partial tree", path);
        }
        Ok(arena)
    }
}

impl Default for SourceParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_follows_extension() {
        assert_eq!(SourceLanguage::from_path("a/b.ts"), Some(SourceLanguage::TypeScript));
        assert_eq!(SourceLanguage::from_path("a/b.cts"), Some(SourceLanguage::TypeScript));
        assert_eq!(SourceLanguage::from_path("View.tsx"), Some(SourceLanguage::Tsx));
        assert_eq!(SourceLanguage::from_path("main.mjs"), Some(SourceLanguage::JavaScript));
        assert_eq!(SourceLanguage::from_path("App.jsx"), Some(SourceLanguage::JavaScript));
        assert_eq!(SourceLanguage::from_path("lib.rs"), None);
        assert_eq!(SourceLanguage::from_path("Makefile"), None);
    }

    #[test]
    fn parser_switches_grammars() {
        let mut parser = SourceParser::new();
        let ts = parser.parse(SourceLanguage::TypeScript, "let x: number = 1;").unwrap();
        assert!(!ts.root_node().has_error());
        let tsx = parser.parse(SourceLanguage::Tsx, "const v = <div>{x}</div>;").unwrap();
        assert!(!tsx.root_node().has_error());
        let js = parser.parse(SourceLanguage::JavaScript, "const v = <App />;").unwrap();
        assert!(!js.root_node().has_error());
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let mut parser = SourceParser::new();
        let err = parser.parse_to_arena("notes.md", String::new()).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFile(_)));
    }
}

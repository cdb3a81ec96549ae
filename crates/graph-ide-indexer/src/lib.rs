//! TypeScript/JavaScript parsing and symbol-level dependency extraction

pub mod arena;
pub mod declarations;
pub mod edges;
pub mod error;
pub mod extractor;
pub mod parser;
pub mod resolve;
pub mod scope;

#[cfg(test)]
pub mod tests;

pub use arena::{NodeIdx, SyntaxArena, SyntaxNode};
pub use error::ExtractError;
pub use extractor::{ExtractOptions, ExtractionResult, FileError, FileSymbols, SymbolExtractor};
pub use parser::{SourceLanguage, SourceParser};

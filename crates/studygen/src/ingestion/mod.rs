//! Document ingestion: extraction into text elements and chunking

mod chunker;
mod extractor;

pub use chunker::TextChunker;
pub use extractor::{DocumentExtractor, TextElement, UnstructuredClient};

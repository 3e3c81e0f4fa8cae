//! Color-keyed section extraction from a document tree.

pub mod color;
pub mod markdown;
pub mod sections;

pub use sections::SectionExtractor;

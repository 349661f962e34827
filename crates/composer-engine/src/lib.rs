pub mod active;
pub mod autosave;
pub mod blocks;
pub mod composition;
pub mod drag;
pub mod editor;
pub mod frontmatter;
pub mod import;
pub mod persistence;
pub mod render;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use autosave::{AutosaveHandle, AutosaveReport, AutosaveState};
pub use blocks::{BlockBody, BlockId, BlockKind, BlockPatch, ContentBlock, Element, FrontmatterField};
pub use composition::{Composition, CompositionId, CompositionKind, CompositionPayload, CompositionSummary};
pub use editor::{
    CopyChoice, CopyOffer, Editor, EditorSettings, GalleryImage, Mutation, SaveError, SaveMode,
    SaveOutcome,
};
pub use frontmatter::FrontmatterDetector;
pub use import::SourceCopy;
pub use persistence::{FileStore, MemoryStore, PersistenceClient, PersistenceError};
pub use render::{RenderContext, RenderedDocument, Renderer, renderer_for};

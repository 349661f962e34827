//! Composition persistence boundary.
//!
//! The engine only talks to storage through [`PersistenceClient`], which is
//! passed in explicitly so tests can swap in a fake.

mod file_store;
mod memory;

use async_trait::async_trait;

use crate::composition::{Composition, CompositionId, CompositionPayload, CompositionSummary};

pub use file_store::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("composition not found: {0}")]
    NotFound(CompositionId),
    #[error("not authenticated with the composition store")]
    Unauthenticated,
    #[error("composition {0} was changed by someone else")]
    Conflict(CompositionId),
    #[error("invalid composition id: {0}")]
    InvalidId(String),
    #[error("composition store unavailable: {0}")]
    Unavailable(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistenceError {
    /// Errors after which no further save can succeed in this session
    pub fn is_fatal(&self) -> bool {
        matches!(self, PersistenceError::Unauthenticated)
    }
}

#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Store a new composition and return its id
    async fn create_composition(
        &self,
        payload: &CompositionPayload,
    ) -> Result<CompositionId, PersistenceError>;

    /// Overwrite an existing composition
    async fn update_composition(
        &self,
        id: &CompositionId,
        payload: &CompositionPayload,
    ) -> Result<(), PersistenceError>;

    async fn load_composition(&self, id: &CompositionId) -> Result<Composition, PersistenceError>;

    async fn list_compositions(&self) -> Result<Vec<CompositionSummary>, PersistenceError>;
}

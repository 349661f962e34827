use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{PersistenceClient, PersistenceError};
use crate::composition::{
    Composition, CompositionId, CompositionPayload, CompositionSummary, now_millis,
};

/// In-process composition store
#[derive(Debug, Default)]
pub struct MemoryStore {
    compositions: Mutex<HashMap<CompositionId, Composition>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.compositions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compositions.lock().is_empty()
    }

    /// Snapshot of a stored composition without going through the async API
    pub fn get(&self, id: &CompositionId) -> Option<Composition> {
        self.compositions.lock().get(id).cloned()
    }
}

#[async_trait]
impl PersistenceClient for MemoryStore {
    async fn create_composition(
        &self,
        payload: &CompositionPayload,
    ) -> Result<CompositionId, PersistenceError> {
        let id = CompositionId::generate();
        let composition = Composition::from_payload(id.clone(), payload.clone(), now_millis());
        self.compositions.lock().insert(id.clone(), composition);
        Ok(id)
    }

    async fn update_composition(
        &self,
        id: &CompositionId,
        payload: &CompositionPayload,
    ) -> Result<(), PersistenceError> {
        let mut compositions = self.compositions.lock();
        let composition = compositions
            .get_mut(id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))?;
        composition.apply_payload(payload.clone(), now_millis());
        Ok(())
    }

    async fn load_composition(&self, id: &CompositionId) -> Result<Composition, PersistenceError> {
        self.get(id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))
    }

    async fn list_compositions(&self) -> Result<Vec<CompositionSummary>, PersistenceError> {
        let compositions = self.compositions.lock();
        let mut summaries: Vec<CompositionSummary> = compositions
            .iter()
            .map(|(id, composition)| CompositionSummary::of(id.clone(), composition))
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }
}

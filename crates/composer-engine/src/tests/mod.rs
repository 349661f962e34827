//! Shared helpers for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::time::Instant;

use crate::blocks::ContentBlock;
use crate::composition::{
    Composition, CompositionId, CompositionKind, CompositionPayload, CompositionSummary,
};
use crate::persistence::{PersistenceClient, PersistenceError};

/// Text blocks whose id equals their content, with dense order
pub fn text_blocks(contents: &[&str]) -> Vec<ContentBlock> {
    contents
        .iter()
        .enumerate()
        .map(|(index, content)| {
            let mut block = ContentBlock::text(*content).with_id(*content);
            block.order = index as u32;
            block
        })
        .collect()
}

pub fn ids(blocks: &[ContentBlock]) -> Vec<&str> {
    blocks.iter().map(|block| block.id.as_str()).collect()
}

pub fn contents(blocks: &[ContentBlock]) -> Vec<&str> {
    blocks.iter().filter_map(ContentBlock::text_content).collect()
}

pub fn payload_named(name: &str) -> CompositionPayload {
    CompositionPayload {
        name: name.to_string(),
        kind: CompositionKind::Email,
        ..Default::default()
    }
}

pub fn create_test_store_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

#[derive(Clone, Debug)]
pub struct RecordedUpdate {
    pub id: CompositionId,
    pub payload: CompositionPayload,
    pub at: Instant,
}

type ErrorFactory = fn() -> PersistenceError;

/// Persistence fake that records every call and can be told to fail
#[derive(Default)]
pub struct RecordingClient {
    latency: Duration,
    creates: Mutex<Vec<CompositionPayload>>,
    updates: Mutex<Vec<RecordedUpdate>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_creates: Mutex<Option<ErrorFactory>>,
    fail_updates: Mutex<Option<ErrorFactory>>,
}

impl RecordingClient {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    pub fn fail_creates_with(&self, error: ErrorFactory) {
        *self.fail_creates.lock() = Some(error);
    }

    pub fn fail_updates_with(&self, error: ErrorFactory) {
        *self.fail_updates.lock() = Some(error);
    }

    pub fn clear_failures(&self) {
        *self.fail_creates.lock() = None;
        *self.fail_updates.lock() = None;
    }

    pub fn creates(&self) -> Vec<CompositionPayload> {
        self.creates.lock().clone()
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().clone()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceClient for RecordingClient {
    async fn create_composition(
        &self,
        payload: &CompositionPayload,
    ) -> Result<CompositionId, PersistenceError> {
        if let Some(error) = *self.fail_creates.lock() {
            return Err(error());
        }
        let mut creates = self.creates.lock();
        creates.push(payload.clone());
        Ok(CompositionId::from(format!("created-{}", creates.len())))
    }

    async fn update_composition(
        &self,
        id: &CompositionId,
        payload: &CompositionPayload,
    ) -> Result<(), PersistenceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.updates.lock().push(RecordedUpdate {
            id: id.clone(),
            payload: payload.clone(),
            at: Instant::now(),
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failure = *self.fail_updates.lock();
        match failure {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }

    async fn load_composition(&self, id: &CompositionId) -> Result<Composition, PersistenceError> {
        Err(PersistenceError::NotFound(id.clone()))
    }

    async fn list_compositions(&self) -> Result<Vec<CompositionSummary>, PersistenceError> {
        Ok(Vec::new())
    }
}

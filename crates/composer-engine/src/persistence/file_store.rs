use std::path::{Path, PathBuf};

use async_trait::async_trait;
use relative_path::RelativePathBuf;

use super::{PersistenceClient, PersistenceError};
use crate::composition::{
    Composition, CompositionId, CompositionPayload, CompositionSummary, now_millis,
};

const EXTENSION: &str = "json";

/// Stores each composition as `<id>.json` under a root directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-save leaves the previous version intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        if !root.is_dir() {
            return Err(PersistenceError::Unavailable(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &CompositionId) -> Result<PathBuf, PersistenceError> {
        let valid = !id.as_str().is_empty()
            && id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PersistenceError::InvalidId(id.to_string()));
        }
        Ok(RelativePathBuf::from(format!("{id}.{EXTENSION}")).to_path(&self.root))
    }

    async fn read(&self, id: &CompositionId) -> Result<Composition, PersistenceError> {
        let path = self.path_for(id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(id.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        let mut composition: Composition = serde_json::from_slice(&bytes)?;
        composition.id = Some(id.clone());
        Ok(composition)
    }

    async fn write(&self, id: &CompositionId, composition: &Composition) -> Result<(), PersistenceError> {
        let path = self.path_for(id)?;
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        let bytes = serde_json::to_vec_pretty(composition)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceClient for FileStore {
    async fn create_composition(
        &self,
        payload: &CompositionPayload,
    ) -> Result<CompositionId, PersistenceError> {
        let id = CompositionId::generate();
        let composition = Composition::from_payload(id.clone(), payload.clone(), now_millis());
        self.write(&id, &composition).await?;
        log::debug!("created composition {id} in {}", self.root.display());
        Ok(id)
    }

    async fn update_composition(
        &self,
        id: &CompositionId,
        payload: &CompositionPayload,
    ) -> Result<(), PersistenceError> {
        let mut composition = self.read(id).await?;
        composition.apply_payload(payload.clone(), now_millis());
        self.write(id, &composition).await
    }

    async fn load_composition(&self, id: &CompositionId) -> Result<Composition, PersistenceError> {
        self.read(id).await
    }

    async fn list_compositions(&self) -> Result<Vec<CompositionSummary>, PersistenceError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut summaries = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id = CompositionId::from(stem);
            match self.read(&id).await {
                Ok(composition) => summaries.push(CompositionSummary::of(id, &composition)),
                Err(err) => log::warn!("skipping unreadable composition {}: {err}", path.display()),
            }
        }

        summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }
}

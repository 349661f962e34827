use crate::autosave::AutosaveReport;
use crate::composition::{Composition, CompositionId, CompositionPayload, now_millis};
use crate::import::{self, SourceCopy};
use crate::persistence::PersistenceError;

use super::{Editor, Mutation, SaveMode};

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("a name is required to save a new composition")]
    NameRequired,
    #[error("name must be at least {min} characters")]
    NameTooShort { min: usize },
    #[error("saving is disabled for this session")]
    SavingDisabled,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// First save of a new composition; autosave is now armed for this id
    Created(CompositionId),
    Updated,
}

/// Result of offering copy to the editor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyOffer {
    /// The editor was empty and now holds the imported copy
    Applied,
    /// Existing content would be lost; call [`Editor::resolve_copy`]
    NeedsChoice,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyChoice {
    Replace,
    /// Start a new unsaved composition seeded from the copy
    Branch,
}

impl Editor {
    /// Save explicitly.
    ///
    /// A new composition is created (and autosave armed for the returned id);
    /// a loaded one is updated in place through the autosave scheduler so the
    /// two never overlap. The name is validated before any call is made.
    /// Failed calls leave the blocks untouched.
    pub async fn save(&mut self, name: Option<&str>) -> Result<SaveOutcome, SaveError> {
        if self.save_mode == SaveMode::Disabled {
            return Err(SaveError::SavingDisabled);
        }
        let name = self.validate_name(name)?;

        let mut payload = self.composition.payload();
        payload.name = name.clone();

        let result = match self.composition.id.clone() {
            None => self
                .client
                .create_composition(&payload)
                .await
                .map(SaveOutcome::Created),
            Some(id) => self.update_in_place(&id, payload).await.map(|()| SaveOutcome::Updated),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("saving composition failed: {err}");
                if err.is_fatal() {
                    self.degrade(&err);
                }
                return Err(err.into());
            }
        };

        let now = now_millis();
        self.composition.name = name;
        self.composition.updated_at = Some(now);
        if let SaveOutcome::Created(id) = &outcome {
            log::info!("created composition {id}");
            self.composition.id = Some(id.clone());
            self.composition.created_at = Some(now);
            self.arm_autosave();
        } else {
            log::info!("saved composition {}", self.composition.name);
        }
        self.publish();
        Ok(outcome)
    }

    fn validate_name(&self, name: Option<&str>) -> Result<String, SaveError> {
        let name = match name.map(str::trim) {
            Some(name) => name,
            None if self.composition.name.trim().is_empty() => {
                return Err(SaveError::NameRequired);
            }
            None => self.composition.name.trim(),
        };
        if name.chars().count() < self.settings.min_name_len {
            return Err(SaveError::NameTooShort {
                min: self.settings.min_name_len,
            });
        }
        Ok(name.to_string())
    }

    async fn update_in_place(
        &self,
        id: &CompositionId,
        payload: CompositionPayload,
    ) -> Result<(), PersistenceError> {
        if self.autosave.is_running() {
            self.autosave.save_now(id, payload).await
        } else {
            self.client.update_composition(id, &payload).await
        }
    }

    /// Collect finished background saves for the loaded composition.
    ///
    /// Reports for any other id arrived after a switch and are dropped. A
    /// fatal failure switches the editor to [`SaveMode::Disabled`].
    pub fn drain_autosave_reports(&mut self) -> Vec<AutosaveReport> {
        let mut reports = Vec::new();
        while let Some(report) = self.autosave.try_next_report() {
            if self.composition.id.as_ref() != Some(&report.id) {
                log::debug!("discarding late autosave report for {}", report.id);
                continue;
            }
            if let Err(err) = &report.result
                && err.is_fatal()
            {
                self.degrade(err);
            }
            reports.push(report);
        }
        reports
    }

    fn degrade(&mut self, err: &PersistenceError) {
        if self.save_mode == SaveMode::Disabled {
            return;
        }
        log::warn!("saving disabled for this session: {err}");
        self.save_mode = SaveMode::Disabled;
        self.autosave.unload();
    }

    /// Seed an empty composition from copy. Runs at most once per
    /// composition; returns whether blocks were created.
    pub fn import_initial_copy(&mut self, copies: &[SourceCopy]) -> bool {
        if self.copy_imported || copies.is_empty() {
            return false;
        }
        self.copy_imported = true;
        let Some(blocks) = import::import_copy(&self.composition.blocks, copies) else {
            return false;
        };
        self.apply(Mutation::ReplaceBlocks(blocks));
        self.apply(Mutation::SetSelectedCopies(copy_ids(copies)));
        true
    }

    /// Offer new copy. Applied directly when there is no content to
    /// protect, otherwise held until [`Editor::resolve_copy`].
    pub fn offer_copy(&mut self, copies: Vec<SourceCopy>) -> CopyOffer {
        if self.composition.blocks.is_empty() {
            self.replace_with_copy(&copies);
            return CopyOffer::Applied;
        }
        self.pending_copy = Some(copies);
        CopyOffer::NeedsChoice
    }

    pub fn has_pending_copy(&self) -> bool {
        self.pending_copy.is_some()
    }

    /// Apply the held copy. `Branch` returns the composition that was being
    /// edited; the editor continues on a new unsaved one.
    pub fn resolve_copy(&mut self, choice: CopyChoice) -> Option<Composition> {
        let Some(copies) = self.pending_copy.take() else {
            log::debug!("no pending copy to resolve");
            return None;
        };
        match choice {
            CopyChoice::Replace => {
                self.replace_with_copy(&copies);
                None
            }
            CopyChoice::Branch => {
                let previous = self.switch_composition(Composition::branch_from(&self.composition));
                self.replace_with_copy(&copies);
                log::info!("branched a new composition from {:?}", previous.id);
                Some(previous)
            }
        }
    }

    fn replace_with_copy(&mut self, copies: &[SourceCopy]) {
        self.copy_imported = true;
        if let Some(blocks) = import::import_copy(&[], copies) {
            self.active.clear();
            self.apply(Mutation::ReplaceBlocks(blocks));
        }
        self.apply(Mutation::SetSelectedCopies(copy_ids(copies)));
    }
}

fn copy_ids(copies: &[SourceCopy]) -> Vec<String> {
    copies.iter().map(|copy| copy.id.clone()).collect()
}

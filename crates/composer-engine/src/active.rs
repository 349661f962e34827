use crate::blocks::BlockId;

/// Cursor on the block most recently focused or created.
///
/// Used as the anchor for "insert below"; never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveBlock {
    id: Option<BlockId>,
}

impl ActiveBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&BlockId> {
        self.id.as_ref()
    }

    pub fn set(&mut self, id: BlockId) {
        self.id = Some(id);
    }

    pub fn clear(&mut self) {
        self.id = None;
    }

    /// Clear the cursor if it points at a block that was just removed
    pub fn on_removed(&mut self, removed: &BlockId) {
        if self.id.as_ref() == Some(removed) {
            self.id = None;
        }
    }
}

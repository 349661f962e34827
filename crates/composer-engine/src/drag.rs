//! Drag-and-drop reorder controller.
//!
//! Pointer events only touch the transient drag state; the block list is
//! changed once, on drop, by a single [`Reorder`].

use crate::blocks::{BlockId, ContentBlock, ops};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    /// Source is recorded by id because indices shift while dragging
    Dragging { source: BlockId },
    Hovering { source: BlockId, target_index: usize },
}

/// A resolved move, in `ops::move_block` index space
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reorder {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Id of the block being dragged, for visual feedback
    pub fn dragged(&self) -> Option<&BlockId> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging { source } | DragState::Hovering { source, .. } => Some(source),
        }
    }

    /// Index of the insertion marker, for visual feedback
    pub fn hover_index(&self) -> Option<usize> {
        match &self.state {
            DragState::Hovering { target_index, .. } => Some(*target_index),
            _ => None,
        }
    }

    /// Begin a drag. Ignored while another drag is active.
    pub fn on_drag_start(&mut self, id: BlockId) -> bool {
        if self.is_dragging() {
            log::debug!("drag start for {id} ignored, drag already active");
            return false;
        }
        self.state = DragState::Dragging { source: id };
        true
    }

    pub fn on_drag_over(&mut self, index: usize) {
        let source = match &self.state {
            DragState::Idle => return,
            DragState::Dragging { source } | DragState::Hovering { source, .. } => source.clone(),
        };
        self.state = DragState::Hovering {
            source,
            target_index: index,
        };
    }

    /// Resolve the gesture against the live list and return to idle.
    ///
    /// Returns `None` when the source block is gone, nothing was hovered, or
    /// the target is not a valid index.
    pub fn on_drop(&mut self, blocks: &[ContentBlock]) -> Option<Reorder> {
        let state = std::mem::take(&mut self.state);
        let DragState::Hovering {
            source,
            target_index,
        } = state
        else {
            return None;
        };

        let Some(from) = ops::position(blocks, &source) else {
            log::debug!("dropped block {source} no longer exists");
            return None;
        };
        if target_index >= blocks.len() {
            log::debug!("drop target {target_index} out of range");
            return None;
        }
        Some(Reorder {
            from,
            to: target_index,
        })
    }

    /// End of gesture, with or without a drop
    pub fn on_drag_end(&mut self) {
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{ids, text_blocks};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_drag_over_does_not_touch_blocks_and_drop_moves_once() {
        let blocks = text_blocks(&["a", "b", "c"]);
        let mut drag = DragController::new();

        assert!(drag.on_drag_start(BlockId::from("a")));
        drag.on_drag_over(1);
        drag.on_drag_over(2);
        assert_eq!(drag.hover_index(), Some(2));

        let reorder = drag.on_drop(&blocks).unwrap();

        assert_eq!(reorder, Reorder { from: 0, to: 2 });
        assert_eq!(
            ids(&ops::move_block(&blocks, reorder.from, reorder.to)),
            vec!["b", "c", "a"]
        );
        assert_eq!(drag.state(), &DragState::Idle);
    }

    #[test]
    fn test_source_index_is_resolved_live() {
        let mut drag = DragController::new();
        drag.on_drag_start(BlockId::from("c"));
        drag.on_drag_over(0);

        // A block was inserted ahead of the source mid-drag
        let blocks = text_blocks(&["x", "a", "b", "c"]);

        assert_eq!(drag.on_drop(&blocks), Some(Reorder { from: 3, to: 0 }));
    }

    #[test]
    fn test_second_drag_start_is_ignored() {
        let mut drag = DragController::new();
        drag.on_drag_start(BlockId::from("a"));

        assert!(!drag.on_drag_start(BlockId::from("b")));
        assert_eq!(drag.dragged(), Some(&BlockId::from("a")));
    }

    #[test]
    fn test_drop_outside_valid_target_is_noop() {
        let blocks = text_blocks(&["a", "b"]);
        let mut drag = DragController::new();
        drag.on_drag_start(BlockId::from("a"));
        drag.on_drag_over(7);

        assert_eq!(drag.on_drop(&blocks), None);
        assert_eq!(drag.state(), &DragState::Idle);
    }

    #[test]
    fn test_drop_without_hover_is_noop() {
        let blocks = text_blocks(&["a", "b"]);
        let mut drag = DragController::new();
        drag.on_drag_start(BlockId::from("a"));

        assert_eq!(drag.on_drop(&blocks), None);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_drag_end_clears_hover() {
        let mut drag = DragController::new();
        drag.on_drag_start(BlockId::from("a"));
        drag.on_drag_over(1);

        drag.on_drag_end();

        assert_eq!(drag.hover_index(), None);
        assert_eq!(drag.dragged(), None);
    }

    #[test]
    fn test_drag_over_while_idle_is_ignored() {
        let mut drag = DragController::new();

        drag.on_drag_over(3);

        assert_eq!(drag.state(), &DragState::Idle);
    }

    #[test]
    fn test_removed_source_drops_to_noop() {
        let mut drag = DragController::new();
        drag.on_drag_start(BlockId::from("gone"));
        drag.on_drag_over(0);

        assert_eq!(drag.on_drop(&text_blocks(&["a"])), None);
    }
}

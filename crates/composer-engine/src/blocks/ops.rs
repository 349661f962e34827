//! Pure operations over a block list.
//!
//! Every operation takes the current list by reference and returns a new one
//! with `order` renumbered, so consumers only ever observe complete states.
//! Unknown ids and out-of-range indices are no-ops rather than errors: they
//! are routinely produced by UI events racing async state.

use std::collections::HashSet;

use super::{BlockBody, BlockId, BlockPatch, ContentBlock};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("block at index {index} has an empty id")]
    EmptyId { index: usize },
    #[error("duplicate block id: {0}")]
    DuplicateId(BlockId),
    #[error("order {order} at index {index} does not follow {previous}")]
    OrderNotIncreasing { index: usize, order: u32, previous: u32 },
}

/// Rewrite `order` from list position (0..n-1)
pub fn renumber(blocks: &mut [ContentBlock]) {
    for (index, block) in blocks.iter_mut().enumerate() {
        block.order = index as u32;
    }
}

/// Index of the block with the given id
pub fn position(blocks: &[ContentBlock], id: &BlockId) -> Option<usize> {
    blocks.iter().position(|block| &block.id == id)
}

/// Insert `new_block` directly after `anchor`, or append when the anchor is
/// `None` or no longer present.
pub fn insert_after(
    blocks: &[ContentBlock],
    anchor: Option<&BlockId>,
    new_block: ContentBlock,
) -> Vec<ContentBlock> {
    let mut next = blocks.to_vec();
    let at = match anchor {
        Some(anchor_id) => match position(blocks, anchor_id) {
            Some(index) => index + 1,
            None => {
                log::debug!("insert anchor {anchor_id} not found, appending");
                next.len()
            }
        },
        None => next.len(),
    };
    next.insert(at, new_block);
    renumber(&mut next);
    next
}

pub fn remove(blocks: &[ContentBlock], id: &BlockId) -> Vec<ContentBlock> {
    let mut next: Vec<ContentBlock> = blocks.iter().filter(|b| &b.id != id).cloned().collect();
    if next.len() == blocks.len() {
        log::debug!("remove: block {id} not found");
    }
    renumber(&mut next);
    next
}

/// Take the block at `from` and reinsert it at `to`, where `to` is an index
/// into the list after removal.
pub fn move_block(blocks: &[ContentBlock], from: usize, to: usize) -> Vec<ContentBlock> {
    let mut next = blocks.to_vec();
    if from >= next.len() || to >= next.len() {
        log::debug!("move {from} -> {to} out of range for {} blocks", next.len());
        renumber(&mut next);
        return next;
    }
    let block = next.remove(from);
    next.insert(to, block);
    renumber(&mut next);
    next
}

/// Shallow-merge `patch` into the block with the given id
pub fn update(blocks: &[ContentBlock], id: &BlockId, patch: &BlockPatch) -> Vec<ContentBlock> {
    let mut next = blocks.to_vec();
    match next.iter_mut().find(|block| &block.id == id) {
        Some(block) => {
            patch.apply_to(block);
        }
        None => log::debug!("update: block {id} not found"),
    }
    renumber(&mut next);
    next
}

/// Swap the payload of a block while keeping its id, position and metadata
pub fn replace_body(blocks: &[ContentBlock], id: &BlockId, body: BlockBody) -> Vec<ContentBlock> {
    let mut next = blocks.to_vec();
    if let Some(block) = next.iter_mut().find(|block| &block.id == id) {
        block.body = body;
    }
    renumber(&mut next);
    next
}

/// Verify unique, non-empty ids and strictly increasing `order`
pub fn check_invariants(blocks: &[ContentBlock]) -> Result<(), BlockError> {
    let mut seen = HashSet::with_capacity(blocks.len());
    let mut previous: Option<u32> = None;

    for (index, block) in blocks.iter().enumerate() {
        if block.id.is_empty() {
            return Err(BlockError::EmptyId { index });
        }
        if !seen.insert(&block.id) {
            return Err(BlockError::DuplicateId(block.id.clone()));
        }
        if let Some(previous) = previous
            && block.order <= previous
        {
            return Err(BlockError::OrderNotIncreasing {
                index,
                order: block.order,
                previous,
            });
        }
        previous = Some(block.order);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Element;
    use crate::tests::{contents, ids, text_blocks};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_insert_after_null_anchor_appends() {
        let blocks = text_blocks(&["a", "b"]);

        let next = insert_after(&blocks, None, ContentBlock::text("c").with_id("c"));

        assert_eq!(contents(&next), vec!["a", "b", "c"]);
        assert_eq!(next.iter().map(|b| b.order).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_insert_after_anchor_places_directly_below() {
        let blocks = text_blocks(&["a", "b", "c"]);

        let next = insert_after(&blocks, Some(&BlockId::from("a")), ContentBlock::text("x"));

        assert_eq!(contents(&next), vec!["a", "x", "b", "c"]);
        check_invariants(&next).unwrap();
    }

    #[test]
    fn test_insert_after_unknown_anchor_falls_back_to_append() {
        let blocks = text_blocks(&["a", "b"]);

        let next = insert_after(&blocks, Some(&BlockId::from("gone")), ContentBlock::text("x"));

        assert_eq!(contents(&next), vec!["a", "b", "x"]);
    }

    #[test]
    fn test_insert_leaves_input_untouched() {
        let blocks = text_blocks(&["a", "b"]);
        let before = blocks.clone();

        let _ = insert_after(&blocks, Some(&BlockId::from("a")), ContentBlock::divider());

        assert_eq!(blocks, before);
    }

    #[test]
    fn test_remove_renumbers_densely() {
        let blocks = text_blocks(&["a", "b", "c"]);

        let next = remove(&blocks, &BlockId::from("b"));

        assert_eq!(ids(&next), vec!["a", "c"]);
        assert_eq!(next.iter().map(|b| b.order).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let blocks = text_blocks(&["a", "b"]);

        let next = remove(&blocks, &BlockId::from("zzz"));

        assert_eq!(next, blocks);
    }

    #[rstest]
    #[case(0, 2, vec!["b", "c", "a", "d"])]
    #[case(3, 0, vec!["d", "a", "b", "c"])]
    #[case(1, 2, vec!["a", "c", "b", "d"])]
    #[case(2, 2, vec!["a", "b", "c", "d"])]
    fn test_move_uses_post_removal_index(
        #[case] from: usize,
        #[case] to: usize,
        #[case] expected: Vec<&str>,
    ) {
        let blocks = text_blocks(&["a", "b", "c", "d"]);

        let next = move_block(&blocks, from, to);

        assert_eq!(ids(&next), expected);
        check_invariants(&next).unwrap();
    }

    #[rstest]
    #[case(4, 0)]
    #[case(0, 4)]
    #[case(usize::MAX, 1)]
    fn test_move_out_of_range_is_noop(#[case] from: usize, #[case] to: usize) {
        let blocks = text_blocks(&["a", "b", "c", "d"]);

        let next = move_block(&blocks, from, to);

        assert_eq!(ids(&next), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_move_is_invertible() {
        let blocks = text_blocks(&["a", "b", "c", "d", "e"]);

        for from in 0..blocks.len() {
            for to in 0..blocks.len() {
                let moved = move_block(&blocks, from, to);
                let restored = move_block(&moved, to, from);
                assert_eq!(restored, blocks, "move {from} -> {to} did not invert");
            }
        }
    }

    #[test]
    fn test_update_merges_patch_into_matching_block() {
        let blocks = text_blocks(&["a", "b"]);
        let patch = BlockPatch {
            content: Some("changed".into()),
            element: Some(Element::H2),
            ..Default::default()
        };

        let next = update(&blocks, &BlockId::from("b"), &patch);

        assert_eq!(next[1].text_content(), Some("changed"));
        assert_eq!(next[1].element(), Some(Element::H2));
        assert_eq!(next[0], blocks[0]);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let blocks = text_blocks(&["a"]);

        let next = update(&blocks, &BlockId::from("x"), &BlockPatch::content("nope"));

        assert_eq!(next, blocks);
    }

    #[test]
    fn test_replace_body_keeps_id_and_position() {
        let blocks = text_blocks(&["a", "b", "c"]);

        let next = replace_body(&blocks, &BlockId::from("b"), BlockBody::Divider);

        assert_eq!(ids(&next), vec!["a", "b", "c"]);
        assert_eq!(next[1].body, BlockBody::Divider);
    }

    #[test]
    fn test_check_invariants_reports_duplicates() {
        let mut blocks = text_blocks(&["a", "b"]);
        blocks[1].id = BlockId::from("a");

        assert_eq!(
            check_invariants(&blocks),
            Err(BlockError::DuplicateId(BlockId::from("a")))
        );
    }

    #[test]
    fn test_check_invariants_reports_unsorted_order() {
        let mut blocks = text_blocks(&["a", "b"]);
        blocks[1].order = 0;

        assert!(matches!(
            check_invariants(&blocks),
            Err(BlockError::OrderNotIncreasing { index: 1, .. })
        ));
    }

    #[test]
    fn test_invariants_hold_across_operation_sequences() {
        // Deterministic pseudo-random walk over insert/remove/move
        let mut blocks: Vec<ContentBlock> = Vec::new();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next_rand = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for step in 0..500 {
            let len = blocks.len();
            let choice = if len == 0 { 0 } else { next_rand() % 3 };
            blocks = match choice {
                0 => {
                    let anchor = (len > 0).then(|| blocks[(next_rand() as usize) % len].id.clone());
                    insert_after(&blocks, anchor.as_ref(), ContentBlock::text(format!("{step}")))
                }
                1 => {
                    let id = blocks[(next_rand() as usize) % len].id.clone();
                    remove(&blocks, &id)
                }
                _ => {
                    let from = (next_rand() as usize) % len;
                    let to = (next_rand() as usize) % len;
                    move_block(&blocks, from, to)
                }
            };
            check_invariants(&blocks).unwrap();
            let orders: Vec<u32> = blocks.iter().map(|b| b.order).collect();
            let dense: Vec<u32> = (0..blocks.len() as u32).collect();
            assert_eq!(orders, dense);
        }
    }
}

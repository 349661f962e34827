use std::collections::HashSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::blocks::{BlockBody, BlockId, ContentBlock, Element, ops};

/// Identifier assigned by the persistence backend on first save
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositionId(String);

impl CompositionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CompositionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CompositionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositionKind {
    #[default]
    Email,
    News,
}

impl CompositionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CompositionKind::Email => "email",
            CompositionKind::News => "news",
        }
    }
}

impl fmt::Display for CompositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompositionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(CompositionKind::Email),
            "news" => Ok(CompositionKind::News),
            other => Err(format!("unknown composition type: {other}")),
        }
    }
}

/// Linked resources; the stylesheet id is opaque pass-through
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompositionMetadata {
    pub selected_copies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stylesheet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The persisted shape of a composition, sent on create and update
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CompositionKind,
    pub blocks: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub metadata: CompositionMetadata,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CompositionId>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: CompositionKind,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub metadata: CompositionMetadata,
    /// Milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
}

impl Composition {
    /// Empty, unsaved composition
    pub fn new(kind: CompositionKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Start a new unsaved composition that keeps the template and linked
    /// resources of `previous` but none of its content
    pub fn branch_from(previous: &Composition) -> Self {
        Self {
            kind: previous.kind,
            template: previous.template.clone(),
            metadata: CompositionMetadata {
                selected_copies: Vec::new(),
                ..previous.metadata.clone()
            },
            ..Default::default()
        }
    }

    pub fn from_payload(id: CompositionId, payload: CompositionPayload, now: u64) -> Self {
        Self {
            id: Some(id),
            name: payload.name,
            kind: payload.kind,
            blocks: payload.blocks,
            template: payload.template,
            metadata: payload.metadata,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// True until the first successful create returns an id
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn payload(&self) -> CompositionPayload {
        CompositionPayload {
            name: self.name.clone(),
            kind: self.kind,
            blocks: self.blocks.clone(),
            template: self.template.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn apply_payload(&mut self, payload: CompositionPayload, now: u64) {
        self.name = payload.name;
        self.kind = payload.kind;
        self.blocks = payload.blocks;
        self.template = payload.template;
        self.metadata = payload.metadata;
        self.updated_at = Some(now);
    }

    pub fn block(&self, id: &BlockId) -> Option<&ContentBlock> {
        self.blocks.iter().find(|block| &block.id == id)
    }

    pub fn position(&self, id: &BlockId) -> Option<usize> {
        ops::position(&self.blocks, id)
    }

    /// Normalize freshly loaded data once, so the mutation paths never need
    /// to patch legacy records.
    pub fn hydrate(mut self) -> Self {
        self.normalize();
        self
    }

    /// Sort by stored order, repair empty or duplicate ids, give legacy
    /// headings without an element `h2`, then renumber. Returns the number of
    /// repaired blocks.
    pub fn normalize(&mut self) -> usize {
        let mut repaired = 0;
        self.blocks.sort_by_key(|block| block.order);

        let mut seen = HashSet::with_capacity(self.blocks.len());
        for block in &mut self.blocks {
            let mut touched = false;
            if block.id.is_empty() || seen.contains(&block.id) {
                block.id = BlockId::generate();
                touched = true;
            }
            seen.insert(block.id.clone());

            if let BlockBody::Heading { element, .. } = &mut block.body
                && *element == Element::P
            {
                *element = Element::H2;
                touched = true;
            }
            if touched {
                repaired += 1;
            }
        }
        ops::renumber(&mut self.blocks);

        if repaired > 0 {
            log::info!("normalized {repaired} legacy blocks while loading composition");
        }
        repaired
    }
}

/// Listing entry for a stored composition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSummary {
    pub id: CompositionId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CompositionKind,
    pub block_count: usize,
    pub updated_at: Option<u64>,
}

impl CompositionSummary {
    pub fn of(id: CompositionId, composition: &Composition) -> Self {
        Self {
            id,
            name: composition.name.clone(),
            kind: composition.kind,
            block_count: composition.blocks.len(),
            updated_at: composition.updated_at,
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::ops::check_invariants;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_hydrate_repairs_legacy_records() {
        let composition: Composition = serde_json::from_value(json!({
            "id": "c1",
            "name": "Spring",
            "type": "news",
            "blocks": [
                {"id": "b", "order": 5, "type": "text", "content": "second"},
                {"id": "a", "order": 2, "type": "heading", "content": "first"},
                {"id": "b", "order": 9, "type": "divider"},
                {"order": 11, "type": "text", "content": "no id"}
            ]
        }))
        .unwrap();

        let hydrated = composition.hydrate();

        check_invariants(&hydrated.blocks).unwrap();
        assert_eq!(hydrated.blocks[0].id, BlockId::from("a"));
        assert_eq!(hydrated.blocks[0].element(), Some(Element::H2));
        assert_eq!(hydrated.blocks[1].text_content(), Some("second"));
        assert_ne!(hydrated.blocks[2].id, BlockId::from("b"));
        assert!(!hydrated.blocks[3].id.is_empty());
        assert_eq!(hydrated.kind, CompositionKind::News);
    }

    #[test]
    fn test_hydrate_keeps_list_position_when_orders_missing() {
        let composition: Composition = serde_json::from_value(json!({
            "blocks": [
                {"id": "x", "type": "text", "content": "1"},
                {"id": "y", "type": "text", "content": "2"},
                {"id": "z", "type": "text", "content": "3"}
            ]
        }))
        .unwrap();

        let hydrated = composition.hydrate();

        let ids: Vec<_> = hydrated.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
        assert_eq!(hydrated.blocks[2].order, 2);
    }

    #[test]
    fn test_clean_composition_needs_no_repair() {
        let mut composition = Composition::new(CompositionKind::Email);
        composition.blocks = crate::tests::text_blocks(&["a", "b"]);

        assert_eq!(composition.normalize(), 0);
    }

    #[test]
    fn test_payload_serializes_type_and_camel_case() {
        let mut composition = Composition::new(CompositionKind::News);
        composition.name = "Weekly".into();
        composition.metadata.stylesheet_id = Some("s1".into());

        let value = serde_json::to_value(composition.payload()).unwrap();

        assert_eq!(value["type"], json!("news"));
        assert_eq!(value["metadata"]["stylesheetId"], json!("s1"));
        assert_eq!(value["metadata"]["selectedCopies"], json!([]));
    }

    #[test]
    fn test_branch_keeps_resources_but_not_content() {
        let mut previous = Composition::new(CompositionKind::News);
        previous.id = Some(CompositionId::from("c1"));
        previous.name = "Original".into();
        previous.template = Some("t1".into());
        previous.metadata.project_id = Some("p1".into());
        previous.metadata.selected_copies = vec!["copy-1".into()];
        previous.blocks = crate::tests::text_blocks(&["a"]);

        let branch = Composition::branch_from(&previous);

        assert!(branch.is_new());
        assert!(branch.blocks.is_empty());
        assert_eq!(branch.name, "");
        assert_eq!(branch.kind, CompositionKind::News);
        assert_eq!(branch.template.as_deref(), Some("t1"));
        assert_eq!(branch.metadata.project_id.as_deref(), Some("p1"));
        assert!(branch.metadata.selected_copies.is_empty());
    }
}

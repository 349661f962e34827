//! The composition editor.
//!
//! [`Editor`] owns the document and every piece of transient UI state around
//! it. All document changes go through [`Editor::apply`], which replaces the
//! block list atomically, publishes a preview snapshot and notifies the
//! autosave scheduler. Toolbar, drag and frontmatter actions are thin
//! wrappers that build a [`Mutation`].

mod save;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::active::ActiveBlock;
use crate::autosave::{AutosaveHandle, AutosaveState, DEFAULT_AUTOSAVE_DELAY};
use crate::blocks::{
    BlockId, BlockPatch, ContentBlock, FrontmatterField, GalleryLink, ops,
};
use crate::composition::{Composition, CompositionId, CompositionKind};
use crate::drag::{DragController, DragState, Reorder};
use crate::frontmatter::{self, DEFAULT_MIN_PAIRS, FrontmatterDetector};
use crate::import::SourceCopy;
use crate::persistence::{PersistenceClient, PersistenceError};

pub use save::{CopyChoice, CopyOffer, SaveError, SaveOutcome};

pub const DEFAULT_MIN_NAME_LEN: usize = 3;

/// Tunables for one editor session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorSettings {
    pub autosave_delay: Duration,
    pub autosave_enabled: bool,
    /// Minimum trimmed length of a composition name on save
    pub min_name_len: usize,
    pub frontmatter_min_pairs: usize,
    /// Keys of a freshly added frontmatter block
    pub frontmatter_template: Vec<String>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            autosave_enabled: true,
            min_name_len: DEFAULT_MIN_NAME_LEN,
            frontmatter_min_pairs: DEFAULT_MIN_PAIRS,
            frontmatter_template: vec!["subject".to_string(), "preheader".to_string()],
        }
    }
}

/// Whether the editor may still talk to the persistence backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveMode {
    #[default]
    Enabled,
    /// Entered after a fatal persistence error; editing continues locally
    Disabled,
}

/// Image record handed over by the gallery provider
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryImage {
    pub id: Option<String>,
    pub url: String,
    pub alt: String,
    pub gallery_id: Option<String>,
    pub gallery_name: Option<String>,
}

impl GalleryImage {
    fn link(&self) -> GalleryLink {
        GalleryLink {
            gallery_id: self.gallery_id.clone(),
            gallery_name: self.gallery_name.clone(),
            image_id: self.id.clone(),
        }
    }
}

/// Every change the editor can make to its composition
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    InsertAfter {
        anchor: Option<BlockId>,
        block: ContentBlock,
    },
    Remove {
        id: BlockId,
    },
    Update {
        id: BlockId,
        patch: BlockPatch,
    },
    Move {
        from: usize,
        to: usize,
    },
    ConvertToFrontmatter {
        id: BlockId,
    },
    ReplaceBlocks(Vec<ContentBlock>),
    SetName(String),
    SetTemplate(Option<String>),
    SetSelectedCopies(Vec<String>),
    SetStylesheet(Option<String>),
}

pub struct Editor {
    client: Arc<dyn PersistenceClient>,
    settings: EditorSettings,
    composition: Composition,
    active: ActiveBlock,
    drag: DragController,
    detector: FrontmatterDetector,
    autosave: AutosaveHandle,
    preview: watch::Sender<Arc<Composition>>,
    save_mode: SaveMode,
    /// Set once the copy importer has run for this composition
    copy_imported: bool,
    pending_copy: Option<Vec<SourceCopy>>,
    /// Incremented on every applied mutation
    version: u64,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("composition", &self.composition.id)
            .field("blocks", &self.composition.blocks.len())
            .field("active", &self.active)
            .field("save_mode", &self.save_mode)
            .field("version", &self.version)
            .finish()
    }
}

impl Editor {
    /// Editor for a new, unsaved composition
    pub fn new(
        client: Arc<dyn PersistenceClient>,
        kind: CompositionKind,
        settings: EditorSettings,
    ) -> Self {
        Self::open(client, Composition::new(kind), settings)
    }

    /// Editor over an existing composition; hydrates it and arms autosave
    /// when it has an id.
    pub fn open(
        client: Arc<dyn PersistenceClient>,
        composition: Composition,
        settings: EditorSettings,
    ) -> Self {
        let composition = composition.hydrate();
        let autosave = AutosaveHandle::spawn(client.clone(), settings.autosave_delay);
        let (preview, _) = watch::channel(Arc::new(composition.clone()));
        let detector = FrontmatterDetector::new(settings.frontmatter_min_pairs);

        let editor = Self {
            client,
            settings,
            copy_imported: !composition.blocks.is_empty(),
            composition,
            active: ActiveBlock::new(),
            drag: DragController::new(),
            detector,
            autosave,
            preview,
            save_mode: SaveMode::Enabled,
            pending_copy: None,
            version: 0,
        };
        editor.arm_autosave();
        editor
    }

    /// Fetch and open a stored composition
    pub async fn load(
        client: Arc<dyn PersistenceClient>,
        id: &CompositionId,
        settings: EditorSettings,
    ) -> Result<Self, PersistenceError> {
        let mut composition = client.load_composition(id).await?;
        composition.id = Some(id.clone());
        log::info!("loaded composition {id} ({} blocks)", composition.blocks.len());
        Ok(Self::open(client, composition, settings))
    }

    /// Replace the frontmatter policy
    pub fn with_detector(mut self, detector: FrontmatterDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Seed an empty composition from copy; see [`Editor::import_initial_copy`]
    pub fn with_copy(mut self, copies: &[SourceCopy]) -> Self {
        self.import_initial_copy(copies);
        self
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.composition.blocks
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn active_block(&self) -> Option<&BlockId> {
        self.active.get()
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    pub fn detector(&self) -> &FrontmatterDetector {
        &self.detector
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn save_mode(&self) -> SaveMode {
        self.save_mode
    }

    pub fn autosave_state(&self) -> AutosaveState {
        self.autosave.state()
    }

    pub fn watch_autosave(&self) -> watch::Receiver<AutosaveState> {
        self.autosave.watch_state()
    }

    /// Preview feed; receives a fresh snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<Arc<Composition>> {
        self.preview.subscribe()
    }

    /// Apply one mutation. Returns whether the composition changed; only then
    /// are the preview and the autosave scheduler notified.
    pub fn apply(&mut self, mutation: Mutation) -> bool {
        log::trace!("apply {mutation:?}");
        let changed = match mutation {
            Mutation::InsertAfter { anchor, block } => {
                if ops::position(&self.composition.blocks, &block.id).is_some() {
                    log::warn!("refusing to insert duplicate block id {}", block.id);
                    return false;
                }
                let blocks = ops::insert_after(&self.composition.blocks, anchor.as_ref(), block);
                self.set_blocks(blocks)
            }
            Mutation::Remove { id } => {
                let blocks = ops::remove(&self.composition.blocks, &id);
                self.active.on_removed(&id);
                self.set_blocks(blocks)
            }
            Mutation::Update { id, patch } => {
                let blocks = ops::update(&self.composition.blocks, &id, &patch);
                self.set_blocks(blocks)
            }
            Mutation::Move { from, to } => {
                let blocks = ops::move_block(&self.composition.blocks, from, to);
                self.set_blocks(blocks)
            }
            Mutation::ConvertToFrontmatter { id } => {
                let blocks = frontmatter::convert_text_to_frontmatter(
                    &self.composition.blocks,
                    &id,
                    &self.detector,
                );
                self.set_blocks(blocks)
            }
            Mutation::ReplaceBlocks(mut blocks) => {
                ops::renumber(&mut blocks);
                if let Err(err) = ops::check_invariants(&blocks) {
                    log::warn!("rejecting block list: {err}");
                    return false;
                }
                self.set_blocks(blocks)
            }
            Mutation::SetName(name) => replace(&mut self.composition.name, name),
            Mutation::SetTemplate(template) => replace(&mut self.composition.template, template),
            Mutation::SetSelectedCopies(copies) => {
                replace(&mut self.composition.metadata.selected_copies, copies)
            }
            Mutation::SetStylesheet(stylesheet) => {
                replace(&mut self.composition.metadata.stylesheet_id, stylesheet)
            }
        };

        if changed {
            self.version += 1;
            self.publish();
            self.notify_autosave();
        }
        changed
    }

    /// Insert `block` below the active block and make it active
    pub fn add_block(&mut self, block: ContentBlock) -> BlockId {
        let id = block.id.clone();
        let anchor = self.active.get().cloned();
        if self.apply(Mutation::InsertAfter { anchor, block }) {
            self.active.set(id.clone());
        }
        id
    }

    pub fn add_text_block(&mut self) -> BlockId {
        self.add_block(ContentBlock::text(""))
    }

    pub fn add_heading_block(&mut self, level: u8) -> BlockId {
        self.add_block(ContentBlock::heading("", level))
    }

    pub fn add_divider_block(&mut self) -> BlockId {
        self.add_block(ContentBlock::divider())
    }

    pub fn add_video_block(&mut self) -> BlockId {
        self.add_block(ContentBlock::video(""))
    }

    pub fn add_list_block(&mut self) -> BlockId {
        self.add_block(ContentBlock::list(vec![String::new()], false))
    }

    pub fn add_html_block(&mut self) -> BlockId {
        self.add_block(ContentBlock::html(""))
    }

    pub fn add_button_block(&mut self) -> BlockId {
        self.add_block(ContentBlock::button("", ""))
    }

    /// Frontmatter block pre-filled with the configured template keys
    pub fn add_frontmatter_block(&mut self) -> BlockId {
        let block = frontmatter::template_block(&self.settings.frontmatter_template);
        self.add_block(block)
    }

    /// Insert several frontmatter blocks below the active block in one
    /// change. The last one becomes active.
    pub fn add_frontmatter_blocks(&mut self, records: Vec<Vec<FrontmatterField>>) -> Vec<BlockId> {
        if records.is_empty() {
            return Vec::new();
        }
        let mut anchor = self.active.get().cloned();
        let mut blocks = self.composition.blocks.clone();
        let mut ids = Vec::with_capacity(records.len());
        for fields in records {
            let block = ContentBlock::frontmatter(fields);
            ids.push(block.id.clone());
            blocks = ops::insert_after(&blocks, anchor.as_ref(), block);
            anchor = ids.last().cloned();
        }

        if self.apply(Mutation::ReplaceBlocks(blocks))
            && let Some(last) = ids.last()
        {
            self.active.set(last.clone());
        }
        ids
    }

    pub fn add_image_from_gallery(&mut self, url: &str, alt: &str, image: &GalleryImage) -> BlockId {
        self.add_block(ContentBlock::image(url, alt, Some(image.link())))
    }

    pub fn remove_block(&mut self, id: &BlockId) -> bool {
        self.apply(Mutation::Remove { id: id.clone() })
    }

    pub fn update_block(&mut self, id: &BlockId, patch: BlockPatch) -> bool {
        self.apply(Mutation::Update {
            id: id.clone(),
            patch,
        })
    }

    pub fn move_block(&mut self, from: usize, to: usize) -> bool {
        self.apply(Mutation::Move { from, to })
    }

    /// Make `id` the insertion anchor. Unknown ids are ignored.
    pub fn focus_block(&mut self, id: &BlockId) -> bool {
        if self.composition.block(id).is_none() {
            return false;
        }
        self.active.set(id.clone());
        true
    }

    pub fn on_drag_start(&mut self, id: &BlockId) -> bool {
        if self.composition.block(id).is_none() {
            log::debug!("drag start on unknown block {id}");
            return false;
        }
        self.drag.on_drag_start(id.clone())
    }

    pub fn on_drag_over(&mut self, index: usize) {
        self.drag.on_drag_over(index);
    }

    /// Finish a drag over the last hovered index. Returns whether blocks moved.
    pub fn on_drop(&mut self) -> bool {
        match self.drag.on_drop(&self.composition.blocks) {
            Some(Reorder { from, to }) => self.apply(Mutation::Move { from, to }),
            None => false,
        }
    }

    pub fn on_drag_end(&mut self) {
        self.drag.on_drag_end();
    }

    pub fn convert_text_to_frontmatter(&mut self, id: &BlockId) -> bool {
        self.apply(Mutation::ConvertToFrontmatter { id: id.clone() })
    }

    pub fn detect_frontmatter_in_text_block(&self, content: &str) -> bool {
        self.detector.detect(content)
    }

    /// Text blocks whose content looks like frontmatter
    pub fn frontmatter_candidates(&self) -> Vec<BlockId> {
        self.composition
            .blocks
            .iter()
            .filter(|block| block.kind() == crate::blocks::BlockKind::Text)
            .filter(|block| block.text_content().is_some_and(|c| self.detector.detect(c)))
            .map(|block| block.id.clone())
            .collect()
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        self.apply(Mutation::SetName(name.into()))
    }

    pub fn set_template(&mut self, template: Option<String>) -> bool {
        self.apply(Mutation::SetTemplate(template))
    }

    pub fn set_stylesheet(&mut self, stylesheet: Option<String>) -> bool {
        self.apply(Mutation::SetStylesheet(stylesheet))
    }

    /// Swap in another composition. Pending autosaves for the old one are
    /// cancelled; the previous composition is returned.
    pub fn switch_composition(&mut self, composition: Composition) -> Composition {
        let next = composition.hydrate();
        self.autosave.unload();
        self.copy_imported = !next.blocks.is_empty();
        self.pending_copy = None;
        self.active.clear();
        self.drag.on_drag_end();
        let previous = std::mem::replace(&mut self.composition, next);
        self.version += 1;
        self.publish();
        self.arm_autosave();
        previous
    }

    /// Stop autosaving and hand back the composition
    pub fn close(self) -> Composition {
        self.autosave.unload();
        log::debug!("closing editor at version {}", self.version);
        self.composition
    }

    fn set_blocks(&mut self, blocks: Vec<ContentBlock>) -> bool {
        if blocks == self.composition.blocks {
            return false;
        }
        self.composition.blocks = blocks;
        if let Some(active) = self.active.get()
            && self.composition.block(active).is_none()
        {
            self.active.clear();
        }
        true
    }

    fn publish(&self) {
        self.preview.send_replace(Arc::new(self.composition.clone()));
    }

    fn autosave_allowed(&self) -> bool {
        self.save_mode == SaveMode::Enabled && self.settings.autosave_enabled
    }

    fn arm_autosave(&self) {
        if let Some(id) = &self.composition.id
            && self.autosave_allowed()
        {
            self.autosave.load(id.clone());
        }
    }

    fn notify_autosave(&self) {
        if let Some(id) = &self.composition.id
            && self.autosave_allowed()
        {
            self.autosave.notify(id, self.composition.payload());
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

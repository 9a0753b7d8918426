//! The view state record and the store every mutation goes through.

use pdf_bridge::{Annotation, Bookmark, DocumentDescriptor, SearchHit, ViewMode};
use serde::Serialize;
use tokio::sync::watch;

use crate::ViewerConfig;

pub const MIN_ZOOM: u32 = 25;
pub const MAX_ZOOM: u32 = 500;
pub const DEFAULT_ZOOM: u32 = 100;
pub const ZOOM_STEP: u32 = 25;
pub const QUARTER_TURN: u32 = 90;
pub const DEFAULT_THEME: &str = "light";

/// Clamp a requested zoom percentage into `[MIN_ZOOM, MAX_ZOOM]`
pub fn clamp_zoom(requested: i64) -> u32 {
    requested.clamp(MIN_ZOOM as i64, MAX_ZOOM as i64) as u32
}

/// Bring any angle into `[0, 360)` and onto the nearest quarter turn
pub fn normalize_rotation(requested: i64) -> u32 {
    let degrees = requested.rem_euclid(360) as u32;
    ((degrees + QUARTER_TURN / 2) / QUARTER_TURN % 4) * QUARTER_TURN
}

/// Clamp a 1-based page number into `[1, total_pages]`
pub fn clamp_page(requested: i64, total_pages: u32) -> u32 {
    if total_pages == 0 {
        return 1;
    }
    requested.clamp(1, total_pages as i64) as u32
}

/// Everything the presentation layer needs to draw the viewer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub document: Option<DocumentDescriptor>,
    pub current_page: u32,
    pub total_pages: u32,
    pub zoom: u32,
    pub rotation: u32,
    pub view_mode: ViewMode,
    pub active_tool: Option<String>,
    pub annotations: Vec<Annotation>,
    pub bookmarks: Vec<Bookmark>,
    pub search_term: String,
    pub search_results: Vec<SearchHit>,
    pub selected_text: Option<String>,

    // Host-pushed presentation settings
    pub theme: String,
    pub dark_mode: bool,
    pub annotations_enabled: bool,

    // Load lifecycle
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            document: None,
            current_page: 1,
            total_pages: 0,
            zoom: DEFAULT_ZOOM,
            rotation: 0,
            view_mode: ViewMode::default(),
            active_tool: None,
            annotations: Vec::new(),
            bookmarks: Vec::new(),
            search_term: String::new(),
            search_results: Vec::new(),
            selected_text: None,
            theme: DEFAULT_THEME.to_string(),
            dark_mode: false,
            annotations_enabled: true,
            loading: false,
            error: None,
        }
    }
}

impl ViewState {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            zoom: clamp_zoom(config.default_zoom as i64),
            view_mode: config.default_view_mode,
            theme: config.default_theme.clone(),
            annotations_enabled: config.annotations_enabled,
            ..Self::default()
        }
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    /// Re-establish the range invariants after a transform
    fn normalized(mut self) -> Self {
        self.zoom = clamp_zoom(self.zoom as i64);
        self.rotation = normalize_rotation(self.rotation as i64);
        self.current_page = clamp_page(self.current_page as i64, self.total_pages);
        self
    }
}

/// Single owner of the [`ViewState`]. Readers get snapshots through [`ViewStore::subscribe`].
pub struct ViewStore {
    state: ViewState,
    tx: watch::Sender<ViewState>,
}

impl ViewStore {
    pub fn new(initial: ViewState) -> Self {
        let state = initial.normalized();
        let (tx, _rx) = watch::channel(state.clone());
        Self { state, tx }
    }

    pub fn get(&self) -> &ViewState {
        &self.state
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    /// Replace the state with `transform(old)` and notify subscribers if anything changed.
    /// Returns whether the state changed.
    pub fn mutate<F>(&mut self, transform: F) -> bool
    where
        F: FnOnce(ViewState) -> ViewState,
    {
        let old = std::mem::take(&mut self.state);
        self.state = transform(old).normalized();

        let next = &self.state;
        self.tx.send_if_modified(|published| {
            if published == next {
                false
            } else {
                *published = next.clone();
                true
            }
        })
    }

    /// In-place flavour of [`ViewStore::mutate`]
    pub fn update<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut ViewState),
    {
        self.mutate(|mut state| {
            edit(&mut state);
            state
        })
    }

    pub fn current_page(&self) -> u32 {
        self.state.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.state.total_pages
    }

    pub fn zoom(&self) -> u32 {
        self.state.zoom
    }

    pub fn rotation(&self) -> u32 {
        self.state.rotation
    }

    pub fn select_text(&mut self, text: Option<String>) -> bool {
        self.update(|s| s.selected_text = text.filter(|t| !t.is_empty()))
    }

    pub fn dismiss_error(&mut self) -> bool {
        self.update(|s| s.error = None)
    }
}

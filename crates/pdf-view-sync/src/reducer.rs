//! Applies host-originated commands to the view state.

use pdf_bridge::{DocumentDescriptor, HostMessage, ResultPatch, SettingsPatch, ViewMode};
use std::path::PathBuf;

use crate::ViewerConfig;
use crate::loader::LoadError;
use crate::state::{ViewState, ViewStore, clamp_page, clamp_zoom, normalize_rotation};

/// Identifies one document load so stale completions can be told apart
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTicket {
    pub generation: u64,
    pub path: PathBuf,
}

pub struct SyncReducer {
    default_zoom: u32,
    generation: u64,
}

impl SyncReducer {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            default_zoom: config.default_zoom,
            generation: 0,
        }
    }

    /// Apply a host command. Returns a ticket when a document needs loading.
    pub fn apply(&mut self, store: &mut ViewStore, message: &HostMessage) -> Option<LoadTicket> {
        match message {
            HostMessage::DocumentLoaded(doc) => Some(self.document_loaded(store, doc)),
            HostMessage::ThemeChanged { theme_id } => {
                match theme_id {
                    Some(theme) => {
                        store.update(|s| s.theme = theme.clone());
                    }
                    None => log::warn!("ThemeChanged without a theme id, ignoring"),
                }
                None
            }
            HostMessage::SettingsChanged(patch) => {
                self.settings_changed(store, patch);
                None
            }
            HostMessage::ToolResult(_) => {
                log::debug!("Tool results are resolved by the dispatcher, not the reducer");
                None
            }
        }
    }

    /// Replace the previous document's view wholesale. Presentation settings carry over.
    fn document_loaded(&mut self, store: &mut ViewStore, doc: &DocumentDescriptor) -> LoadTicket {
        self.generation += 1;
        log::info!(
            "Document loaded: {} ({} pages)",
            doc.file_path.display(),
            doc.total_pages
        );

        let zoom = clamp_zoom(self.default_zoom as i64);
        store.mutate(|prev| ViewState {
            document: Some(doc.clone()),
            current_page: 1,
            total_pages: doc.total_pages,
            zoom,
            rotation: 0,
            loading: true,
            error: None,
            ..Self::carry_settings(prev)
        });

        LoadTicket {
            generation: self.generation,
            path: doc.file_path.clone(),
        }
    }

    /// Shallow-merge the fields the host sent; absent or unparseable fields are left alone
    pub fn settings_changed(&self, store: &mut ViewStore, patch: &SettingsPatch) -> bool {
        let view_mode = parse_view_mode(patch.view_mode.as_deref());

        store.update(|s| {
            if let Some(zoom) = patch.zoom {
                s.zoom = clamp_zoom(zoom);
            }
            if let Some(rotation) = patch.rotation {
                s.rotation = normalize_rotation(rotation);
            }
            if let Some(mode) = view_mode {
                s.view_mode = mode;
            }
            if let Some(enabled) = patch.annotations_enabled {
                s.annotations_enabled = enabled;
            }
            if let Some(dark) = patch.dark_mode {
                s.dark_mode = dark;
            }
        })
    }

    /// Apply the view changes carried by a successful delegated tool
    pub fn apply_patch(&self, store: &mut ViewStore, patch: &ResultPatch) -> bool {
        let view_mode = parse_view_mode(patch.view_mode.as_deref());

        store.update(|s| {
            if let Some(zoom) = patch.zoom {
                s.zoom = clamp_zoom(zoom);
            }
            if let Some(rotation) = patch.rotation {
                s.rotation = normalize_rotation(rotation);
            }
            if let Some(mode) = view_mode {
                s.view_mode = mode;
            }
            if let Some(page) = patch.current_page {
                s.current_page = clamp_page(page, s.total_pages);
            }
            if let Some(results) = &patch.search_results {
                s.search_results = results
                    .iter()
                    .filter(|hit| hit.page >= 1 && hit.page <= s.total_pages)
                    .cloned()
                    .collect();
            }
        })
    }

    /// Record the loader's verdict. Completions from superseded loads are ignored.
    pub fn finish_load(
        &self,
        store: &mut ViewStore,
        generation: u64,
        result: &Result<(), LoadError>,
    ) -> bool {
        if generation != self.generation {
            log::debug!(
                "Ignoring load completion {} (current is {})",
                generation,
                self.generation
            );
            return false;
        }

        match result {
            Ok(()) => {
                store.update(|s| s.loading = false);
            }
            Err(e) => {
                log::error!("Failed to load document: {}", e);
                let zoom = clamp_zoom(self.default_zoom as i64);
                store.mutate(|prev| ViewState {
                    zoom,
                    error: Some(format!("PDF load error: {}", e)),
                    ..Self::carry_settings(prev)
                });
            }
        }
        true
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A blank view that keeps only what the host pushed through settings and theme
    fn carry_settings(prev: ViewState) -> ViewState {
        ViewState {
            view_mode: prev.view_mode,
            theme: prev.theme,
            dark_mode: prev.dark_mode,
            annotations_enabled: prev.annotations_enabled,
            ..ViewState::default()
        }
    }
}

fn parse_view_mode(raw: Option<&str>) -> Option<ViewMode> {
    match raw?.parse() {
        Ok(mode) => Some(mode),
        Err(e) => {
            log::warn!("Ignoring view mode from host: {}", e);
            None
        }
    }
}

//! Turns tool invocations into view mutations and outbound commands.

use chrono::Utc;
use pdf_bridge::{
    Annotation, AnnotationId, AnnotationKind, Bookmark, BookmarkId, Position, RequestId,
    ToolContext, ToolResponse, UiMessage,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::ViewerConfig;
use crate::catalog::Tool;
use crate::channel::Outbox;
use crate::state::{QUARTER_TURN, ViewState, ViewStore, clamp_page, clamp_zoom, normalize_rotation};

/// Arguments supplied with a tool invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolPayload(Map<String, Value>);

impl ToolPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anything other than a JSON object carries no arguments
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::Null => Self::default(),
            other => {
                log::warn!("Ignoring non-object tool payload: {}", other);
                Self::default()
            }
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn page(&self) -> Option<i64> {
        self.0.get("page").and_then(Value::as_i64)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn position(&self) -> Position {
        self.0
            .get("position")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// What an invocation did
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Applied locally; `changed` is false when the view was already there (e.g. zoom at max)
    Applied { changed: bool },
    AnnotationAdded(AnnotationId),
    BookmarkAdded(BookmarkId),
    /// Sent to the host; the view changes only when the reply arrives
    Delegated(RequestId),
    /// Nothing happened; the reason is user-facing
    Rejected(String),
}

/// A delegated call still waiting for its `ToolResult`
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub tool_id: String,
    pub issued_at: Instant,
}

pub struct ToolDispatcher {
    outbox: Outbox<UiMessage>,
    pending: HashMap<RequestId, PendingCall>,
    next_request: u64,
    next_annotation: u64,
    next_bookmark: u64,
    zoom_step: u32,
    default_zoom: u32,
    annotation_color: String,
    echo_local_tools: bool,
}

impl ToolDispatcher {
    pub fn new(config: &ViewerConfig, outbox: Outbox<UiMessage>) -> Self {
        Self {
            outbox,
            pending: HashMap::new(),
            next_request: 0,
            next_annotation: 0,
            next_bookmark: 0,
            zoom_step: config.zoom_step,
            default_zoom: config.default_zoom,
            annotation_color: config.annotation_color.clone(),
            echo_local_tools: config.echo_local_tools,
        }
    }

    pub fn invoke(
        &mut self,
        store: &mut ViewStore,
        tool_id: &str,
        payload: ToolPayload,
    ) -> Dispatch {
        let tool = Tool::parse(tool_id);
        log::debug!("Invoking {} ({:?})", tool.id(), tool.category());

        match tool {
            Tool::Delegated(id) => self.delegate(store.get(), &id, payload),
            Tool::Search => {
                let term = payload
                    .string("term")
                    .or_else(|| payload.string("query"))
                    .unwrap_or_default()
                    .to_string();
                let dispatch = self.delegate(store.get(), "search", payload);
                if let Dispatch::Delegated(_) = dispatch {
                    store.update(|s| {
                        s.search_term = term;
                        s.search_results.clear();
                        s.active_tool = Some("search".to_string());
                    });
                }
                dispatch
            }
            Tool::Annotate(kind) => self.annotate(store, kind, payload),
            Tool::Bookmark => self.bookmark(store, payload),
            local => {
                let changed = self.apply_local(store, &local, &payload);
                if self.echo_local_tools {
                    let context = Self::context(store.get(), local.id(), None, payload);
                    self.outbox.send(UiMessage::ToolInvoked(context));
                }
                Dispatch::Applied { changed }
            }
        }
    }

    /// Apply a view or navigation tool in a single mutation
    fn apply_local(&self, store: &mut ViewStore, tool: &Tool, payload: &ToolPayload) -> bool {
        let step = self.zoom_step as i64;
        let default_zoom = self.default_zoom as i64;
        let target_page = payload.page();
        if *tool == Tool::GoToPage && target_page.is_none() {
            log::warn!("go-to-page invoked without a page number");
        }

        store.update(|s| {
            match tool {
                Tool::ZoomIn => s.zoom = clamp_zoom(s.zoom as i64 + step),
                Tool::ZoomOut => s.zoom = clamp_zoom(s.zoom as i64 - step),
                Tool::ResetZoom => s.zoom = clamp_zoom(default_zoom),
                Tool::Rotate => s.rotation = normalize_rotation((s.rotation + QUARTER_TURN) as i64),
                Tool::Fit(mode) => s.view_mode = *mode,
                Tool::GoToPage => {
                    if let Some(page) = target_page {
                        s.current_page = clamp_page(page, s.total_pages);
                    }
                }
                Tool::NextPage => {
                    s.current_page = clamp_page(s.current_page as i64 + 1, s.total_pages)
                }
                Tool::PreviousPage => {
                    s.current_page = clamp_page(s.current_page as i64 - 1, s.total_pages)
                }
                Tool::FirstPage => s.current_page = 1,
                Tool::LastPage => s.current_page = clamp_page(s.total_pages as i64, s.total_pages),
                _ => {}
            }
            s.active_tool = Some(tool.id().to_string());
        })
    }

    fn annotate(
        &mut self,
        store: &mut ViewStore,
        kind: AnnotationKind,
        payload: ToolPayload,
    ) -> Dispatch {
        let state = store.get();
        if !state.has_document() {
            return Dispatch::Rejected("No document loaded".to_string());
        }
        if !state.annotations_enabled {
            return Dispatch::Rejected("Annotations are disabled".to_string());
        }

        self.next_annotation += 1;
        let annotation = Annotation {
            id: AnnotationId(self.next_annotation),
            kind,
            page: state.current_page,
            position: payload.position(),
            content: payload.string("content").unwrap_or_default().to_string(),
            color: payload
                .string("color")
                .unwrap_or(&self.annotation_color)
                .to_string(),
            created_at: Utc::now(),
        };
        let id = annotation.id;

        let appended = annotation.clone();
        store.update(|s| {
            s.annotations.push(appended);
            s.active_tool = Some(kind.as_str().to_string());
        });
        self.outbox.send(UiMessage::AnnotationAdded { annotation });
        Dispatch::AnnotationAdded(id)
    }

    fn bookmark(&mut self, store: &mut ViewStore, payload: ToolPayload) -> Dispatch {
        let state = store.get();
        if !state.has_document() {
            return Dispatch::Rejected("No document loaded".to_string());
        }

        self.next_bookmark += 1;
        let page = state.current_page;
        let bookmark = Bookmark {
            id: BookmarkId(self.next_bookmark),
            title: payload
                .string("title")
                .map(str::to_string)
                .unwrap_or_else(|| format!("Page {}", page)),
            page,
        };
        let id = bookmark.id;

        let appended = bookmark.clone();
        store.update(|s| {
            s.bookmarks.push(appended);
            s.active_tool = Some("bookmark".to_string());
        });
        self.outbox.send(UiMessage::BookmarkAdded { bookmark });
        Dispatch::BookmarkAdded(id)
    }

    fn delegate(&mut self, state: &ViewState, tool_id: &str, payload: ToolPayload) -> Dispatch {
        self.next_request += 1;
        let request_id = RequestId(self.next_request);
        let context = Self::context(state, tool_id, Some(request_id), payload);

        if !self.outbox.send(UiMessage::ToolInvoked(context)) {
            return Dispatch::Rejected(format!("Bridge not available for tool {}", tool_id));
        }

        self.pending.insert(
            request_id,
            PendingCall {
                tool_id: tool_id.to_string(),
                issued_at: Instant::now(),
            },
        );
        log::debug!("Delegated {} as {}", tool_id, request_id);
        Dispatch::Delegated(request_id)
    }

    /// Snapshot of the view that accompanies every `ToolInvoked`
    pub fn context(
        state: &ViewState,
        tool_id: &str,
        request_id: Option<RequestId>,
        payload: ToolPayload,
    ) -> ToolContext {
        ToolContext {
            tool_id: tool_id.to_string(),
            request_id,
            current_page: state.current_page,
            total_pages: state.total_pages,
            zoom: state.zoom,
            rotation: state.rotation,
            selected_text: state.selected_text.clone(),
            annotations: state.annotations.clone(),
            data: payload.into_map(),
        }
    }

    /// Claim the pending call a reply belongs to. Replies nobody is waiting for yield `None`.
    pub fn resolve(&mut self, response: &ToolResponse) -> Option<(RequestId, PendingCall)> {
        let request_id = response.request_id?;
        self.pending
            .remove(&request_id)
            .map(|call| (request_id, call))
    }

    /// Stop waiting for a call. A reply that arrives later is ignored.
    pub fn cancel(&mut self, request_id: RequestId) -> Option<PendingCall> {
        self.pending.remove(&request_id)
    }

    /// Drop calls that have waited at least `timeout`, oldest first
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<(RequestId, PendingCall)> {
        let mut expired: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|(_, call)| now.saturating_duration_since(call.issued_at) >= timeout)
            .map(|(id, _)| *id)
            .collect();
        expired.sort();

        expired
            .into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|call| (id, call)))
            .collect()
    }

    /// Forget every outstanding call. Returns how many were dropped.
    pub fn clear_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, request_id: RequestId) -> bool {
        self.pending.contains_key(&request_id)
    }
}

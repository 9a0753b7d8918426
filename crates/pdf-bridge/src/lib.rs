use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown view mode: {0}")]
    InvalidViewMode(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Commands sent from the host to the viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum HostMessage {
    DocumentLoaded(DocumentDescriptor),
    ThemeChanged {
        #[serde(default)]
        theme_id: Option<String>,
    },
    SettingsChanged(SettingsPatch),
    /// Reply to a delegated `ToolInvoked`
    ToolResult(ToolResponse),
}

/// Messages sent from the viewer to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum UiMessage {
    ToolInvoked(ToolContext),
    PageChanged { page_number: u32 },
    AnnotationAdded { annotation: Annotation },
    BookmarkAdded { bookmark: Bookmark },
}

/// Partial settings pushed by the host. Absent fields mean "no change".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }
}

/// Snapshot of the view sent along with every tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolContext {
    pub tool_id: String,
    /// Present only when the viewer waits for a `ToolResult`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    pub current_page: u32,
    pub total_pages: u32,
    pub zoom: u32,
    pub rotation: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Tool-specific arguments supplied by the caller
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

/// The host's answer to a delegated tool call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ToolResponse {
    pub fn ok(request_id: Option<RequestId>, result: ResultPatch) -> Self {
        Self {
            request_id,
            success: true,
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn failed(request_id: Option<RequestId>, error: impl Into<String>) -> Self {
        Self {
            request_id,
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// View fields a delegated tool may change on success
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResultPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HostMessage {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl UiMessage {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UiMessage::ToolInvoked(_) => "ToolInvoked",
            UiMessage::PageChanged { .. } => "PageChanged",
            UiMessage::AnnotationAdded { .. } => "AnnotationAdded",
            UiMessage::BookmarkAdded { .. } => "BookmarkAdded",
        }
    }
}

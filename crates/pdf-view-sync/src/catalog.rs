//! What each tool id means to the view. Labels and icons live with the presentation layer.

use pdf_bridge::{AnnotationKind, ViewMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCategory {
    View,
    Navigation,
    Annotate,
    Bookmark,
    Search,
    Edit,
    Security,
    Ai,
    /// Not in the catalog; forwarded to the host untouched
    External,
}

/// Tools the host implements. Anything unknown is delegated too.
pub const DELEGATED_TOOLS: &[(&str, ToolCategory)] = &[
    ("split", ToolCategory::Edit),
    ("merge", ToolCategory::Edit),
    ("add-page", ToolCategory::Edit),
    ("delete-page", ToolCategory::Edit),
    ("copy-page", ToolCategory::Edit),
    ("encrypt", ToolCategory::Security),
    ("decrypt", ToolCategory::Security),
    ("sign", ToolCategory::Security),
    ("redact", ToolCategory::Security),
    ("summarize", ToolCategory::Ai),
    ("extract", ToolCategory::Ai),
    ("translate", ToolCategory::Ai),
    ("analyze", ToolCategory::Ai),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    ZoomIn,
    ZoomOut,
    ResetZoom,
    Rotate,
    Fit(ViewMode),
    GoToPage,
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    Annotate(AnnotationKind),
    Bookmark,
    Search,
    Delegated(String),
}

impl Tool {
    pub fn parse(id: &str) -> Self {
        match id {
            "zoom-in" => Tool::ZoomIn,
            "zoom-out" => Tool::ZoomOut,
            "reset-zoom" => Tool::ResetZoom,
            "rotate" => Tool::Rotate,
            "fit-width" => Tool::Fit(ViewMode::FitWidth),
            "fit-page" => Tool::Fit(ViewMode::FitPage),
            "go-to-page" => Tool::GoToPage,
            "next-page" => Tool::NextPage,
            "previous-page" => Tool::PreviousPage,
            "first-page" => Tool::FirstPage,
            "last-page" => Tool::LastPage,
            "bookmark" => Tool::Bookmark,
            "search" => Tool::Search,
            other => match AnnotationKind::from_tool_id(other) {
                Some(kind) => Tool::Annotate(kind),
                None => Tool::Delegated(other.to_string()),
            },
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Tool::ZoomIn => "zoom-in",
            Tool::ZoomOut => "zoom-out",
            Tool::ResetZoom => "reset-zoom",
            Tool::Rotate => "rotate",
            Tool::Fit(ViewMode::FitPage) => "fit-page",
            // Single isn't reachable through `parse`
            Tool::Fit(_) => "fit-width",
            Tool::GoToPage => "go-to-page",
            Tool::NextPage => "next-page",
            Tool::PreviousPage => "previous-page",
            Tool::FirstPage => "first-page",
            Tool::LastPage => "last-page",
            Tool::Annotate(kind) => kind.as_str(),
            Tool::Bookmark => "bookmark",
            Tool::Search => "search",
            Tool::Delegated(id) => id,
        }
    }

    pub fn category(&self) -> ToolCategory {
        match self {
            Tool::ZoomIn | Tool::ZoomOut | Tool::ResetZoom | Tool::Rotate | Tool::Fit(_) => {
                ToolCategory::View
            }
            Tool::GoToPage
            | Tool::NextPage
            | Tool::PreviousPage
            | Tool::FirstPage
            | Tool::LastPage => ToolCategory::Navigation,
            Tool::Annotate(_) => ToolCategory::Annotate,
            Tool::Bookmark => ToolCategory::Bookmark,
            Tool::Search => ToolCategory::Search,
            Tool::Delegated(id) => DELEGATED_TOOLS
                .iter()
                .find(|(known, _)| known == id)
                .map(|(_, category)| *category)
                .unwrap_or(ToolCategory::External),
        }
    }

    /// Whether the tool waits for a host reply
    pub fn is_delegated(&self) -> bool {
        matches!(self, Tool::Delegated(_) | Tool::Search)
    }
}

pub mod catalog;
pub mod channel;
mod config;
mod dispatcher;
mod loader;
mod notify;
mod reducer;
mod session;
mod state;

pub use catalog::{Tool, ToolCategory};
pub use channel::{CommandChannel, HostChannel, Inbox, Outbox, UiChannel, connect};
pub use config::ViewerConfig;
pub use dispatcher::{Dispatch, PendingCall, ToolDispatcher, ToolPayload};
pub use loader::{AcceptingLoader, DocumentLoader, LoadError};
pub use notify::{LogNotifier, Notification, NotificationLog, Notifier, Severity};
pub use reducer::{LoadTicket, SyncReducer};
pub use session::{SessionEvent, ViewerHandle, ViewerSession, start};
pub use state::*;

// Re-export the wire types so callers need a single import
pub use pdf_bridge::{
    Annotation, AnnotationId, AnnotationKind, Bookmark, BookmarkId, DocumentDescriptor,
    HostMessage, Position, RequestId, ResultPatch, SearchHit, SettingsPatch, ToolContext,
    ToolResponse, UiMessage, ViewMode,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Protocol error: {0}")]
    Protocol(#[from] pdf_bridge::ProtocolError),
    #[error("A receive handler is already registered")]
    HandlerAlreadyRegistered,
    #[error("Viewer session has shut down")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, ViewError>;

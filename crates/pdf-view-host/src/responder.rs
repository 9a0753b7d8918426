//! The host's side of delegated tool calls.

use pdf_bridge::{HostMessage, ResultPatch, ToolContext, ToolResponse, UiMessage};
use std::collections::HashMap;

type Handler = fn(&ToolContext) -> ResultPatch;

fn zoom_in(context: &ToolContext) -> ResultPatch {
    ResultPatch {
        zoom: Some((context.zoom as i64 + 25).min(500)),
        ..ResultPatch::default()
    }
}

fn zoom_out(context: &ToolContext) -> ResultPatch {
    ResultPatch {
        zoom: Some((context.zoom as i64 - 25).max(25)),
        ..ResultPatch::default()
    }
}

fn rotate(context: &ToolContext) -> ResultPatch {
    ResultPatch {
        rotation: Some((context.rotation as i64 + 90) % 360),
        ..ResultPatch::default()
    }
}

fn message(text: &str) -> ResultPatch {
    ResultPatch {
        message: Some(text.to_string()),
        ..ResultPatch::default()
    }
}

/// Answers `ToolInvoked` requests the way the desktop host does
pub struct HostResponder {
    handlers: HashMap<&'static str, Handler>,
}

impl Default for HostResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl HostResponder {
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Handler> = HashMap::new();
        handlers.insert("zoom-in", zoom_in);
        handlers.insert("zoom-out", zoom_out);
        handlers.insert("rotate", rotate);
        handlers.insert("split", |_| message("Split queued"));
        handlers.insert("merge", |_| message("Merge queued"));
        handlers.insert("encrypt", |_| message("Encryption queued"));
        handlers.insert("decrypt", |_| message("Decryption queued"));
        handlers.insert("highlight", |_| message("Highlight added"));
        handlers.insert("text-note", |_| message("Text note added"));
        handlers.insert("summarize", |_| message("Summary requested"));
        handlers.insert("extract", |_| message("Text extraction requested"));
        Self { handlers }
    }

    /// Compute the reply for one invocation. Unknown tools still succeed.
    pub fn respond(&self, context: &ToolContext) -> ToolResponse {
        match self.handlers.get(context.tool_id.as_str()) {
            Some(handler) => ToolResponse::ok(context.request_id, handler(context)),
            None => ToolResponse {
                request_id: context.request_id,
                success: true,
                message: Some(format!("Tool {} executed", context.tool_id)),
                ..ToolResponse::default()
            },
        }
    }

    /// React to an outbound UI message. Only invocations that carry a request id get a reply.
    pub fn handle(&self, message: &UiMessage) -> Option<HostMessage> {
        let UiMessage::ToolInvoked(context) = message else {
            return None;
        };

        let response = self.respond(context);
        if context.request_id.is_none() {
            log::debug!(
                "{} was applied by the viewer; not replying ({:?})",
                context.tool_id,
                response.result
            );
            return None;
        }
        Some(HostMessage::ToolResult(response))
    }
}

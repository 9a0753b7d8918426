use pdf_view_sync::*;
use std::time::Duration;

fn loaded_store(total_pages: u32) -> ViewStore {
    ViewStore::new(ViewState {
        document: Some(DocumentDescriptor::new("/docs/report.pdf", total_pages)),
        total_pages,
        ..ViewState::default()
    })
}

fn dispatcher(config: &ViewerConfig) -> (ToolDispatcher, HostChannel) {
    let (ui, host) = connect::<UiMessage, HostMessage>();
    let (outbox, _inbox) = ui.split();
    (ToolDispatcher::new(config, outbox), host)
}

fn invoked(messages: &[UiMessage]) -> Vec<&ToolContext> {
    messages
        .iter()
        .filter_map(|message| match message {
            UiMessage::ToolInvoked(context) => Some(context),
            _ => None,
        })
        .collect()
}

#[test]
fn test_local_tools_then_delegated_split() {
    let mut store = loaded_store(10);
    let (mut tools, mut host) = dispatcher(&ViewerConfig::default());

    for _ in 0..3 {
        tools.invoke(&mut store, "zoom-in", ToolPayload::new());
    }
    tools.invoke(&mut store, "rotate", ToolPayload::new());
    tools.invoke(&mut store, "go-to-page", ToolPayload::new().with("page", 15));

    assert_eq!(store.zoom(), 175);
    assert_eq!(store.rotation(), 90);
    assert_eq!(store.current_page(), 10);

    let before = store.snapshot();
    let dispatch = tools.invoke(&mut store, "split", ToolPayload::new());
    let request_id = match dispatch {
        Dispatch::Delegated(request_id) => request_id,
        other => panic!("Expected split to be delegated, got {:?}", other),
    };
    assert_eq!(store.snapshot(), before);
    assert!(tools.is_pending(request_id));

    let sent = host.inbox_mut().drain();
    let contexts = invoked(&sent);
    let split = contexts.last().unwrap();
    assert_eq!(split.tool_id, "split");
    assert_eq!(split.request_id, Some(request_id));
    assert_eq!(split.current_page, 10);
    assert_eq!(split.total_pages, 10);
    assert_eq!(split.zoom, 175);
    assert_eq!(split.rotation, 90);
}

#[test]
fn test_local_tools_are_echoed_without_request_id() {
    let mut store = loaded_store(4);
    let (mut tools, mut host) = dispatcher(&ViewerConfig::default());

    let dispatch = tools.invoke(&mut store, "zoom-in", ToolPayload::new());
    assert_eq!(dispatch, Dispatch::Applied { changed: true });
    assert_eq!(store.get().active_tool.as_deref(), Some("zoom-in"));

    let sent = host.inbox_mut().drain();
    let contexts = invoked(&sent);
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].tool_id, "zoom-in");
    assert_eq!(contexts[0].request_id, None);
    assert_eq!(contexts[0].zoom, 125);
    assert_eq!(tools.pending_count(), 0);
}

#[test]
fn test_echo_can_be_disabled() {
    let config = ViewerConfig {
        echo_local_tools: false,
        ..ViewerConfig::default()
    };
    let mut store = loaded_store(4);
    let (mut tools, mut host) = dispatcher(&config);

    tools.invoke(&mut store, "rotate", ToolPayload::new());
    assert!(host.inbox_mut().drain().is_empty());
}

#[test]
fn test_zoom_stops_at_bounds() {
    let mut store = loaded_store(1);
    let (mut tools, _host) = dispatcher(&ViewerConfig::default());

    for _ in 0..30 {
        tools.invoke(&mut store, "zoom-in", ToolPayload::new());
    }
    assert_eq!(store.zoom(), MAX_ZOOM);

    // Only the active tool changes once zoom is pinned
    let dispatch = tools.invoke(&mut store, "zoom-in", ToolPayload::new());
    assert_eq!(dispatch, Dispatch::Applied { changed: false });

    for _ in 0..30 {
        tools.invoke(&mut store, "zoom-out", ToolPayload::new());
    }
    assert_eq!(store.zoom(), MIN_ZOOM);

    tools.invoke(&mut store, "reset-zoom", ToolPayload::new());
    assert_eq!(store.zoom(), DEFAULT_ZOOM);
}

#[test]
fn test_rotate_four_times_returns_to_zero() {
    let mut store = loaded_store(1);
    let (mut tools, _host) = dispatcher(&ViewerConfig::default());

    let mut seen = Vec::new();
    for _ in 0..4 {
        tools.invoke(&mut store, "rotate", ToolPayload::new());
        seen.push(store.rotation());
    }
    assert_eq!(seen, vec![90, 180, 270, 0]);
}

#[test]
fn test_navigation_tools() {
    let mut store = loaded_store(5);
    let (mut tools, _host) = dispatcher(&ViewerConfig::default());

    tools.invoke(&mut store, "previous-page", ToolPayload::new());
    assert_eq!(store.current_page(), 1);

    tools.invoke(&mut store, "next-page", ToolPayload::new());
    assert_eq!(store.current_page(), 2);

    tools.invoke(&mut store, "last-page", ToolPayload::new());
    assert_eq!(store.current_page(), 5);

    tools.invoke(&mut store, "next-page", ToolPayload::new());
    assert_eq!(store.current_page(), 5);

    tools.invoke(&mut store, "go-to-page", ToolPayload::new().with("page", -4));
    assert_eq!(store.current_page(), 1);

    tools.invoke(&mut store, "go-to-page", ToolPayload::new().with("page", 3));
    tools.invoke(&mut store, "first-page", ToolPayload::new());
    assert_eq!(store.current_page(), 1);
}

#[test]
fn test_fit_tools_set_view_mode() {
    let mut store = loaded_store(2);
    let (mut tools, _host) = dispatcher(&ViewerConfig::default());

    tools.invoke(&mut store, "fit-width", ToolPayload::new());
    assert_eq!(store.get().view_mode, ViewMode::FitWidth);
    tools.invoke(&mut store, "fit-page", ToolPayload::new());
    assert_eq!(store.get().view_mode, ViewMode::FitPage);
}

#[test]
fn test_each_annotation_is_appended_and_announced() {
    let mut store = loaded_store(3);
    let (mut tools, mut host) = dispatcher(&ViewerConfig::default());

    tools.invoke(&mut store, "go-to-page", ToolPayload::new().with("page", 2));
    let payload = ToolPayload::new()
        .with("content", "check this")
        .with("position", serde_json::json!({ "x": 10.0, "y": 20.0 }));
    let first = tools.invoke(&mut store, "sticky-note", payload);
    let second = tools.invoke(&mut store, "highlight", ToolPayload::new());

    assert!(matches!(first, Dispatch::AnnotationAdded(_)));
    assert!(matches!(second, Dispatch::AnnotationAdded(_)));

    let annotations = &store.get().annotations;
    assert_eq!(annotations.len(), 2);
    assert_eq!(annotations[0].kind, AnnotationKind::StickyNote);
    assert_eq!(annotations[0].page, 2);
    assert_eq!(annotations[0].content, "check this");
    assert_eq!(annotations[0].position, Position { x: 10.0, y: 20.0 });
    assert_eq!(annotations[0].color, "#ffff00");
    assert_ne!(annotations[0].id, annotations[1].id);

    let announced: Vec<Annotation> = host
        .inbox_mut()
        .drain()
        .into_iter()
        .filter_map(|message| match message {
            UiMessage::AnnotationAdded { annotation } => Some(annotation),
            _ => None,
        })
        .collect();
    assert_eq!(&announced, annotations);
}

#[test]
fn test_annotations_need_a_document() {
    let mut store = ViewStore::new(ViewState::default());
    let (mut tools, mut host) = dispatcher(&ViewerConfig::default());

    let dispatch = tools.invoke(&mut store, "highlight", ToolPayload::new());
    assert!(matches!(dispatch, Dispatch::Rejected(_)));
    assert!(store.get().annotations.is_empty());
    assert!(host.inbox_mut().drain().is_empty());
}

#[test]
fn test_annotations_respect_host_setting() {
    let mut store = loaded_store(3);
    store.update(|s| s.annotations_enabled = false);
    let (mut tools, _host) = dispatcher(&ViewerConfig::default());

    let dispatch = tools.invoke(&mut store, "draw", ToolPayload::new());
    assert_eq!(
        dispatch,
        Dispatch::Rejected("Annotations are disabled".to_string())
    );
}

#[test]
fn test_bookmark_defaults_title_to_page() {
    let mut store = loaded_store(8);
    let (mut tools, mut host) = dispatcher(&ViewerConfig::default());

    tools.invoke(&mut store, "go-to-page", ToolPayload::new().with("page", 6));
    tools.invoke(&mut store, "bookmark", ToolPayload::new());
    tools.invoke(&mut store, "bookmark", ToolPayload::new().with("title", "Appendix"));

    let bookmarks = &store.get().bookmarks;
    assert_eq!(bookmarks.len(), 2);
    assert_eq!(bookmarks[0].title, "Page 6");
    assert_eq!(bookmarks[0].page, 6);
    assert_eq!(bookmarks[1].title, "Appendix");

    let announced = host
        .inbox_mut()
        .drain()
        .into_iter()
        .filter(|message| message.kind() == "BookmarkAdded")
        .count();
    assert_eq!(announced, 2);
}

#[test]
fn test_search_records_term_and_delegates() {
    let mut store = loaded_store(8);
    let (mut tools, mut host) = dispatcher(&ViewerConfig::default());

    let dispatch = tools.invoke(&mut store, "search", ToolPayload::new().with("term", "revenue"));
    assert!(matches!(dispatch, Dispatch::Delegated(_)));
    assert_eq!(store.get().search_term, "revenue");
    assert_eq!(store.get().active_tool.as_deref(), Some("search"));

    let sent = host.inbox_mut().drain();
    let contexts = invoked(&sent);
    assert_eq!(contexts[0].data.get("term"), Some(&serde_json::json!("revenue")));
}

#[test]
fn test_selected_text_travels_with_context() {
    let mut store = loaded_store(2);
    store.select_text(Some("quarterly totals".to_string()));
    let (mut tools, mut host) = dispatcher(&ViewerConfig::default());

    tools.invoke(&mut store, "summarize", ToolPayload::new());
    let sent = host.inbox_mut().drain();
    assert_eq!(
        invoked(&sent)[0].selected_text.as_deref(),
        Some("quarterly totals")
    );
}

#[test]
fn test_delegation_without_bridge_is_rejected() {
    let mut store = loaded_store(2);
    let mut tools = ToolDispatcher::new(&ViewerConfig::default(), Outbox::detached());

    let dispatch = tools.invoke(&mut store, "encrypt", ToolPayload::new());
    assert!(matches!(dispatch, Dispatch::Rejected(_)));
    assert_eq!(tools.pending_count(), 0);

    // A search that can't reach the host leaves the previous results alone
    store.update(|s| {
        s.search_term = "revenue".to_string();
        s.search_results = vec![SearchHit {
            page: 2,
            snippet: "revenue by region".to_string(),
        }];
    });
    let before = store.get().clone();
    let dispatch = tools.invoke(&mut store, "search", ToolPayload::new().with("term", "x"));
    assert!(matches!(dispatch, Dispatch::Rejected(_)));
    assert_eq!(store.get(), &before);
    assert_eq!(tools.pending_count(), 0);

    // Local tools still work with nobody listening
    tools.invoke(&mut store, "zoom-in", ToolPayload::new());
    assert_eq!(store.zoom(), 125);
}

#[test]
fn test_clear_pending_forgets_outstanding_calls() {
    let mut store = loaded_store(4);
    let (mut tools, _host) = dispatcher(&ViewerConfig::default());

    tools.invoke(&mut store, "merge", ToolPayload::new());
    let Dispatch::Delegated(request_id) = tools.invoke(&mut store, "split", ToolPayload::new())
    else {
        panic!("split should be delegated");
    };

    assert_eq!(tools.clear_pending(), 2);
    assert_eq!(tools.pending_count(), 0);
    let reply = ToolResponse::ok(Some(request_id), ResultPatch::default());
    assert!(tools.resolve(&reply).is_none());
}

#[test]
fn test_resolve_claims_each_call_once() {
    let mut store = loaded_store(2);
    let (mut tools, _host) = dispatcher(&ViewerConfig::default());

    let Dispatch::Delegated(request_id) = tools.invoke(&mut store, "merge", ToolPayload::new())
    else {
        panic!("merge should be delegated");
    };

    let reply = ToolResponse::ok(Some(request_id), ResultPatch::default());
    let (resolved, call) = tools.resolve(&reply).unwrap();
    assert_eq!(resolved, request_id);
    assert_eq!(call.tool_id, "merge");

    assert!(tools.resolve(&reply).is_none());
    assert!(tools.resolve(&ToolResponse::ok(None, ResultPatch::default())).is_none());
    assert!(
        tools
            .resolve(&ToolResponse::failed(Some(RequestId(999)), "nope"))
            .is_none()
    );
}

#[tokio::test(start_paused = true)]
async fn test_expire_drops_only_overdue_calls() {
    let mut store = loaded_store(2);
    let (mut tools, _host) = dispatcher(&ViewerConfig::default());

    tools.invoke(&mut store, "split", ToolPayload::new());
    tokio::time::advance(Duration::from_secs(5)).await;
    tools.invoke(&mut store, "merge", ToolPayload::new());

    let expired = tools.expire(tokio::time::Instant::now(), Duration::from_secs(3));
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].1.tool_id, "split");
    assert_eq!(tools.pending_count(), 1);
}

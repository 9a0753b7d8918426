//! Property tests for the view state range invariants.

use pdf_view_sync::*;
use proptest::prelude::*;

fn tool_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("zoom-in"),
        Just("zoom-out"),
        Just("reset-zoom"),
        Just("rotate"),
        Just("next-page"),
        Just("previous-page"),
        Just("first-page"),
        Just("last-page"),
        Just("fit-width"),
    ]
}

fn loaded_store(total_pages: u32) -> ViewStore {
    ViewStore::new(ViewState {
        document: Some(DocumentDescriptor::new("/tmp/prop.pdf", total_pages)),
        total_pages,
        ..ViewState::default()
    })
}

fn assert_in_range(state: &ViewState) -> std::result::Result<(), TestCaseError> {
    prop_assert!((MIN_ZOOM..=MAX_ZOOM).contains(&state.zoom));
    prop_assert!([0, 90, 180, 270].contains(&state.rotation));
    prop_assert!(state.current_page >= 1);
    if state.total_pages > 0 {
        prop_assert!(state.current_page <= state.total_pages);
    }
    Ok(())
}

proptest! {
    #[test]
    fn tool_sequences_keep_state_in_range(
        pages in 1u32..50,
        tools in prop::collection::vec(tool_strategy(), 0..64),
    ) {
        let mut store = loaded_store(pages);
        let mut dispatcher = ToolDispatcher::new(&ViewerConfig::default(), Outbox::detached());
        for tool in tools {
            dispatcher.invoke(&mut store, tool, ToolPayload::new());
            assert_in_range(store.get())?;
        }
    }

    #[test]
    fn zoom_in_then_out_returns_when_unclamped(steps in 0usize..4) {
        let mut store = loaded_store(1);
        let mut dispatcher = ToolDispatcher::new(&ViewerConfig::default(), Outbox::detached());
        for _ in 0..steps {
            dispatcher.invoke(&mut store, "zoom-in", ToolPayload::new());
        }
        for _ in 0..steps {
            dispatcher.invoke(&mut store, "zoom-out", ToolPayload::new());
        }
        prop_assert_eq!(store.zoom(), DEFAULT_ZOOM);
    }

    #[test]
    fn four_rotations_are_identity(start in prop::sample::select(vec![0i64, 90, 180, 270])) {
        let mut store = loaded_store(1);
        store.update(|s| s.rotation = start as u32);
        let mut dispatcher = ToolDispatcher::new(&ViewerConfig::default(), Outbox::detached());
        for _ in 0..4 {
            dispatcher.invoke(&mut store, "rotate", ToolPayload::new());
        }
        prop_assert_eq!(store.rotation() as i64, start);
    }

    #[test]
    fn go_to_page_clamps(pages in 1u32..200, requested in any::<i64>()) {
        let mut store = loaded_store(pages);
        let mut dispatcher = ToolDispatcher::new(&ViewerConfig::default(), Outbox::detached());
        dispatcher.invoke(&mut store, "go-to-page", ToolPayload::new().with("page", requested));
        let expected = requested.clamp(1, pages as i64) as u32;
        prop_assert_eq!(store.current_page(), expected);
    }

    #[test]
    fn host_settings_never_escape_range(
        zoom in proptest::option::of(any::<i64>()),
        rotation in proptest::option::of(any::<i64>()),
    ) {
        let config = ViewerConfig::default();
        let reducer = SyncReducer::new(&config);
        let mut store = loaded_store(5);
        reducer.settings_changed(&mut store, &SettingsPatch {
            zoom,
            rotation,
            ..SettingsPatch::default()
        });
        assert_in_range(store.get())?;
        if let Some(zoom) = zoom {
            prop_assert_eq!(store.zoom(), clamp_zoom(zoom));
        }
    }

    #[test]
    fn rotation_normalization_is_idempotent(angle in any::<i64>()) {
        let once = normalize_rotation(angle);
        prop_assert_eq!(normalize_rotation(once as i64), once);
        prop_assert_eq!(once % QUARTER_TURN, 0);
    }
}

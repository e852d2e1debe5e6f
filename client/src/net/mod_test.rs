use super::test_helpers::MemoryStore;
use super::*;
use frames::model::CollaborationMode;

#[test]
fn ws_url_maps_http_schemes() {
    assert_eq!(ws_url("http://127.0.0.1:3000").expect("http"), "ws://127.0.0.1:3000/api/ws");
    assert_eq!(ws_url("https://sketch.example/").expect("https"), "wss://sketch.example/api/ws");
}

#[test]
fn ws_url_rejects_other_schemes() {
    assert!(matches!(ws_url("ftp://nope"), Err(SyncError::InvalidBaseUrl(_))));
}

#[tokio::test]
async fn load_or_create_creates_missing_board() {
    let store = MemoryStore::default();

    let board = load_or_create(&store, "fresh", Some("Fresh")).await.expect("created");

    assert_eq!(board.slug, "fresh");
    assert_eq!(board.title, "Fresh");
    assert_eq!(store.calls(), ["get_board:fresh", "create_board:fresh"]);
}

#[tokio::test]
async fn load_or_create_returns_existing_board() {
    let store = MemoryStore::with_board(Board {
        slug: "old".into(),
        title: "Old".into(),
        strokes: Vec::new(),
        is_layer_locked: true,
        collaboration_mode: CollaborationMode::Open,
        collaborator_ids: Vec::new(),
    });

    let board = load_or_create(&store, "old", None).await.expect("loaded");

    assert!(board.is_layer_locked);
    assert_eq!(store.calls(), ["get_board:old"]);
}

#[tokio::test]
async fn load_or_create_surfaces_transport_errors() {
    let store = MemoryStore::default();
    store.fail();

    let err = load_or_create(&store, "any", None).await.expect_err("should fail");

    assert!(matches!(err, SyncError::Status { status: 503, .. }));
}

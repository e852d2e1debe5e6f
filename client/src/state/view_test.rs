use super::*;
use std::collections::BTreeSet;

fn stroke(id: &str) -> Stroke {
    Stroke {
        id: id.to_owned(),
        tool: Tool::Draw,
        color: "#111111".to_owned(),
        size: 2.0,
        points: vec![Point::new(0.0, 0.0)],
        author_id: "me".to_owned(),
    }
}

fn board(strokes: Vec<Stroke>, locked: bool) -> Board {
    Board {
        slug: "b1".into(),
        title: "Sketches".into(),
        strokes,
        is_layer_locked: locked,
        collaboration_mode: CollaborationMode::Open,
        collaborator_ids: Vec::new(),
    }
}

fn ids(view: &ClientView) -> Vec<&str> {
    view.strokes().iter().map(|s| s.id.as_str()).collect()
}

// =============================================================================
// STROKES
// =============================================================================

#[test]
fn local_stroke_grows_in_place_until_finished() {
    let mut view = ClientView::default();

    assert!(view.apply(Action::BeginStroke(stroke("s1"))).is_none());
    view.apply(Action::ExtendStroke(Point::new(1.0, 1.0)));
    view.apply(Action::ExtendStroke(Point::new(2.0, 2.0)));
    let finished = view.apply(Action::FinishStroke).expect("stroke finalized");

    assert_eq!(finished.points.len(), 3);
    assert_eq!(view.strokes().len(), 1);
    assert!(view.drawing().is_none());
}

#[test]
fn remote_stroke_during_gesture_is_not_extended() {
    let mut view = ClientView::default();
    view.apply(Action::BeginStroke(stroke("local")));

    view.apply(Action::AddStroke(stroke("remote")));
    view.apply(Action::ExtendStroke(Point::new(5.0, 5.0)));

    assert_eq!(ids(&view), ["local", "remote"]);
    assert_eq!(view.strokes()[0].points.len(), 2);
    assert_eq!(view.strokes()[1].points.len(), 1);
}

#[test]
fn duplicate_stroke_id_is_ignored() {
    let mut view = ClientView::default();
    view.apply(Action::AddStroke(stroke("s1")));
    view.apply(Action::AddStroke(stroke("s1")));

    assert_eq!(view.strokes().len(), 1);
}

#[test]
fn last_stroke_tracks_only_finalized_local_strokes() {
    let mut view = ClientView::default();
    view.apply(Action::Hydrate(board(vec![stroke("old")], false)));
    view.apply(Action::AddStroke(stroke("remote")));
    assert_eq!(view.last_stroke(), None);

    view.apply(Action::BeginStroke(stroke("s1")));
    assert_eq!(view.last_stroke(), None);
    view.apply(Action::FinishStroke);
    assert_eq!(view.last_stroke(), Some("s1"));

    view.apply(Action::BeginStroke(stroke("s2")));
    view.apply(Action::SetLayerLock(true));
    assert_eq!(view.last_stroke(), Some("s2"));
}

#[test]
fn finish_without_gesture_is_noop() {
    let mut view = ClientView::default();
    assert!(view.apply(Action::FinishStroke).is_none());
}

#[test]
fn clear_drops_in_progress_gesture() {
    let mut view = ClientView::default();
    view.apply(Action::AddStroke(stroke("old")));
    view.apply(Action::BeginStroke(stroke("mine")));

    view.apply(Action::Clear);
    view.apply(Action::ExtendStroke(Point::new(3.0, 3.0)));

    assert!(view.strokes().is_empty());
    assert!(view.drawing().is_none());
    assert!(view.apply(Action::FinishStroke).is_none());
}

// =============================================================================
// SETTINGS
// =============================================================================

#[test]
fn lock_mid_gesture_finalizes_stroke() {
    let mut view = ClientView::default();
    view.apply(Action::BeginStroke(stroke("s1")));

    let finished = view.apply(Action::SetLayerLock(true));

    assert_eq!(finished.map(|s| s.id), Some("s1".to_owned()));
    assert!(view.is_layer_locked());
    assert!(view.drawing().is_none());
    assert_eq!(view.strokes().len(), 1);
}

#[test]
fn unlock_never_finalizes() {
    let mut view = ClientView::default();
    view.apply(Action::BeginStroke(stroke("s1")));

    assert!(view.apply(Action::SetLayerLock(false)).is_none());
    assert_eq!(view.drawing(), Some("s1"));
}

#[test]
fn mode_overwrites_last_write_wins() {
    let mut view = ClientView::default();
    view.apply(Action::SetMode(CollaborationMode::Open));
    view.apply(Action::SetMode(CollaborationMode::ViewOnly));

    assert_eq!(view.settings().collaboration_mode, CollaborationMode::ViewOnly);
}

// =============================================================================
// HYDRATION
// =============================================================================

#[test]
fn hydrate_prepends_unseen_persisted_strokes() {
    let mut view = ClientView::default();
    view.apply(Action::AddStroke(stroke("relayed")));

    view.apply(Action::Hydrate(board(vec![stroke("p1"), stroke("relayed"), stroke("p2")], false)));

    assert_eq!(ids(&view), ["p1", "p2", "relayed"]);
    assert_eq!(view.title(), Some("Sketches"));
    assert_eq!(view.settings().collaboration_mode, CollaborationMode::Open);
}

#[test]
fn hydrate_with_lock_finalizes_gesture() {
    let mut view = ClientView::default();
    view.apply(Action::BeginStroke(stroke("mine")));

    let finished = view.apply(Action::Hydrate(board(Vec::new(), true)));

    assert_eq!(finished.map(|s| s.id), Some("mine".to_owned()));
    assert!(view.is_layer_locked());
}

// =============================================================================
// SESSION
// =============================================================================

#[test]
fn session_facts_are_recorded() {
    let mut view = ClientView::default();
    let conn = Uuid::new_v4();

    view.apply(Action::Connected(conn));
    view.apply(Action::OnlineCount(4));

    assert_eq!(view.connection_id(), Some(conn));
    assert_eq!(view.online_count(), 4);
}

#[test]
fn roster_actions_route_to_roster() {
    let mut view = ClientView::default();
    let presence = Presence {
        identity_id: "u1".into(),
        name: "Ann".into(),
        color: "#3b82f6".into(),
        cursor: Cursor::default(),
        connections: BTreeSet::new(),
    };

    view.apply(Action::Snapshot(vec![presence.clone(), presence]));
    view.apply(Action::MoveCursor { identity_id: "u1".into(), cursor: Cursor { x: 2.0, y: 3.0 } });

    assert_eq!(view.users().len(), 1);
    assert_eq!(view.users().get("u1").map(|u| u.cursor), Some(Cursor { x: 2.0, y: 3.0 }));

    view.apply(Action::Left("u1".into()));
    assert!(view.users().is_empty());
}

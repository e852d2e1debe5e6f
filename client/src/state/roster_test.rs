use super::*;
use std::collections::BTreeSet;
use uuid::Uuid;

fn presence(id: &str, name: &str, x: f64) -> Presence {
    Presence {
        identity_id: id.to_owned(),
        name: name.to_owned(),
        color: "#3b82f6".to_owned(),
        cursor: Cursor { x, y: 0.0 },
        connections: BTreeSet::from([Uuid::new_v4()]),
    }
}

fn user(id: Uuid, name: &str) -> User {
    User { id, name: name.to_owned(), email: format!("{name}@example.com"), color: "#ef4444".to_owned() }
}

// =============================================================================
// DEDUPLICATION
// =============================================================================

#[test]
fn snapshot_collapses_duplicate_identities_keeping_latest() {
    let mut roster = Roster::default();

    roster.apply_snapshot(&[presence("u1", "Ann", 1.0), presence("u2", "Bo", 0.0), presence("u1", "Ann B", 9.0)]);

    assert_eq!(roster.len(), 2);
    let ann = roster.get("u1").expect("u1 listed");
    assert_eq!(ann.name, "Ann B");
    assert!((ann.cursor.x - 9.0).abs() < f64::EPSILON);
}

#[test]
fn join_for_known_identity_merges_fields() {
    let mut roster = Roster::default();
    roster.apply_snapshot(&[presence("u1", "Ann", 0.0)]);

    roster.apply_joined(&presence("u1", "Annie", 3.0));

    assert_eq!(roster.len(), 1);
    assert_eq!(roster.get("u1").map(|u| u.name.as_str()), Some("Annie"));
}

#[test]
fn collaborator_and_presence_for_same_identity_share_one_entry() {
    let id = Uuid::new_v4();
    let mut roster = Roster::default();

    roster.merge_collaborators(&[user(id, "carol")]);
    roster.apply_joined(&presence(&id.to_string(), "Carol", 0.0));

    assert_eq!(roster.len(), 1);
    let carol = roster.get(&id.to_string()).expect("listed");
    assert!(carol.online);
    assert!(carol.collaborator);
    assert_eq!(carol.name, "Carol");
}

// =============================================================================
// DEPARTURES
// =============================================================================

#[test]
fn departed_stranger_is_removed() {
    let mut roster = Roster::default();
    roster.apply_joined(&presence("u1", "Ann", 0.0));

    roster.apply_left("u1");

    assert!(roster.is_empty());
}

#[test]
fn departed_collaborator_stays_listed_offline() {
    let id = Uuid::new_v4();
    let mut roster = Roster::default();
    roster.merge_collaborators(&[user(id, "dan")]);
    roster.apply_joined(&presence(&id.to_string(), "Dan", 0.0));

    roster.apply_left(&id.to_string());

    let dan = roster.get(&id.to_string()).expect("still listed");
    assert!(!dan.online);
    assert!(dan.collaborator);
}

#[test]
fn snapshot_drops_strangers_missing_from_it() {
    let mut roster = Roster::default();
    roster.set_local(&Identity { id: "me".into(), name: "Me".into(), color: "#000000".into() });
    roster.apply_joined(&presence("u1", "Ann", 0.0));

    roster.apply_snapshot(&[presence("me", "Me", 0.0)]);

    assert!(roster.get("u1").is_none());
    assert!(roster.get("me").is_some_and(|me| me.local && me.online));
}

#[test]
fn leave_for_unknown_identity_is_ignored() {
    let mut roster = Roster::default();
    roster.apply_joined(&presence("u1", "Ann", 0.0));

    roster.apply_left("ghost");

    assert_eq!(roster.len(), 1);
}

// =============================================================================
// CURSORS
// =============================================================================

#[test]
fn cursor_for_unknown_identity_is_ignored() {
    let mut roster = Roster::default();

    assert!(!roster.apply_cursor("ghost", Cursor { x: 1.0, y: 1.0 }));
    assert!(roster.is_empty());
}

#[test]
fn cursor_updates_known_identity() {
    let mut roster = Roster::default();
    roster.apply_joined(&presence("u1", "Ann", 0.0));

    assert!(roster.apply_cursor("u1", Cursor { x: 5.0, y: 6.0 }));
    assert_eq!(roster.get("u1").map(|u| u.cursor), Some(Cursor { x: 5.0, y: 6.0 }));
    assert_eq!(roster.online(), 1);
}

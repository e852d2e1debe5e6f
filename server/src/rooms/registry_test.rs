use std::collections::BTreeSet;

use super::*;

fn identity(id: &str) -> Identity {
    Identity { id: id.to_owned(), name: format!("name-{id}"), color: "#123456".to_owned() }
}

fn outbox() -> Outbox {
    mpsc::channel(8).0
}

#[test]
fn first_join_creates_presence_at_origin() {
    let mut room = Room::new("r1");
    let conn = Uuid::new_v4();

    let outcome = room.join(conn, &identity("alice"), outbox());

    assert_eq!(outcome.kind, JoinKind::NewIdentity);
    assert_eq!(outcome.presence.cursor, Cursor::default());
    assert_eq!(outcome.presence.connections.len(), 1);
    assert_eq!(outcome.roster.len(), 1);
    assert!(outcome.departed.is_none());
    assert_eq!(room.identity_of(conn), Some("alice"));
}

#[test]
fn second_tab_rejoins_and_refreshes_profile() {
    let mut room = Room::new("r1");
    let c1 = Uuid::new_v4();
    let c2 = Uuid::new_v4();
    room.join(c1, &identity("alice"), outbox());

    let renamed = Identity { id: "alice".into(), name: "Alice B".into(), color: "#000000".into() };
    let outcome = room.join(c2, &renamed, outbox());

    assert_eq!(outcome.kind, JoinKind::Rejoin);
    assert_eq!(outcome.roster.len(), 1);
    assert_eq!(outcome.presence.name, "Alice B");
    assert_eq!(outcome.presence.connections, BTreeSet::from([c1, c2]));
    assert_eq!(room.connection_count(), 2);
}

#[test]
fn presence_survives_until_last_connection_leaves() {
    let mut room = Room::new("r1");
    let c1 = Uuid::new_v4();
    let c2 = Uuid::new_v4();
    room.join(c1, &identity("alice"), outbox());
    room.join(c2, &identity("alice"), outbox());

    let first = room.leave(c2);
    assert_eq!(first, LeaveOutcome { departed: None, room_empty: false });
    assert_eq!(room.roster().len(), 1);

    let last = room.leave(c1);
    assert_eq!(last, LeaveOutcome { departed: Some("alice".into()), room_empty: true });
    assert!(room.roster().is_empty());
}

#[test]
fn connections_can_close_in_any_order() {
    let mut room = Room::new("r1");
    let conns: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    for conn in &conns {
        room.join(*conn, &identity("alice"), outbox());
    }
    for conn in [conns[2], conns[0], conns[3]] {
        assert!(room.leave(conn).departed.is_none());
        assert_eq!(room.roster().len(), 1);
    }
    assert_eq!(room.leave(conns[1]).departed.as_deref(), Some("alice"));
}

#[test]
fn leave_of_unknown_connection_is_a_no_op() {
    let mut room = Room::new("r1");
    let conn = Uuid::new_v4();
    room.join(conn, &identity("alice"), outbox());

    let outcome = room.leave(Uuid::new_v4());

    assert_eq!(outcome, LeaveOutcome::default());
    assert_eq!(room.roster().len(), 1);
}

#[test]
fn repeated_leave_is_a_no_op() {
    let mut room = Room::new("r1");
    let conn = Uuid::new_v4();
    room.join(conn, &identity("alice"), outbox());
    room.leave(conn);
    assert_eq!(room.leave(conn), LeaveOutcome::default());
}

#[test]
fn switching_identity_on_same_connection_departs_the_old_one() {
    let mut room = Room::new("r1");
    let conn = Uuid::new_v4();
    room.join(conn, &identity("alice"), outbox());

    let outcome = room.join(conn, &identity("bob"), outbox());

    assert_eq!(outcome.kind, JoinKind::NewIdentity);
    assert_eq!(outcome.departed.as_deref(), Some("alice"));
    let ids: Vec<_> = outcome.roster.iter().map(|p| p.identity_id.as_str()).collect();
    assert_eq!(ids, ["bob"]);
}

#[test]
fn same_connection_joining_twice_as_same_identity_is_a_rejoin() {
    let mut room = Room::new("r1");
    let conn = Uuid::new_v4();
    room.join(conn, &identity("alice"), outbox());

    let outcome = room.join(conn, &identity("alice"), outbox());

    assert_eq!(outcome.kind, JoinKind::Rejoin);
    assert!(outcome.departed.is_none());
    assert_eq!(outcome.presence.connections.len(), 1);
}

#[test]
fn cursor_update_is_shared_by_all_tabs_of_an_identity() {
    let mut room = Room::new("r1");
    let c1 = Uuid::new_v4();
    let c2 = Uuid::new_v4();
    room.join(c1, &identity("alice"), outbox());
    room.join(c2, &identity("alice"), outbox());

    let presence = room.update_cursor(c2, Cursor { x: 10.0, y: 20.0 }).expect("known connection");

    assert_eq!(presence.cursor, Cursor { x: 10.0, y: 20.0 });
    assert_eq!(room.roster()[0].cursor, Cursor { x: 10.0, y: 20.0 });
}

#[test]
fn cursor_update_for_unknown_connection_returns_none() {
    let mut room = Room::new("r1");
    assert!(room.update_cursor(Uuid::new_v4(), Cursor { x: 1.0, y: 1.0 }).is_none());
}

#[test]
fn roster_is_sorted_by_identity() {
    let mut room = Room::new("r1");
    for id in ["carol", "alice", "bob"] {
        room.join(Uuid::new_v4(), &identity(id), outbox());
    }
    let ids: Vec<_> = room.roster().into_iter().map(|p| p.identity_id).collect();
    assert_eq!(ids, ["alice", "bob", "carol"]);
}

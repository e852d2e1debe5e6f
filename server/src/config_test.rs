use super::*;

#[test]
fn env_parse_falls_back_when_unset() {
    assert_eq!(env_parse::<u16>("SKETCHROOM_TEST_UNSET_PORT", 4321), 4321);
}

#[test]
fn for_tests_has_no_frontend_origin() {
    let config = Config::for_tests();
    assert!(config.frontend_url.is_none());
    assert!(config.connection_outbox_capacity > 0);
    assert!(config.room_mailbox_capacity > 0);
}

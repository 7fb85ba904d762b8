use relay_core::{RoomId, ServerMessage};

use crate::integration::{create_test_dispatcher, init_tracing};
use crate::utils::{MockBehavior, TestChannel, join_msg};

#[tokio::test]
async fn test_join_empty_room() {
    init_tracing();

    let (dispatcher, factory) = create_test_dispatcher(MockBehavior::default());
    let mut a = TestChannel::new();

    dispatcher.handle_text(&a.channel, &join_msg("r1", "A")).await;

    assert_eq!(a.drain(), vec![ServerMessage::joined()]);

    let room = dispatcher
        .registry()
        .get_room(&RoomId::from("r1"))
        .expect("room should exist after join");
    assert!(room.has_participant(&"A".into()));
    assert!(room.publisher_ids().is_empty());
    assert_eq!(factory.created_count(), 0, "join must not create peers");
}

#[tokio::test]
async fn test_rejoin_rebinds_channel() {
    init_tracing();

    let (dispatcher, _factory) = create_test_dispatcher(MockBehavior::default());
    let mut first = TestChannel::new();
    let mut second = TestChannel::new();

    dispatcher.handle_text(&first.channel, &join_msg("r1", "A")).await;
    dispatcher.handle_text(&second.channel, &join_msg("r1", "A")).await;

    assert_eq!(first.drain(), vec![ServerMessage::joined()]);
    assert_eq!(second.drain(), vec![ServerMessage::joined()]);

    let room = dispatcher.registry().get_room(&"r1".into()).unwrap();
    assert_eq!(room.participant_count(), 1);
    assert_eq!(room.member_with_channel(second.id()), Some("A".into()));
    assert_eq!(room.member_with_channel(first.id()), None);
}

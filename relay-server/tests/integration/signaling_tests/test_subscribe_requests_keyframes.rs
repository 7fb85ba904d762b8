use relay_core::ServerMessage;
use relay_server::{PeerControl, PeerRole};

use crate::integration::{create_test_dispatcher, init_tracing};
use crate::utils::{MockBehavior, TestChannel, answer_for, join_msg, publish_msg, subscribe_msg};

#[tokio::test]
async fn test_subscribe_to_ready_publisher() {
    init_tracing();

    let behavior = MockBehavior {
        populate_tracks: true,
        ..Default::default()
    };
    let (dispatcher, factory) = create_test_dispatcher(behavior);
    let mut a = TestChannel::new();
    let mut b = TestChannel::new();
    let mut c = TestChannel::new();

    for (channel, user) in [(&a, "A"), (&b, "B")] {
        dispatcher.handle_text(&channel.channel, &join_msg("r1", user)).await;
    }
    dispatcher.handle_text(&a.channel, &publish_msg("r1", "A", "O1")).await;
    dispatcher.handle_text(&c.channel, &join_msg("r1", "C")).await;
    a.drain();
    b.drain();
    c.drain();

    dispatcher
        .handle_text(&b.channel, &subscribe_msg("r1", "B", "A", "O2"))
        .await;

    assert_eq!(
        b.drain(),
        vec![ServerMessage::subscribed("B".into(), "A".into(), answer_for("O2"))]
    );
    assert!(a.drain().is_empty());
    assert!(c.drain().is_empty());

    let publisher = factory.latest("A", PeerRole::Publisher).unwrap();
    assert_eq!(publisher.keyframe_count(), 1);

    let subscriber = factory.latest("B", PeerRole::Subscriber).unwrap();
    let bound = subscriber.bound_sources().expect("subscriber negotiated");
    assert!(bound.shares_slots_with(&publisher.media_sources()));
    assert!(bound.is_ready());
}

#[tokio::test]
async fn test_keyframes_skip_subscribers_own_publisher() {
    init_tracing();

    let behavior = MockBehavior {
        populate_tracks: true,
        ..Default::default()
    };
    let (dispatcher, factory) = create_test_dispatcher(behavior);
    let a = TestChannel::new();
    let b = TestChannel::new();
    let c = TestChannel::new();

    for (channel, user) in [(&a, "A"), (&b, "B"), (&c, "C")] {
        dispatcher
            .handle_text(&channel.channel, &publish_msg("r1", user, "offer"))
            .await;
    }

    dispatcher
        .handle_text(&b.channel, &subscribe_msg("r1", "B", "A", "O2"))
        .await;

    let keyframes = |user: &str| {
        factory
            .latest(user, PeerRole::Publisher)
            .unwrap()
            .keyframe_count()
    };
    assert_eq!(keyframes("A"), 1);
    assert_eq!(keyframes("C"), 1);
    assert_eq!(keyframes("B"), 0);
}

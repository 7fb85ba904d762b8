use relay_core::ServerMessage;
use relay_server::{PeerControl, PeerRole};
use std::time::Duration;
use tokio::time::Instant;

use crate::integration::{TEST_TRACK_WAIT, create_test_dispatcher, init_tracing};
use crate::utils::{MockBehavior, TestChannel, answer_for, publish_msg, subscribe_msg};

#[tokio::test(start_paused = true)]
async fn test_subscribe_proceeds_after_ceiling_when_tracks_never_arrive() {
    init_tracing();

    let (dispatcher, factory) = create_test_dispatcher(MockBehavior::default());
    let a = TestChannel::new();
    let mut b = TestChannel::new();

    dispatcher.handle_text(&a.channel, &publish_msg("r1", "A", "O1")).await;

    let started = Instant::now();
    dispatcher
        .handle_text(&b.channel, &subscribe_msg("r1", "B", "A", "O2"))
        .await;
    let elapsed = started.elapsed();

    assert!(elapsed >= TEST_TRACK_WAIT);
    assert!(elapsed < TEST_TRACK_WAIT + Duration::from_millis(100));
    assert_eq!(
        b.drain(),
        vec![ServerMessage::subscribed("B".into(), "A".into(), answer_for("O2"))]
    );

    let publisher = factory.latest("A", PeerRole::Publisher).unwrap();
    let subscriber = factory.latest("B", PeerRole::Subscriber).unwrap();
    let bound = subscriber.bound_sources().unwrap();
    assert!(!bound.is_ready());
    assert!(bound.shares_slots_with(&publisher.media_sources()));

    // Tracks populated after the bind still reach the subscriber's indirection.
    publisher.populate_tracks();
    assert!(bound.is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_returns_as_soon_as_tracks_arrive() {
    init_tracing();

    let (dispatcher, factory) = create_test_dispatcher(MockBehavior::default());
    let a = TestChannel::new();
    let mut b = TestChannel::new();

    dispatcher.handle_text(&a.channel, &publish_msg("r1", "A", "O1")).await;
    let publisher = factory.latest("A", PeerRole::Publisher).unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        publisher.populate_tracks();
    });

    let started = Instant::now();
    dispatcher
        .handle_text(&b.channel, &subscribe_msg("r1", "B", "A", "O2"))
        .await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < TEST_TRACK_WAIT);
    assert_eq!(b.drain().len(), 1);

    let bound = factory
        .latest("B", PeerRole::Subscriber)
        .unwrap()
        .bound_sources()
        .unwrap();
    assert!(bound.is_ready());
}

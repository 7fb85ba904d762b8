use relay_core::ServerMessage;
use relay_server::PeerRole;

use crate::integration::{create_test_dispatcher, init_tracing};
use crate::utils::{MockBehavior, TestChannel, answer_for, join_msg, publish_msg};

#[tokio::test]
async fn test_publish_answers_publisher_and_notifies_members() {
    init_tracing();

    let (dispatcher, factory) = create_test_dispatcher(MockBehavior::default());
    let mut a = TestChannel::new();
    let mut b = TestChannel::new();

    dispatcher.handle_text(&b.channel, &join_msg("r1", "B")).await;
    dispatcher.handle_text(&a.channel, &join_msg("r1", "A")).await;
    b.drain();
    a.drain();

    dispatcher.handle_text(&a.channel, &publish_msg("r1", "A", "O1")).await;

    let expected = ServerMessage::published("A".into(), answer_for("O1"));
    assert_eq!(a.drain(), vec![expected.clone()]);
    assert_eq!(b.drain(), vec![expected]);

    let publisher = factory.latest("A", PeerRole::Publisher).unwrap();
    assert_eq!(publisher.negotiation_count(), 1);
    assert_eq!(publisher.stop_count(), 0);
}

#[tokio::test]
async fn test_publish_reply_wire_shape() {
    init_tracing();

    let (dispatcher, _factory) = create_test_dispatcher(MockBehavior::default());
    let mut a = TestChannel::new();

    dispatcher.handle_text(&a.channel, &publish_msg("r1", "A", "O1")).await;

    let reply = a.drain().pop().expect("publisher should get a reply");
    let json: serde_json::Value = serde_json::from_str(&reply.to_json().unwrap()).unwrap();
    assert_eq!(json["type"], "onPublish");
    assert_eq!(json["data"]["userID"], "A");
    assert_eq!(json["data"]["jsep"]["type"], "answer");
    assert_eq!(json["data"]["jsep"]["sdp"], answer_for("O1"));
}

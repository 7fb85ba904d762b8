use relay_server::{
    MediaSources, PeerControl, PeerError, PeerFactory, PeerRole, TransportConfig,
    WebRtcPeerFactory,
};
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;

use crate::integration::init_tracing;
use crate::utils::TestClient;

fn offline_factory() -> WebRtcPeerFactory {
    WebRtcPeerFactory::new(TransportConfig {
        ice_servers: vec![],
        username: None,
        credential: None,
        include_loopback: false,
    })
}

#[tokio::test]
async fn test_publisher_answers_local_offer() {
    init_tracing();

    let client = TestClient::new().await.expect("Failed to create client");
    let offer = client
        .create_offer(RTCRtpTransceiverDirection::Sendonly)
        .await
        .expect("Failed to create offer");

    let peer = offline_factory().create(&"A".into(), PeerRole::Publisher);
    let answer = peer
        .negotiate_as_sender(offer.clone())
        .await
        .expect("Publisher negotiation failed");

    assert!(answer.starts_with("v=0"));
    assert!(answer.contains("m=audio"));
    assert!(answer.contains("m=video"));
    client
        .set_remote_answer(answer)
        .await
        .expect("Client rejected the answer");

    let res = peer.negotiate_as_sender(offer).await;
    assert!(matches!(res, Err(PeerError::AlreadyNegotiated)));

    // No media has flowed yet.
    assert!(!peer.media_sources().is_ready());

    peer.stop();
    peer.close_transport().await;
    client.close().await.expect("Failed to close client");
}

#[tokio::test]
async fn test_subscriber_binds_pending_sources() {
    init_tracing();

    let client = TestClient::new().await.expect("Failed to create client");
    let offer = client
        .create_offer(RTCRtpTransceiverDirection::Recvonly)
        .await
        .expect("Failed to create offer");

    let peer = offline_factory().create(&"B".into(), PeerRole::Subscriber);
    let answer = peer
        .negotiate_as_receiver(offer, MediaSources::new())
        .await
        .expect("Subscriber negotiation failed");

    assert!(answer.contains("m=video"));
    assert!(answer.contains("a=sendonly"));
    client
        .set_remote_answer(answer)
        .await
        .expect("Client rejected the answer");

    peer.stop();
    peer.close_transport().await;
    client.close().await.expect("Failed to close client");
}

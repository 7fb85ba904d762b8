use crate::config::TransportConfig;
use crate::peer::{MediaSources, PeerControl, PeerError, PeerFactory, PeerRole, TrackSlot};
use async_trait::async_trait;
use relay_core::UserId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, trace, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_local::{TrackLocal, TrackLocalWriter};
use webrtc::track::track_remote::TrackRemote;

/// Upper bound on ICE gathering before the answer is returned as-is.
const GATHER_TIMEOUT: Duration = Duration::from_secs(5);

/// One WebRTC peer connection in either publisher or subscriber role.
pub struct WebRtcPeer {
    user_id: UserId,
    role: PeerRole,
    config: TransportConfig,
    sources: MediaSources,
    connection: Mutex<Option<Arc<RTCPeerConnection>>>,
    /// SSRC of the inbound video track, 0 until it arrives.
    video_ssrc: Arc<AtomicU32>,
    stopped: watch::Sender<bool>,
}

impl WebRtcPeer {
    pub fn new(user_id: UserId, role: PeerRole, config: TransportConfig) -> Self {
        let (stopped, _) = watch::channel(false);
        Self {
            user_id,
            role,
            config,
            sources: MediaSources::new(),
            connection: Mutex::new(None),
            video_ssrc: Arc::new(AtomicU32::new(0)),
            stopped,
        }
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Builds the RTCPeerConnection. A peer negotiates at most once.
    async fn connect(&self) -> Result<Arc<RTCPeerConnection>, PeerError> {
        if self.is_stopped() {
            return Err(PeerError::Stopped);
        }

        let mut connection = self.connection.lock().await;
        if connection.is_some() {
            return Err(PeerError::AlreadyNegotiated);
        }

        let mut m = MediaEngine::default();
        m.register_default_codecs()?;

        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let mut settings = SettingEngine::default();
        settings.set_include_loopback_candidate(self.config.include_loopback);

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings)
            .build();

        let ice_servers = if self.config.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: self.config.ice_servers.clone(),
                username: self.config.username.clone().unwrap_or_default(),
                credential: self.config.credential.clone().unwrap_or_default(),
            }]
        };

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let uid_state = self.user_id.clone();
        let role = self.role;
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let uid = uid_state.clone();
                Box::pin(async move {
                    info!(user_id = %uid, %role, "Peer connection state changed: {}", s);
                })
            },
        ));

        *connection = Some(peer_connection.clone());
        Ok(peer_connection)
    }

    /// Applies the remote offer and returns a complete (non-trickle) answer.
    async fn answer(
        &self,
        peer_connection: &RTCPeerConnection,
        offer: String,
    ) -> Result<String, PeerError> {
        peer_connection
            .set_remote_description(RTCSessionDescription::offer(offer)?)
            .await?;

        let answer = peer_connection.create_answer(None).await?;
        let mut gathering = peer_connection.gathering_complete_promise().await;
        peer_connection.set_local_description(answer).await?;

        if tokio::time::timeout(GATHER_TIMEOUT, gathering.recv())
            .await
            .is_err()
        {
            warn!(user_id = %self.user_id, "ICE gathering incomplete, answering anyway");
        }

        let local = peer_connection
            .local_description()
            .await
            .ok_or(PeerError::MissingLocalDescription)?;
        Ok(local.sdp)
    }

    /// Attaches one of the publisher's slots to this subscriber connection.
    async fn bind_slot(
        &self,
        peer_connection: &RTCPeerConnection,
        slot: Arc<TrackSlot>,
    ) -> Result<(), PeerError> {
        let sender = match slot.current() {
            Some(track) => {
                peer_connection
                    .add_track(track as Arc<dyn TrackLocal + Send + Sync>)
                    .await?
            }
            None => {
                let transceiver = peer_connection
                    .add_transceiver_from_kind(
                        slot.kind(),
                        Some(RTCRtpTransceiverInit {
                            direction: RTCRtpTransceiverDirection::Sendonly,
                            send_encodings: vec![],
                        }),
                    )
                    .await?;
                let sender = transceiver.sender().await;

                debug!(
                    user_id = %self.user_id,
                    kind = %slot.kind(),
                    "Publisher track pending, binding later"
                );
                tokio::spawn(bind_when_ready(
                    self.user_id.clone(),
                    slot,
                    sender.clone(),
                    self.stopped.subscribe(),
                ));
                sender
            }
        };

        tokio::spawn(drain_rtcp(sender, self.stopped.subscribe()));
        Ok(())
    }
}

#[async_trait]
impl PeerControl for WebRtcPeer {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn role(&self) -> PeerRole {
        self.role
    }

    fn media_sources(&self) -> MediaSources {
        self.sources.clone()
    }

    async fn negotiate_as_sender(&self, offer: String) -> Result<String, PeerError> {
        if self.role != PeerRole::Publisher {
            return Err(PeerError::WrongRole(self.role));
        }

        let peer_connection = self.connect().await?;

        for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
            peer_connection
                .add_transceiver_from_kind(
                    kind,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await?;
        }

        let sources = self.sources.clone();
        let video_ssrc = self.video_ssrc.clone();
        let stopped = self.stopped.subscribe();
        let uid_track = self.user_id.clone();
        peer_connection.on_track(Box::new(
            move |remote: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let sources = sources.clone();
                let video_ssrc = video_ssrc.clone();
                let stopped = stopped.clone();
                let uid = uid_track.clone();
                Box::pin(async move {
                    tokio::spawn(forward_track(uid, remote, sources, video_ssrc, stopped));
                })
            },
        ));

        self.answer(&peer_connection, offer).await
    }

    async fn negotiate_as_receiver(
        &self,
        offer: String,
        sources: MediaSources,
    ) -> Result<String, PeerError> {
        if self.role != PeerRole::Subscriber {
            return Err(PeerError::WrongRole(self.role));
        }

        let peer_connection = self.connect().await?;

        for slot in [sources.video(), sources.audio()] {
            self.bind_slot(&peer_connection, slot.clone()).await?;
        }

        self.answer(&peer_connection, offer).await
    }

    async fn request_keyframe(&self) {
        if self.role != PeerRole::Publisher {
            return;
        }

        let media_ssrc = self.video_ssrc.load(Ordering::Acquire);
        if media_ssrc == 0 {
            debug!(user_id = %self.user_id, "No video track yet, skipping keyframe request");
            return;
        }

        let Some(peer_connection) = self.connection.lock().await.clone() else {
            return;
        };

        let pli = PictureLossIndication {
            sender_ssrc: 0,
            media_ssrc,
        };
        if let Err(e) = peer_connection.write_rtcp(&[Box::new(pli)]).await {
            warn!(user_id = %self.user_id, "Failed to send PLI: {}", e);
        }
    }

    fn stop(&self) {
        self.stopped.send_replace(true);
    }

    async fn close_transport(&self) {
        let Some(peer_connection) = self.connection.lock().await.take() else {
            return;
        };
        if let Err(e) = peer_connection.close().await {
            warn!(
                user_id = %self.user_id,
                role = %self.role,
                "Failed to close peer connection: {}",
                e
            );
        }
    }
}

/// Mirrors one inbound publisher track into a local track subscribers can bind.
async fn forward_track(
    user_id: UserId,
    remote: Arc<TrackRemote>,
    sources: MediaSources,
    video_ssrc: Arc<AtomicU32>,
    mut stopped: watch::Receiver<bool>,
) {
    let kind = remote.kind();
    let Some(slot) = sources.slot(kind) else {
        warn!(%user_id, "Ignoring track of unknown kind");
        return;
    };

    let local = Arc::new(TrackLocalStaticRTP::new(
        remote.codec().capability,
        format!("{kind}-{user_id}"),
        format!("relay-{user_id}"),
    ));

    if kind == RTPCodecType::Video {
        video_ssrc.store(remote.ssrc(), Ordering::Release);
    }
    slot.populate(local.clone());
    info!(%user_id, %kind, "Publisher track available");

    if *stopped.borrow() {
        return;
    }

    loop {
        tokio::select! {
            _ = stopped.changed() => break,
            packet = remote.read_rtp() => match packet {
                Ok((packet, _)) => {
                    if let Err(e) = local.write_rtp(&packet).await {
                        trace!(%user_id, "Dropped forwarded packet: {}", e);
                    }
                }
                Err(e) => {
                    debug!(%user_id, %kind, "Publisher track ended: {}", e);
                    break;
                }
            }
        }
    }
}

/// Swaps the placeholder track for the publisher's track once it exists.
async fn bind_when_ready(
    user_id: UserId,
    slot: Arc<TrackSlot>,
    sender: Arc<RTCRtpSender>,
    mut stopped: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = stopped.changed() => {}
        track = slot.ready() => {
            match sender.replace_track(Some(track as Arc<dyn TrackLocal + Send + Sync>)).await {
                Ok(()) => info!(%user_id, kind = %slot.kind(), "Late publisher track bound"),
                Err(e) => warn!(%user_id, "Failed to bind late publisher track: {}", e),
            }
        }
    }
}

/// RTCP has to be read for interceptors to run.
async fn drain_rtcp(sender: Arc<RTCRtpSender>, mut stopped: watch::Receiver<bool>) {
    let mut buf = vec![0u8; 1500];
    loop {
        tokio::select! {
            _ = stopped.changed() => break,
            res = sender.read(&mut buf) => if res.is_err() { break },
        }
    }
}

#[derive(Clone, Default)]
pub struct WebRtcPeerFactory {
    config: TransportConfig,
}

impl WebRtcPeerFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl PeerFactory for WebRtcPeerFactory {
    fn create(&self, user_id: &UserId, role: PeerRole) -> Arc<dyn PeerControl> {
        Arc::new(WebRtcPeer::new(user_id.clone(), role, self.config.clone()))
    }
}

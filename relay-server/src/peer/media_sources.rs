use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;

/// A publisher's outbound track that may not exist yet.
///
/// Subscribers hold the slot, not the track, so a track that shows up after
/// they negotiated still reaches them.
pub struct TrackSlot {
    kind: RTPCodecType,
    track: watch::Sender<Option<Arc<TrackLocalStaticRTP>>>,
}

impl TrackSlot {
    pub fn new(kind: RTPCodecType) -> Self {
        let (track, _) = watch::channel(None);
        Self { kind, track }
    }

    pub fn kind(&self) -> RTPCodecType {
        self.kind
    }

    pub fn current(&self) -> Option<Arc<TrackLocalStaticRTP>> {
        self.track.borrow().clone()
    }

    pub fn is_populated(&self) -> bool {
        self.track.borrow().is_some()
    }

    /// Replaces the track and wakes everyone waiting in [`TrackSlot::ready`].
    pub fn populate(&self, track: Arc<TrackLocalStaticRTP>) {
        self.track.send_replace(Some(track));
    }

    /// Resolves once the slot holds a track.
    pub async fn ready(&self) -> Arc<TrackLocalStaticRTP> {
        let mut rx = self.track.subscribe();
        loop {
            if let Some(track) = rx.borrow_and_update().clone() {
                return track;
            }
            // `self` owns the sender, so it cannot be dropped while we wait.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Audio and video indirections of one publisher. Clones share the slots.
#[derive(Clone)]
pub struct MediaSources {
    video: Arc<TrackSlot>,
    audio: Arc<TrackSlot>,
}

impl MediaSources {
    pub fn new() -> Self {
        Self {
            video: Arc::new(TrackSlot::new(RTPCodecType::Video)),
            audio: Arc::new(TrackSlot::new(RTPCodecType::Audio)),
        }
    }

    pub fn video(&self) -> &Arc<TrackSlot> {
        &self.video
    }

    pub fn audio(&self) -> &Arc<TrackSlot> {
        &self.audio
    }

    pub fn slot(&self, kind: RTPCodecType) -> Option<&Arc<TrackSlot>> {
        match kind {
            RTPCodecType::Video => Some(&self.video),
            RTPCodecType::Audio => Some(&self.audio),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.video.is_populated() && self.audio.is_populated()
    }

    /// Waits until both slots are populated or `ceiling` elapses.
    /// Returns whether both tracks were ready in time.
    pub async fn wait_ready(&self, ceiling: Duration) -> bool {
        let both = async {
            tokio::join!(self.video.ready(), self.audio.ready());
        };
        tokio::time::timeout(ceiling, both).await.is_ok()
    }

    pub fn shares_slots_with(&self, other: &MediaSources) -> bool {
        Arc::ptr_eq(&self.video, &other.video) && Arc::ptr_eq(&self.audio, &other.audio)
    }
}

impl Default for MediaSources {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn test_track(kind: RTPCodecType) -> Arc<TrackLocalStaticRTP> {
    use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
    use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;

    let mime_type = match kind {
        RTPCodecType::Audio => MIME_TYPE_OPUS,
        _ => MIME_TYPE_VP8,
    };
    Arc::new(TrackLocalStaticRTP::new(
        RTCRtpCodecCapability {
            mime_type: mime_type.to_owned(),
            ..Default::default()
        },
        format!("{kind}"),
        "test".to_owned(),
    ))
}

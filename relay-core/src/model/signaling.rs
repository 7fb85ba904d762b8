use crate::model::peer::UserId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed signaling envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{kind} request carries an empty SDP offer")]
    EmptyOffer { kind: &'static str },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    #[default]
    Offer,
    Answer,
}

/// Session description as exchanged with browsers: `{"type": "offer", "sdp": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jsep {
    #[serde(rename = "type", default)]
    pub kind: SdpKind,
    pub sdp: String,
}

impl Jsep {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomRequest {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    #[serde(rename = "userID")]
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishRequest {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub jsep: Jsep,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscribeRequest {
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
    #[serde(rename = "userID")]
    pub user_id: UserId,
    #[serde(rename = "pubID")]
    pub pub_id: UserId,
    pub jsep: Jsep,
}

/// Messages sent by participants to the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum SignalMessage {
    Join(RoomRequest),
    Leave(RoomRequest),
    Publish(PublishRequest),
    Subscribe(SubscribeRequest),
}

impl SignalMessage {
    /// Decodes one envelope and checks the fields serde cannot express.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let message: SignalMessage = serde_json::from_str(text)?;

        match &message {
            SignalMessage::Publish(PublishRequest { jsep, .. })
            | SignalMessage::Subscribe(SubscribeRequest { jsep, .. })
                if jsep.sdp.trim().is_empty() =>
            {
                Err(DecodeError::EmptyOffer {
                    kind: message.kind(),
                })
            }
            _ => Ok(message),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Join(_) => "join",
            SignalMessage::Leave(_) => "leave",
            SignalMessage::Publish(_) => "publish",
            SignalMessage::Subscribe(_) => "subscribe",
        }
    }

    pub fn room_id(&self) -> &RoomId {
        match self {
            SignalMessage::Join(req) | SignalMessage::Leave(req) => &req.room_id,
            SignalMessage::Publish(req) => &req.room_id,
            SignalMessage::Subscribe(req) => &req.room_id,
        }
    }

    pub fn user_id(&self) -> &UserId {
        match self {
            SignalMessage::Join(req) | SignalMessage::Leave(req) => &req.user_id,
            SignalMessage::Publish(req) => &req.user_id,
            SignalMessage::Subscribe(req) => &req.user_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JoinStatus {
    Success,
}

/// Notifications sent by the relay to participants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    OnJoinRoom {
        status: JoinStatus,
    },
    /// `jsep` is absent when announcing an existing publisher to a joiner.
    OnPublish {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        jsep: Option<Jsep>,
        #[serde(rename = "userID")]
        user_id: UserId,
        #[serde(rename = "pubID")]
        pub_id: UserId,
    },
    OnSubscribe {
        jsep: Jsep,
        #[serde(rename = "userID")]
        user_id: UserId,
        #[serde(rename = "pubID")]
        pub_id: UserId,
    },
    OnUnpublish {
        #[serde(rename = "pubID")]
        pub_id: UserId,
    },
}

impl ServerMessage {
    pub fn joined() -> Self {
        ServerMessage::OnJoinRoom {
            status: JoinStatus::Success,
        }
    }

    pub fn publisher_announcement(pub_id: UserId) -> Self {
        ServerMessage::OnPublish {
            jsep: None,
            user_id: pub_id.clone(),
            pub_id,
        }
    }

    pub fn published(user_id: UserId, answer: String) -> Self {
        ServerMessage::OnPublish {
            jsep: Some(Jsep::answer(answer)),
            pub_id: user_id.clone(),
            user_id,
        }
    }

    pub fn subscribed(user_id: UserId, pub_id: UserId, answer: String) -> Self {
        ServerMessage::OnSubscribe {
            jsep: Jsep::answer(answer),
            user_id,
            pub_id,
        }
    }

    pub fn unpublished(pub_id: UserId) -> Self {
        ServerMessage::OnUnpublish { pub_id }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

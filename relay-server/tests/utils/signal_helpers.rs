use serde_json::json;

pub fn join_msg(room: &str, user: &str) -> String {
    json!({ "type": "join", "data": { "roomId": room, "userID": user } }).to_string()
}

pub fn leave_msg(room: &str, user: &str) -> String {
    json!({ "type": "leave", "data": { "roomId": room, "userID": user } }).to_string()
}

pub fn publish_msg(room: &str, user: &str, sdp: &str) -> String {
    json!({
        "type": "publish",
        "data": {
            "roomId": room,
            "userID": user,
            "jsep": { "type": "offer", "sdp": sdp }
        }
    })
    .to_string()
}

pub fn subscribe_msg(room: &str, user: &str, pub_id: &str, sdp: &str) -> String {
    json!({
        "type": "subscribe",
        "data": {
            "roomId": room,
            "userID": user,
            "pubID": pub_id,
            "jsep": { "type": "offer", "sdp": sdp }
        }
    })
    .to_string()
}

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Phoenix channel frames (Supabase Realtime, vsn 1.0.0)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhxMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PhxMessage {
    /// Join a channel listening to every `postgres_changes` event on one
    /// table in the `public` schema.
    pub fn join_table(topic: &str, table: &str, access_token: &str, msg_ref: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: "phx_join".into(),
            payload: json!({
                "config": {
                    "broadcast": { "ack": false, "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [
                        { "event": "*", "schema": "public", "table": table }
                    ]
                },
                "access_token": access_token,
            }),
            msg_ref: Some(msg_ref.to_string()),
            join_ref: Some(msg_ref.to_string()),
        }
    }

    pub fn heartbeat(msg_ref: u64) -> Self {
        Self {
            topic: "phoenix".into(),
            event: "heartbeat".into(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
            join_ref: None,
        }
    }
}

/// What an inbound frame means for the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A row changed. Carries the change type when the server sent one.
    Change(Option<String>),
    JoinOk,
    JoinError(String),
    ChannelClosed,
    Ignored,
}

/// Classify a text frame for `topic`. Frames for other topics, heartbeat
/// replies and presence traffic are `Ignored`.
pub fn classify(text: &str, topic: &str, join_ref: &str) -> Inbound {
    let msg: PhxMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(_) => return Inbound::Ignored,
    };

    if msg.topic != topic {
        return Inbound::Ignored;
    }

    match msg.event.as_str() {
        "postgres_changes" => {
            let kind = msg
                .payload
                .pointer("/data/type")
                .and_then(Value::as_str)
                .map(str::to_string);
            Inbound::Change(kind)
        }
        "INSERT" | "UPDATE" | "DELETE" => Inbound::Change(Some(msg.event)),
        "phx_reply" if msg.msg_ref.as_deref() == Some(join_ref) => {
            match msg.payload.get("status").and_then(Value::as_str) {
                Some("ok") => Inbound::JoinOk,
                _ => Inbound::JoinError(reason(&msg.payload)),
            }
        }
        "system" if msg.payload.get("status").and_then(Value::as_str) == Some("error") => {
            Inbound::JoinError(reason(&msg.payload))
        }
        "phx_error" | "phx_close" => Inbound::ChannelClosed,
        _ => Inbound::Ignored,
    }
}

fn reason(payload: &Value) -> String {
    payload
        .pointer("/response/reason")
        .or_else(|| payload.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = "realtime:sales-changes";

    #[test]
    fn join_frame_shape() {
        let msg = PhxMessage::join_table(TOPIC, "sales", "anon", 1);
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["event"], "phx_join");
        assert_eq!(v["ref"], "1");
        assert_eq!(v["payload"]["config"]["postgres_changes"][0]["table"], "sales");
        assert_eq!(v["payload"]["config"]["postgres_changes"][0]["event"], "*");
    }

    #[test]
    fn heartbeat_targets_phoenix_topic() {
        let v = serde_json::to_value(PhxMessage::heartbeat(7)).unwrap();
        assert_eq!(v["topic"], "phoenix");
        assert_eq!(v["event"], "heartbeat");
        assert!(v.get("join_ref").is_none());
    }

    #[test]
    fn classifies_change_events() {
        let frame = r#"{"topic":"realtime:sales-changes","event":"postgres_changes",
            "payload":{"ids":[1],"data":{"type":"UPDATE","table":"sales"}},"ref":null}"#;
        assert_eq!(classify(frame, TOPIC, "1"), Inbound::Change(Some("UPDATE".into())));

        let legacy = r#"{"topic":"realtime:sales-changes","event":"DELETE","payload":{},"ref":null}"#;
        assert_eq!(classify(legacy, TOPIC, "1"), Inbound::Change(Some("DELETE".into())));
    }

    #[test]
    fn classifies_join_replies() {
        let ok = r#"{"topic":"realtime:sales-changes","event":"phx_reply",
            "payload":{"status":"ok","response":{}},"ref":"1"}"#;
        assert_eq!(classify(ok, TOPIC, "1"), Inbound::JoinOk);

        let err = r#"{"topic":"realtime:sales-changes","event":"phx_reply",
            "payload":{"status":"error","response":{"reason":"unauthorized"}},"ref":"1"}"#;
        assert_eq!(classify(err, TOPIC, "1"), Inbound::JoinError("unauthorized".into()));

        // Heartbeat replies use other refs
        let hb = r#"{"topic":"realtime:sales-changes","event":"phx_reply",
            "payload":{"status":"ok"},"ref":"9"}"#;
        assert_eq!(classify(hb, TOPIC, "1"), Inbound::Ignored);
    }

    #[test]
    fn ignores_other_topics_and_garbage() {
        let other = r#"{"topic":"phoenix","event":"phx_reply","payload":{"status":"ok"},"ref":"2"}"#;
        assert_eq!(classify(other, TOPIC, "1"), Inbound::Ignored);
        assert_eq!(classify("not json", TOPIC, "1"), Inbound::Ignored);
    }
}

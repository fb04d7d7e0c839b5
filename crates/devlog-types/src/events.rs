use serde::{Deserialize, Serialize};

use crate::models::{CommunityPost, Post};

/// Events pushed to every connected browser.
///
/// Wire form is `{"type": "newPost", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RealtimeEvent {
    /// A release post was published
    NewPost(Post),

    /// A community post was created (always with an empty comment list)
    NewCommunityPost(CommunityPost),

    /// A live comment was stored
    ReceiveComment(CommentBroadcast),
}

impl RealtimeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewPost(_) => "newPost",
            Self::NewCommunityPost(_) => "newCommunityPost",
            Self::ReceiveComment(_) => "receiveComment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentBroadcast {
    pub post_id: i64,
    pub username: String,
    pub text: String,
    pub date: String,
}

/// Commands sent FROM a browser TO the server over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RealtimeCommand {
    SendComment(SendComment),
}

/// Missing handle or text deserializes as empty and is dropped by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendComment {
    pub post_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RELEASE_TAG;

    #[test]
    fn new_post_wire_shape() {
        let event = RealtimeEvent::NewPost(Post {
            id: 7,
            title: "Spring cleanup".into(),
            version: "1.4".into(),
            text: "Faster exports".into(),
            date: "3/9/2026".into(),
            tag: RELEASE_TAG.into(),
            download_url: "/uploads/1-editor.zip".into(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "newPost");
        assert_eq!(json["data"]["downloadUrl"], "/uploads/1-editor.zip");
        assert_eq!(json["data"]["tag"], "Update");
    }

    #[test]
    fn receive_comment_carries_post_id() {
        let event = RealtimeEvent::ReceiveComment(CommentBroadcast {
            post_id: 3,
            username: "mira".into(),
            text: "works for me".into(),
            date: "4:05:09 PM".into(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "receiveComment");
        assert_eq!(json["data"]["postId"], 3);
        assert_eq!(event.kind(), "receiveComment");
    }

    #[test]
    fn send_comment_parses_browser_frame() {
        let raw = r#"{"type":"sendComment","data":{"postId":12,"username":"ola","text":"hi"}}"#;
        let RealtimeCommand::SendComment(cmd) = serde_json::from_str(raw).unwrap();
        assert_eq!(cmd.post_id, 12);
        assert_eq!(cmd.username, "ola");
        assert_eq!(cmd.text, "hi");
    }

    #[test]
    fn send_comment_missing_text_is_empty() {
        let raw = r#"{"type":"sendComment","data":{"postId":1,"username":"ola"}}"#;
        let RealtimeCommand::SendComment(cmd) = serde_json::from_str(raw).unwrap();
        assert!(cmd.text.is_empty());
    }

    #[test]
    fn unknown_command_is_rejected() {
        let raw = r#"{"type":"deletePost","data":{"postId":1}}"#;
        assert!(serde_json::from_str::<RealtimeCommand>(raw).is_err());
    }
}

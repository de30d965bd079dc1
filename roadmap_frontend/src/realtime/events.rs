use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::models::{Comment, Notification, VoteAction};

/// The six server-to-client event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CommentCreated,
    CommentUpdated,
    CommentDeleted,
    VoteUpdated,
    NotificationCreated,
    NotificationUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::CommentCreated,
        EventKind::CommentUpdated,
        EventKind::CommentDeleted,
        EventKind::VoteUpdated,
        EventKind::NotificationCreated,
        EventKind::NotificationUpdated,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            EventKind::CommentCreated => "comment_created",
            EventKind::CommentUpdated => "comment_updated",
            EventKind::CommentDeleted => "comment_deleted",
            EventKind::VoteUpdated => "vote_updated",
            EventKind::NotificationCreated => "new_notification",
            EventKind::NotificationUpdated => "notification_update",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentChanged {
    pub item_id: String,
    pub comment: Comment,
    /// Set for replies. Some servers only put it on the comment itself.
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl CommentChanged {
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id
            .as_deref()
            .or(self.comment.parent_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRemoved {
    pub item_id: String,
    pub comment_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteChanged {
    pub item_id: String,
    pub vote_count: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    pub action: VoteAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationChanged {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub notification_id: Option<String>,
}

impl NotificationChanged {
    pub fn is_mark_read(&self) -> bool {
        self.kind == "mark_read"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    CommentCreated(CommentChanged),
    CommentUpdated(CommentChanged),
    CommentDeleted(CommentRemoved),
    VoteUpdated(VoteChanged),
    NotificationCreated(Notification),
    NotificationUpdated(NotificationChanged),
}

impl RealtimeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RealtimeEvent::CommentCreated(_) => EventKind::CommentCreated,
            RealtimeEvent::CommentUpdated(_) => EventKind::CommentUpdated,
            RealtimeEvent::CommentDeleted(_) => EventKind::CommentDeleted,
            RealtimeEvent::VoteUpdated(_) => EventKind::VoteUpdated,
            RealtimeEvent::NotificationCreated(_) => EventKind::NotificationCreated,
            RealtimeEvent::NotificationUpdated(_) => EventKind::NotificationUpdated,
        }
    }

    /// Parses a named server event. Unknown names yield `Ok(None)`.
    pub fn from_wire(name: &str, data: Value) -> Result<Option<Self>> {
        let Some(kind) = EventKind::from_wire(name) else {
            return Ok(None);
        };
        let event = match kind {
            EventKind::CommentCreated => RealtimeEvent::CommentCreated(serde_json::from_value(data)?),
            EventKind::CommentUpdated => RealtimeEvent::CommentUpdated(serde_json::from_value(data)?),
            EventKind::CommentDeleted => RealtimeEvent::CommentDeleted(serde_json::from_value(data)?),
            EventKind::VoteUpdated => RealtimeEvent::VoteUpdated(serde_json::from_value(data)?),
            EventKind::NotificationCreated => {
                RealtimeEvent::NotificationCreated(serde_json::from_value(data)?)
            }
            EventKind::NotificationUpdated => {
                RealtimeEvent::NotificationUpdated(serde_json::from_value(data)?)
            }
        };
        Ok(Some(event))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Failed(String),
}

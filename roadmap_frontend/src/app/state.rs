use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::comment_tree::Detached;
use crate::models::{Comment, Notification, User};
use crate::realtime::RealtimeClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// Everything that lives exactly as long as one login.
pub struct Session {
    pub user: User,
    pub realtime: RealtimeClient,
}

impl Session {
    pub(super) fn end(mut self) {
        self.realtime.off_all_listeners();
        self.realtime.disconnect();
    }
}

/// Comment panel latch. A collapsed panel has no entry at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    /// Subscribed, comments still loading.
    Expanding,
    Expanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    Login,
    Register,
}

/// Admin seeding endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    /// Random items picked from the server's templates.
    Bulk,
    /// The fixed demo set.
    Demo,
}

/// Snapshot taken before an optimistic vote toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PendingVote {
    pub was_member: bool,
    /// Change applied to the displayed count.
    pub delta: i64,
    /// A streamed vote event has since set the count from the server.
    pub authoritative: bool,
}

#[derive(Debug, Clone)]
pub(super) enum PendingComment {
    Create {
        item_id: String,
        placeholder_id: String,
        parent_id: Option<String>,
    },
    Edit {
        item_id: String,
        previous: Comment,
    },
    Delete {
        item_id: String,
        detached: Detached,
    },
}

#[derive(Debug, Default)]
pub struct NotificationState {
    pub entries: Vec<Notification>,
    pub unread: u32,
    pub loading: bool,
}

impl NotificationState {
    /// Flips the entry to read. Returns `false` if it was already read,
    /// `true` if it changed or is not in the list.
    pub(super) fn mark_read(&mut self, notification_id: &str) -> bool {
        match self.entries.iter_mut().find(|n| n.id == notification_id) {
            Some(entry) if entry.is_read => false,
            Some(entry) => {
                entry.is_read = true;
                true
            }
            None => true,
        }
    }

    pub(super) fn decrement_unread(&mut self) {
        self.unread = self.unread.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient, dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            title: title.into(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

use std::collections::HashSet;

use crate::error::Result;
use crate::models::{
    BulkCreated, Comment, ItemTemplate, Notification, NotificationPage, RoadmapItem, User,
    VoteToggle,
};
use crate::realtime::{ConnectionStatus, RealtimeEvent};

use super::state::{AuthFlow, SeedKind};
use super::RoadmapApp;

/// Results handed back to the coordinator by worker threads and by the
/// real-time client's listeners. `session` tags results that belong to the
/// session that requested them; see `RoadmapApp::session_epoch`.
#[derive(Debug)]
pub enum AppMessage {
    ProfileLoaded(Result<User>),
    Authenticated {
        flow: AuthFlow,
        result: Result<User>,
    },
    ItemsLoaded {
        generation: u64,
        result: Result<Vec<RoadmapItem>>,
    },
    /// Ids among `checked` the user has voted for.
    VoteMembershipLoaded {
        session: u64,
        checked: Vec<String>,
        voted: HashSet<String>,
    },
    VoteToggled {
        item_id: String,
        result: Result<VoteToggle>,
    },
    ItemCreated(Result<RoadmapItem>),
    ItemsSeeded {
        kind: SeedKind,
        requested: u32,
        result: Result<BulkCreated>,
    },
    TemplatesLoaded(Result<Vec<ItemTemplate>>),
    ItemUpdated {
        item_id: String,
        result: Result<RoadmapItem>,
    },
    ItemDeleted {
        item_id: String,
        result: Result<()>,
    },
    CommentsLoaded {
        item_id: String,
        result: Result<Vec<Comment>>,
    },
    CommentCreated {
        op: u64,
        result: Result<Comment>,
    },
    CommentEdited {
        op: u64,
        result: Result<Comment>,
    },
    CommentDeleted {
        op: u64,
        result: Result<()>,
    },
    NotificationsLoaded {
        session: u64,
        result: Result<NotificationPage>,
    },
    UnreadCountLoaded {
        session: u64,
        result: Result<u32>,
    },
    NotificationMarkedRead {
        session: u64,
        notification_id: String,
        result: Result<Notification>,
    },
    AllNotificationsMarkedRead {
        session: u64,
        result: Result<u32>,
    },
    NotificationDeleted {
        session: u64,
        notification_id: String,
        result: Result<()>,
    },
    Realtime(RealtimeEvent),
    Connection(ConnectionStatus),
}

/// Applies everything queued so far. Returns how many messages were handled.
pub(super) fn process_messages(app: &mut RoadmapApp) -> usize {
    let mut handled = 0;
    while let Ok(message) = app.rx.try_recv() {
        dispatch(app, message);
        handled += 1;
    }
    handled
}

pub(super) fn dispatch(app: &mut RoadmapApp, message: AppMessage) {
    match message {
        AppMessage::ProfileLoaded(result) => app.handle_profile_loaded(result),
        AppMessage::Authenticated { flow, result } => app.handle_authenticated(flow, result),
        AppMessage::ItemsLoaded { generation, result } => {
            app.handle_items_loaded(generation, result)
        }
        AppMessage::VoteMembershipLoaded {
            session,
            checked,
            voted,
        } => app.handle_vote_membership_loaded(session, checked, voted),
        AppMessage::VoteToggled { item_id, result } => app.handle_vote_toggled(item_id, result),
        AppMessage::ItemCreated(result) => app.handle_item_created(result),
        AppMessage::ItemsSeeded {
            kind,
            requested,
            result,
        } => app.handle_items_seeded(kind, requested, result),
        AppMessage::TemplatesLoaded(result) => app.handle_templates_loaded(result),
        AppMessage::ItemUpdated { item_id, result } => app.handle_item_updated(item_id, result),
        AppMessage::ItemDeleted { item_id, result } => app.handle_item_deleted(item_id, result),
        AppMessage::CommentsLoaded { item_id, result } => {
            app.handle_comments_loaded(item_id, result)
        }
        AppMessage::CommentCreated { op, result } => app.handle_comment_created(op, result),
        AppMessage::CommentEdited { op, result } => app.handle_comment_edited(op, result),
        AppMessage::CommentDeleted { op, result } => app.handle_comment_deleted(op, result),
        AppMessage::NotificationsLoaded { session, result } => {
            app.handle_notifications_loaded(session, result)
        }
        AppMessage::UnreadCountLoaded { session, result } => {
            app.handle_unread_count_loaded(session, result)
        }
        AppMessage::NotificationMarkedRead {
            session,
            notification_id,
            result,
        } => app.handle_notification_marked_read(session, notification_id, result),
        AppMessage::AllNotificationsMarkedRead { session, result } => {
            app.handle_all_marked_read(session, result)
        }
        AppMessage::NotificationDeleted {
            session,
            notification_id,
            result,
        } => app.handle_notification_deleted(session, notification_id, result),
        AppMessage::Realtime(event) => {
            // Listeners are removed on logout, but frames already queued may
            // still arrive.
            if app.session.is_none() {
                log::debug!("dropping {:?} event outside a session", event.kind());
                return;
            }
            match event {
                RealtimeEvent::CommentCreated(change) => app.handle_stream_comment_created(change),
                RealtimeEvent::CommentUpdated(change) => app.handle_stream_comment_updated(change),
                RealtimeEvent::CommentDeleted(removed) => app.handle_stream_comment_deleted(removed),
                RealtimeEvent::VoteUpdated(change) => app.handle_stream_vote(change),
                RealtimeEvent::NotificationCreated(notification) => {
                    app.handle_stream_notification(notification)
                }
                RealtimeEvent::NotificationUpdated(change) => {
                    app.handle_stream_notification_update(change)
                }
            }
        }
        AppMessage::Connection(status) => app.handle_connection_status(status),
    }
}

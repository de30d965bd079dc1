use std::collections::HashSet;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use log::{debug, error};

use crate::api::RoadmapApi;
use crate::models::{ItemQuery, ItemUpdate, NewItem, NotificationQuery};

use super::messages::AppMessage;
use super::state::{AuthFlow, SeedKind};

pub(super) type SharedApi = Arc<dyn RoadmapApi>;

/// Page size used by the notification dropdown.
pub(super) const NOTIFICATION_PAGE_SIZE: u32 = 20;

fn deliver(tx: &Sender<AppMessage>, message: AppMessage, label: &str) {
    if tx.send(message).is_err() {
        error!("failed to send {label} message");
    }
}

pub fn load_profile(api: SharedApi, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = api.get_profile();
        deliver(&tx, AppMessage::ProfileLoaded(result), "ProfileLoaded");
    });
}

pub fn login(api: SharedApi, tx: Sender<AppMessage>, email: String, password: String) {
    thread::spawn(move || {
        let result = api.login(&email, &password);
        let message = AppMessage::Authenticated {
            flow: AuthFlow::Login,
            result,
        };
        deliver(&tx, message, "Authenticated");
    });
}

pub fn register(
    api: SharedApi,
    tx: Sender<AppMessage>,
    email: String,
    username: String,
    password: String,
) {
    thread::spawn(move || {
        let result = api.register(&email, &username, &password);
        let message = AppMessage::Authenticated {
            flow: AuthFlow::Register,
            result,
        };
        deliver(&tx, message, "Authenticated");
    });
}

pub fn load_items(api: SharedApi, tx: Sender<AppMessage>, generation: u64, query: ItemQuery) {
    thread::spawn(move || {
        let result = api.list_items(&query);
        deliver(
            &tx,
            AppMessage::ItemsLoaded { generation, result },
            "ItemsLoaded",
        );
    });
}

/// Asks the gateway, one item at a time, whether the user voted. Items whose
/// lookup fails are left out of `checked` so they are retried later.
pub fn load_vote_membership(
    api: SharedApi,
    tx: Sender<AppMessage>,
    session: u64,
    item_ids: Vec<String>,
) {
    thread::spawn(move || {
        let mut checked = Vec::with_capacity(item_ids.len());
        let mut voted = HashSet::new();
        for item_id in item_ids {
            match api.get_vote_status(&item_id) {
                Ok(status) => {
                    if status.has_voted {
                        voted.insert(item_id.clone());
                    }
                    checked.push(item_id);
                }
                Err(err) => debug!("vote status for {item_id} unavailable: {err}"),
            }
        }
        deliver(
            &tx,
            AppMessage::VoteMembershipLoaded {
                session,
                checked,
                voted,
            },
            "VoteMembershipLoaded",
        );
    });
}

pub fn toggle_vote(api: SharedApi, tx: Sender<AppMessage>, item_id: String) {
    thread::spawn(move || {
        let result = api.toggle_vote(&item_id);
        deliver(&tx, AppMessage::VoteToggled { item_id, result }, "VoteToggled");
    });
}

pub fn create_item(api: SharedApi, tx: Sender<AppMessage>, input: NewItem) {
    thread::spawn(move || {
        let result = api.create_item(&input);
        deliver(&tx, AppMessage::ItemCreated(result), "ItemCreated");
    });
}

pub fn create_random_item(api: SharedApi, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = api.create_random_item();
        deliver(&tx, AppMessage::ItemCreated(result), "ItemCreated");
    });
}

pub fn seed_items(api: SharedApi, tx: Sender<AppMessage>, kind: SeedKind, requested: u32) {
    thread::spawn(move || {
        let result = match kind {
            SeedKind::Bulk => api.create_bulk_random(requested),
            SeedKind::Demo => api.create_demo(),
        };
        let message = AppMessage::ItemsSeeded {
            kind,
            requested,
            result,
        };
        deliver(&tx, message, "ItemsSeeded");
    });
}

pub fn load_templates(api: SharedApi, tx: Sender<AppMessage>) {
    thread::spawn(move || {
        let result = api.list_templates();
        deliver(&tx, AppMessage::TemplatesLoaded(result), "TemplatesLoaded");
    });
}

pub fn update_item(api: SharedApi, tx: Sender<AppMessage>, item_id: String, update: ItemUpdate) {
    thread::spawn(move || {
        let result = api.update_item(&item_id, &update);
        deliver(&tx, AppMessage::ItemUpdated { item_id, result }, "ItemUpdated");
    });
}

pub fn delete_item(api: SharedApi, tx: Sender<AppMessage>, item_id: String) {
    thread::spawn(move || {
        let result = api.delete_item(&item_id);
        deliver(&tx, AppMessage::ItemDeleted { item_id, result }, "ItemDeleted");
    });
}

pub fn load_comments(api: SharedApi, tx: Sender<AppMessage>, item_id: String) {
    thread::spawn(move || {
        let result = api.list_comments(&item_id);
        deliver(
            &tx,
            AppMessage::CommentsLoaded { item_id, result },
            "CommentsLoaded",
        );
    });
}

pub fn create_comment(
    api: SharedApi,
    tx: Sender<AppMessage>,
    op: u64,
    item_id: String,
    content: String,
    parent_id: Option<String>,
) {
    thread::spawn(move || {
        let result = api.create_comment(&item_id, &content, parent_id.as_deref());
        deliver(&tx, AppMessage::CommentCreated { op, result }, "CommentCreated");
    });
}

pub fn edit_comment(
    api: SharedApi,
    tx: Sender<AppMessage>,
    op: u64,
    comment_id: String,
    content: String,
) {
    thread::spawn(move || {
        let result = api.update_comment(&comment_id, &content);
        deliver(&tx, AppMessage::CommentEdited { op, result }, "CommentEdited");
    });
}

pub fn delete_comment(api: SharedApi, tx: Sender<AppMessage>, op: u64, comment_id: String) {
    thread::spawn(move || {
        let result = api.delete_comment(&comment_id);
        deliver(&tx, AppMessage::CommentDeleted { op, result }, "CommentDeleted");
    });
}

pub fn load_notifications(api: SharedApi, tx: Sender<AppMessage>, session: u64) {
    thread::spawn(move || {
        let query = NotificationQuery {
            limit: Some(NOTIFICATION_PAGE_SIZE),
            ..NotificationQuery::default()
        };
        let result = api.list_notifications(&query);
        deliver(
            &tx,
            AppMessage::NotificationsLoaded { session, result },
            "NotificationsLoaded",
        );
    });
}

pub fn load_unread_count(api: SharedApi, tx: Sender<AppMessage>, session: u64) {
    thread::spawn(move || {
        let result = api.get_unread_count();
        deliver(
            &tx,
            AppMessage::UnreadCountLoaded { session, result },
            "UnreadCountLoaded",
        );
    });
}

pub fn mark_notification_read(
    api: SharedApi,
    tx: Sender<AppMessage>,
    session: u64,
    notification_id: String,
) {
    thread::spawn(move || {
        let result = api.mark_read(&notification_id);
        let message = AppMessage::NotificationMarkedRead {
            session,
            notification_id,
            result,
        };
        deliver(&tx, message, "NotificationMarkedRead");
    });
}

pub fn mark_all_notifications_read(api: SharedApi, tx: Sender<AppMessage>, session: u64) {
    thread::spawn(move || {
        let result = api.mark_all_read();
        deliver(
            &tx,
            AppMessage::AllNotificationsMarkedRead { session, result },
            "AllNotificationsMarkedRead",
        );
    });
}

pub fn delete_notification(
    api: SharedApi,
    tx: Sender<AppMessage>,
    session: u64,
    notification_id: String,
) {
    thread::spawn(move || {
        let result = api.delete_notification(&notification_id);
        let message = AppMessage::NotificationDeleted {
            session,
            notification_id,
            result,
        };
        deliver(&tx, message, "NotificationDeleted");
    });
}

use log::{debug, warn};

use crate::error::Result;
use crate::models::{Notification, NotificationPage};
use crate::realtime::NotificationChanged;

use super::RoadmapApp;

impl RoadmapApp {
    pub(super) fn handle_notifications_loaded(
        &mut self,
        session: u64,
        result: Result<NotificationPage>,
    ) {
        if !self.is_current_session(session) {
            debug!("dropping notifications from an earlier session");
            return;
        }
        self.notifications.loading = false;
        match result {
            Ok(page) => self.notifications.entries = page.notifications,
            Err(err) => warn!("failed to load notifications: {err}"),
        }
    }

    pub(super) fn handle_unread_count_loaded(&mut self, session: u64, result: Result<u32>) {
        if !self.is_current_session(session) {
            debug!("dropping unread count from an earlier session");
            return;
        }
        match result {
            Ok(count) => self.notifications.unread = count,
            Err(err) => warn!("failed to load unread count: {err}"),
        }
    }

    pub(super) fn handle_notification_marked_read(
        &mut self,
        session: u64,
        notification_id: String,
        result: Result<Notification>,
    ) {
        if !self.is_current_session(session) {
            return;
        }
        match result {
            Ok(_) => {
                if self.notifications.mark_read(&notification_id) {
                    self.notifications.decrement_unread();
                }
            }
            Err(err) => self.notify_error("Failed to mark notification", err.user_message()),
        }
    }

    pub(super) fn handle_all_marked_read(&mut self, session: u64, result: Result<u32>) {
        if !self.is_current_session(session) {
            return;
        }
        match result {
            Ok(updated) => {
                debug!("{updated} notifications marked read");
                for entry in &mut self.notifications.entries {
                    entry.is_read = true;
                }
                self.notifications.unread = 0;
                self.notify("All caught up", "All notifications marked as read.");
            }
            Err(err) => self.notify_error("Failed to mark notifications", err.user_message()),
        }
    }

    pub(super) fn handle_notification_deleted(
        &mut self,
        session: u64,
        notification_id: String,
        result: Result<()>,
    ) {
        if !self.is_current_session(session) {
            return;
        }
        match result {
            Ok(()) => {
                let position = self
                    .notifications
                    .entries
                    .iter()
                    .position(|n| n.id == notification_id);
                if let Some(position) = position {
                    let removed = self.notifications.entries.remove(position);
                    if !removed.is_read {
                        self.notifications.decrement_unread();
                    }
                }
                self.notify("Notification deleted", "The notification has been removed.");
            }
            Err(err) => self.notify_error("Failed to delete notification", err.user_message()),
        }
    }

    pub(super) fn handle_stream_notification(&mut self, notification: Notification) {
        if self
            .notifications
            .entries
            .iter()
            .any(|n| n.id == notification.id)
        {
            return;
        }
        if !notification.is_read {
            self.notifications.unread += 1;
        }
        let title = notification.title.clone();
        let message = notification.message.clone();
        self.notifications.entries.insert(0, notification);
        self.notify(title, message);
    }

    pub(super) fn handle_stream_notification_update(&mut self, change: NotificationChanged) {
        if !change.is_mark_read() {
            debug!("ignoring notification update of type {}", change.kind);
            return;
        }
        let Some(notification_id) = change.notification_id else {
            return;
        };
        if self.notifications.mark_read(&notification_id) {
            self.notifications.decrement_unread();
        }
    }
}

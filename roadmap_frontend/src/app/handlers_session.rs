use log::{debug, error, info, warn};

use crate::error::Result;
use crate::models::User;
use crate::realtime::{ConnectionStatus, RealtimeClient, RealtimeEvent};

use super::messages::AppMessage;
use super::state::{AuthFlow, AuthState, NotificationState, Session};
use super::RoadmapApp;

impl RoadmapApp {
    pub(super) fn handle_profile_loaded(&mut self, result: Result<User>) {
        if self.auth != AuthState::Authenticating {
            debug!("profile arrived after the session attempt was abandoned");
            return;
        }
        match result {
            Ok(user) => {
                info!("restored session for {}", user.username);
                self.start_session(user);
            }
            Err(err) => {
                warn!("stored credential rejected: {err}");
                self.api.logout();
                self.auth = AuthState::Unauthenticated;
            }
        }
    }

    pub(super) fn handle_authenticated(&mut self, flow: AuthFlow, result: Result<User>) {
        if self.auth != AuthState::Authenticating {
            debug!("{flow:?} result arrived after the attempt was abandoned");
            return;
        }
        match result {
            Ok(user) => {
                let title = match flow {
                    AuthFlow::Login => "Welcome back!",
                    AuthFlow::Register => "Account created!",
                };
                let description = format!("Signed in as {}", user.username);
                self.start_session(user);
                self.notify(title, description);
            }
            Err(err) => {
                self.auth = AuthState::Unauthenticated;
                let title = match flow {
                    AuthFlow::Login => "Login failed",
                    AuthFlow::Register => "Registration failed",
                };
                self.notify_error(title, err.user_message());
            }
        }
    }

    /// Opens the real-time channel for `user` and loads their per-session
    /// state.
    fn start_session(&mut self, user: User) {
        let mut realtime = match RealtimeClient::new(
            &self.socket_url,
            self.credentials.clone(),
            self.connector.clone(),
        ) {
            Ok(realtime) => realtime.with_backoff(self.reconnect),
            Err(err) => {
                // The url was validated at construction.
                error!("cannot create real-time client: {err}");
                self.auth = AuthState::Unauthenticated;
                return;
            }
        };
        self.wire_listeners(&realtime);
        realtime.connect();
        self.session = Some(Session { user, realtime });
        self.session_epoch += 1;
        self.auth = AuthState::Authenticated;

        self.load_vote_membership();
        self.load_notifications();
        self.load_unread_count();
    }

    /// Forwards every real-time event into the message channel.
    fn wire_listeners(&self, realtime: &RealtimeClient) {
        let tx = self.tx.clone();
        realtime.on_comment_created(move |change| {
            forward(&tx, AppMessage::Realtime(RealtimeEvent::CommentCreated(change.clone())))
        });
        let tx = self.tx.clone();
        realtime.on_comment_updated(move |change| {
            forward(&tx, AppMessage::Realtime(RealtimeEvent::CommentUpdated(change.clone())))
        });
        let tx = self.tx.clone();
        realtime.on_comment_deleted(move |removed| {
            forward(&tx, AppMessage::Realtime(RealtimeEvent::CommentDeleted(removed.clone())))
        });
        let tx = self.tx.clone();
        realtime.on_vote_updated(move |change| {
            forward(&tx, AppMessage::Realtime(RealtimeEvent::VoteUpdated(change.clone())))
        });
        let tx = self.tx.clone();
        realtime.on_new_notification(move |notification| {
            forward(
                &tx,
                AppMessage::Realtime(RealtimeEvent::NotificationCreated(notification.clone())),
            )
        });
        let tx = self.tx.clone();
        realtime.on_notification_update(move |change| {
            forward(
                &tx,
                AppMessage::Realtime(RealtimeEvent::NotificationUpdated(change.clone())),
            )
        });
        let tx = self.tx.clone();
        realtime.on_status(move |status| forward(&tx, AppMessage::Connection(status.clone())));
    }

    /// Tears down the session and everything scoped to it. Public data (the
    /// item list and loaded comment trees) stays.
    pub(super) fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            info!("ending session for {}", session.user.username);
            session.end();
            self.session_epoch += 1;
        }
        self.auth = AuthState::Unauthenticated;
        self.votes.clear();
        self.vote_checked.clear();
        self.pending_votes.clear();
        self.pending_comments.clear();
        self.panels.clear();
        self.notifications = NotificationState::default();
        for item in &mut self.items {
            item.has_voted = None;
        }
    }

    pub(super) fn handle_connection_status(&mut self, status: ConnectionStatus) {
        let Some(session) = &self.session else {
            return;
        };
        match status {
            ConnectionStatus::Connected => {
                info!("real-time channel up");
                // Joins attempted while connecting were refused.
                for item_id in self.panels.keys() {
                    if let Err(err) = session.realtime.join_item(item_id) {
                        warn!("re-joining room {item_id} failed: {err}");
                    }
                }
            }
            // The client retries on its own; rooms are re-joined above once
            // it is back.
            ConnectionStatus::Disconnected => info!("real-time channel down"),
            ConnectionStatus::Failed(reason) => warn!("real-time channel failed: {reason}"),
        }
    }
}

fn forward(tx: &std::sync::mpsc::Sender<AppMessage>, message: AppMessage) {
    if tx.send(message).is_err() {
        error!("failed to forward real-time message");
    }
}

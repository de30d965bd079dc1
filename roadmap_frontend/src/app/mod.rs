//! View-state coordinator.
//!
//! `RoadmapApp` owns everything the screen shows: the item list and its
//! filters, vote membership, per-item comment trees and panel latches, the
//! notification list and the transient notices. User actions are methods on
//! it; they update state optimistically where that makes sense and spawn a
//! worker thread for the gateway call. Results and real-time events come back
//! as [`AppMessage`]s and are applied by [`RoadmapApp::process_messages`], so
//! all state changes happen on the caller's thread.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

use crate::api::{ApiClient, RoadmapApi};
use crate::config::FrontendConfig;
use crate::credentials::CredentialStore;
use crate::error::RoadmapError;
use crate::models::{Comment, ItemQuery, ItemTemplate, RoadmapItem, User};
use crate::realtime::{socket_endpoint, Backoff, Connector, WsConnector};

mod handlers_comments;
mod handlers_items;
mod handlers_notifications;
mod handlers_session;
mod messages;
mod spawners;
mod state;
mod tasks;


pub use messages::AppMessage;
pub use state::{
    AuthFlow, AuthState, Notice, NoticeLevel, NotificationState, PanelState, SeedKind,
};

use state::{PendingComment, PendingVote, Session};

/// Oldest notices are dropped beyond this many.
const MAX_NOTICES: usize = 20;
/// Upper bound for one bulk seeding request.
pub const MAX_BULK_ITEMS: u32 = 20;
/// Size of the demo set the server creates.
pub const DEMO_ITEM_COUNT: u32 = 5;

pub struct RoadmapApp {
    api: Arc<dyn RoadmapApi>,
    credentials: CredentialStore,
    connector: Arc<dyn Connector>,
    socket_url: String,
    notice_ttl: Duration,
    tx: Sender<AppMessage>,
    rx: Receiver<AppMessage>,

    auth: AuthState,
    session: Option<Session>,
    /// Bumped when a session starts or ends; results tagged with an older
    /// value are dropped.
    session_epoch: u64,
    reconnect: Backoff,

    items: Vec<RoadmapItem>,
    items_loading: bool,
    items_error: Option<String>,
    /// Bumped per listing request; only the newest response is applied.
    items_generation: u64,
    query: ItemQuery,
    /// A bulk or demo seeding request is running.
    seeding: bool,
    templates: Vec<ItemTemplate>,

    votes: HashSet<String>,
    /// Items whose membership is known for the current session.
    vote_checked: HashSet<String>,
    pending_votes: HashMap<String, PendingVote>,

    comments: HashMap<String, Vec<Comment>>,
    panels: HashMap<String, PanelState>,
    comments_loading: HashSet<String>,
    pending_comments: HashMap<u64, PendingComment>,
    next_op: u64,

    notifications: NotificationState,
    notices: VecDeque<Notice>,
}

impl RoadmapApp {
    /// Wires the HTTP gateway and websocket connector described by `config`.
    pub fn new(config: &FrontendConfig) -> anyhow::Result<Self> {
        let credentials = match &config.token_path {
            Some(path) => CredentialStore::open(path.clone())
                .with_context(|| format!("failed to read credential at {}", path.display()))?,
            None => CredentialStore::in_memory(),
        };
        let api = ApiClient::with_timeout(
            config.api_url.clone(),
            credentials.clone(),
            config.http_timeout,
        )?;
        Self::with_backend(
            Arc::new(api),
            credentials,
            Arc::new(WsConnector::default()),
            config,
        )
    }

    /// Builds a coordinator over caller-provided seams. `credentials` must be
    /// the store `api` reads its bearer token from.
    pub fn with_backend(
        api: Arc<dyn RoadmapApi>,
        credentials: CredentialStore,
        connector: Arc<dyn Connector>,
        config: &FrontendConfig,
    ) -> anyhow::Result<Self> {
        socket_endpoint(&config.socket_url).context("invalid socket url")?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            api,
            credentials,
            connector,
            socket_url: config.socket_url.clone(),
            notice_ttl: config.notice_ttl,
            tx,
            rx,
            auth: AuthState::default(),
            session: None,
            session_epoch: 0,
            reconnect: Backoff::from_initial(config.reconnect_delay),
            items: Vec::new(),
            items_loading: false,
            items_error: None,
            items_generation: 0,
            query: ItemQuery::default(),
            seeding: false,
            templates: Vec::new(),
            votes: HashSet::new(),
            vote_checked: HashSet::new(),
            pending_votes: HashMap::new(),
            comments: HashMap::new(),
            panels: HashMap::new(),
            comments_loading: HashSet::new(),
            pending_comments: HashMap::new(),
            next_op: 0,
            notifications: NotificationState::default(),
            notices: VecDeque::new(),
        })
    }

    /// Applies every queued result and event. Returns how many were handled.
    pub fn process_messages(&mut self) -> usize {
        messages::process_messages(self)
    }

    /// Blocks up to `timeout` for the next message, then drains the queue.
    /// Returns `false` if nothing arrived.
    pub fn wait_for_message(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => {
                messages::dispatch(self, message);
                self.process_messages();
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            // The coordinator holds a sender itself, so this cannot happen.
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth == AuthState::Authenticated && self.session.is_some()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn is_realtime_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.realtime.is_connected())
    }

    pub fn items(&self) -> &[RoadmapItem] {
        &self.items
    }

    pub fn item(&self, item_id: &str) -> Option<&RoadmapItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn items_loading(&self) -> bool {
        self.items_loading
    }

    pub fn items_error(&self) -> Option<&str> {
        self.items_error.as_deref()
    }

    pub fn query(&self) -> &ItemQuery {
        &self.query
    }

    pub fn is_seeding(&self) -> bool {
        self.seeding
    }

    pub fn templates(&self) -> &[ItemTemplate] {
        &self.templates
    }

    pub fn has_voted(&self, item_id: &str) -> bool {
        self.votes.contains(item_id)
    }

    pub fn voted_items(&self) -> &HashSet<String> {
        &self.votes
    }

    pub fn is_vote_pending(&self, item_id: &str) -> bool {
        self.pending_votes.contains_key(item_id)
    }

    pub fn comments(&self, item_id: &str) -> Option<&[Comment]> {
        self.comments.get(item_id).map(Vec::as_slice)
    }

    pub fn panel_state(&self, item_id: &str) -> Option<PanelState> {
        self.panels.get(item_id).copied()
    }

    pub fn notifications(&self) -> &NotificationState {
        &self.notifications
    }

    pub fn unread_count(&self) -> u32 {
        self.notifications.unread
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn dismiss_notice(&mut self, notice_id: Uuid) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != notice_id);
        self.notices.len() != before
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Drops notices older than the configured lifetime.
    pub fn prune_notices(&mut self, now: DateTime<Utc>) {
        let ttl = self.notice_ttl;
        // A notice stamped after `now` has a negative age and is kept.
        self.notices.retain(|notice| {
            now.signed_duration_since(notice.created_at)
                .to_std()
                .map_or(true, |age| age < ttl)
        });
    }

    fn notify(&mut self, title: impl Into<String>, description: impl Into<String>) {
        self.push_notice(Notice::new(NoticeLevel::Info, title, description));
    }

    fn notify_error(&mut self, title: impl Into<String>, description: impl Into<String>) {
        self.push_notice(Notice::new(NoticeLevel::Error, title, description));
    }

    fn push_notice(&mut self, notice: Notice) {
        info!("notice: {} ({})", notice.title, notice.description);
        self.notices.push_back(notice);
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    /// Raises the standard notice for actions that need a session. Returns
    /// `true` when the caller may proceed.
    fn require_session(&mut self, action: &str) -> bool {
        if self.is_authenticated() {
            return true;
        }
        let err = RoadmapError::AuthRequired {
            action: action.to_string(),
        };
        debug!("refused: {err}");
        self.notify_error("Authentication required", err.user_message());
        false
    }

    /// Leaves an item's room. Not being connected is fine: the server drops
    /// room membership with the socket.
    fn leave_room(&self, item_id: &str) {
        if let Some(session) = &self.session {
            if let Err(err) = session.realtime.leave_item(item_id) {
                debug!("leave {item_id} skipped: {err}");
            }
        }
    }

    fn is_current_session(&self, epoch: u64) -> bool {
        self.session.is_some() && epoch == self.session_epoch
    }

    fn next_op(&mut self) -> u64 {
        self.next_op += 1;
        self.next_op
    }

    fn item_mut(&mut self, item_id: &str) -> Option<&mut RoadmapItem> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }
}

//! Real-time event client.
//!
//! One background thread owns the socket for the lifetime of a connection.
//! It performs the Socket.IO handshake with the stored bearer token, answers
//! pings, writes queued emits and hands decoded events to the registered
//! listeners. Listeners run on that thread; the coordinator's listeners only
//! forward into its message channel.

pub mod events;
pub mod protocol;
pub mod transport;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use reqwest::Url;
use serde_json::{json, Value};

use crate::credentials::CredentialStore;
use crate::error::{Result, RoadmapError};
use crate::models::Notification;

pub use events::{
    CommentChanged, CommentRemoved, ConnectionStatus, EventKind, NotificationChanged,
    RealtimeEvent, VoteChanged,
};
use protocol::Packet;
pub use transport::{socket_endpoint, Connector, Transport, WsConnector};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type Listener = Box<dyn Fn(&RealtimeEvent) + Send>;
type StatusListener = Box<dyn Fn(&ConnectionStatus) + Send>;

#[derive(Default)]
struct Listeners {
    events: HashMap<EventKind, Vec<Listener>>,
    status: Vec<StatusListener>,
}

#[derive(Default)]
struct Shared {
    connected: AtomicBool,
    listeners: Mutex<Listeners>,
}

impl Shared {
    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, event: &RealtimeEvent) {
        let listeners = self.listeners();
        if let Some(callbacks) = listeners.events.get(&event.kind()) {
            for callback in callbacks {
                callback(event);
            }
        }
    }

    fn report(&self, status: ConnectionStatus) {
        for callback in &self.listeners().status {
            callback(&status);
        }
    }
}

enum Command {
    Emit(String),
    Shutdown,
}

struct Connection {
    commands: Sender<Command>,
    worker: JoinHandle<()>,
}

/// Delay between reconnect attempts: starts at `initial`, doubles per failed
/// attempt and never exceeds `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn from_initial(initial: Duration) -> Self {
        Self {
            initial,
            max: initial * 5,
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_initial(Duration::from_secs(1))
    }
}

pub struct RealtimeClient {
    endpoint: Url,
    credentials: CredentialStore,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    backoff: Backoff,
    connection: Option<Connection>,
}

impl RealtimeClient {
    pub fn new(
        socket_url: &str,
        credentials: CredentialStore,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        Ok(Self {
            endpoint: socket_endpoint(socket_url)?,
            credentials,
            connector,
            shared: Arc::default(),
            backoff: Backoff::default(),
            connection: None,
        })
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Starts the connection thread. A no-op while a connection exists or an
    /// attempt is still in flight. The thread reconnects on its own after a
    /// lost connection until `disconnect` or a server-side close.
    pub fn connect(&mut self) {
        if let Some(connection) = &self.connection {
            if !connection.worker.is_finished() {
                debug!("real-time connect ignored: connection already active");
                return;
            }
        }
        let (commands, inbox) = mpsc::channel();
        let endpoint = self.endpoint.clone();
        let credentials = self.credentials.clone();
        let connector = Arc::clone(&self.connector);
        let shared = Arc::clone(&self.shared);
        let backoff = self.backoff;
        info!(
            "connecting to {endpoint} (token: {})",
            credentials.token().is_some()
        );
        let worker = thread::spawn(move || {
            supervise(
                connector.as_ref(),
                &endpoint,
                &credentials,
                &inbox,
                &shared,
                backoff,
            );
        });
        self.connection = Some(Connection { commands, worker });
    }

    /// Tears the connection down. Registered listeners are kept.
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            info!("disconnecting real-time channel");
            let _ = connection.commands.send(Command::Shutdown);
            self.shared.connected.store(false, Ordering::SeqCst);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some() && self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn join_item(&self, item_id: &str) -> Result<()> {
        debug!("joining item room {item_id}");
        self.emit("join_item", json!(item_id))
    }

    pub fn leave_item(&self, item_id: &str) -> Result<()> {
        debug!("leaving item room {item_id}");
        self.emit("leave_item", json!(item_id))
    }

    fn emit(&self, name: &str, data: Value) -> Result<()> {
        let connection = self.connection.as_ref().ok_or(RoadmapError::NotConnected)?;
        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(RoadmapError::NotConnected);
        }
        let frame = protocol::encode(&Packet::Event {
            name: name.to_string(),
            data,
        });
        connection
            .commands
            .send(Command::Emit(frame))
            .map_err(|_| RoadmapError::NotConnected)
    }

    fn on(&self, kind: EventKind, listener: Listener) {
        self.shared
            .listeners()
            .events
            .entry(kind)
            .or_default()
            .push(listener);
    }

    pub fn on_comment_created(&self, callback: impl Fn(&CommentChanged) + Send + 'static) {
        self.on(
            EventKind::CommentCreated,
            Box::new(move |event| {
                if let RealtimeEvent::CommentCreated(payload) = event {
                    callback(payload);
                }
            }),
        );
    }

    pub fn on_comment_updated(&self, callback: impl Fn(&CommentChanged) + Send + 'static) {
        self.on(
            EventKind::CommentUpdated,
            Box::new(move |event| {
                if let RealtimeEvent::CommentUpdated(payload) = event {
                    callback(payload);
                }
            }),
        );
    }

    pub fn on_comment_deleted(&self, callback: impl Fn(&CommentRemoved) + Send + 'static) {
        self.on(
            EventKind::CommentDeleted,
            Box::new(move |event| {
                if let RealtimeEvent::CommentDeleted(payload) = event {
                    callback(payload);
                }
            }),
        );
    }

    pub fn on_vote_updated(&self, callback: impl Fn(&VoteChanged) + Send + 'static) {
        self.on(
            EventKind::VoteUpdated,
            Box::new(move |event| {
                if let RealtimeEvent::VoteUpdated(payload) = event {
                    callback(payload);
                }
            }),
        );
    }

    pub fn on_new_notification(&self, callback: impl Fn(&Notification) + Send + 'static) {
        self.on(
            EventKind::NotificationCreated,
            Box::new(move |event| {
                if let RealtimeEvent::NotificationCreated(payload) = event {
                    callback(payload);
                }
            }),
        );
    }

    pub fn on_notification_update(
        &self,
        callback: impl Fn(&NotificationChanged) + Send + 'static,
    ) {
        self.on(
            EventKind::NotificationUpdated,
            Box::new(move |event| {
                if let RealtimeEvent::NotificationUpdated(payload) = event {
                    callback(payload);
                }
            }),
        );
    }

    pub fn on_status(&self, callback: impl Fn(&ConnectionStatus) + Send + 'static) {
        self.shared.listeners().status.push(Box::new(callback));
    }

    /// Drops the listeners of all six event categories. Status listeners stay.
    pub fn off_all_listeners(&self) {
        self.shared.listeners().events.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners().events.values().map(Vec::len).sum()
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Why a connection attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ended {
    /// The client asked to stop or was dropped.
    Stopped,
    /// The server refused or ended the socket session. Not retried.
    ServerClosed,
    Lost { was_connected: bool },
}

/// Runs connection attempts until the client stops or the server ends the
/// session, sleeping `backoff` between lost attempts.
fn supervise(
    connector: &dyn Connector,
    endpoint: &Url,
    credentials: &CredentialStore,
    inbox: &Receiver<Command>,
    shared: &Shared,
    backoff: Backoff,
) {
    let mut delay = backoff.initial;
    loop {
        let ended = run_connection(connector, endpoint, credentials.token(), inbox, shared);
        shared.connected.store(false, Ordering::SeqCst);
        shared.report(ConnectionStatus::Disconnected);
        match ended {
            Ended::Stopped => return,
            Ended::ServerClosed => {
                info!("server ended the real-time session; not reconnecting");
                return;
            }
            Ended::Lost { was_connected } => {
                if was_connected {
                    delay = backoff.initial;
                }
                info!("reconnecting to {endpoint} in {delay:?}");
                if !wait_for_retry(inbox, delay) {
                    return;
                }
                delay = (delay * 2).min(backoff.max);
            }
        }
    }
}

/// Sleeps out a reconnect delay. False once the client asked to stop.
fn wait_for_retry(inbox: &Receiver<Command>, delay: Duration) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        match inbox.recv_timeout(remaining) {
            Ok(Command::Emit(_)) => debug!("dropping emit while reconnecting"),
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => return false,
            Err(RecvTimeoutError::Timeout) => return true,
        }
    }
}

fn run_connection(
    connector: &dyn Connector,
    endpoint: &Url,
    token: Option<String>,
    inbox: &Receiver<Command>,
    shared: &Shared,
) -> Ended {
    let mut transport = match connector.open(endpoint) {
        Ok(transport) => transport,
        Err(err) => {
            error!("real-time connection to {endpoint} failed: {err}");
            shared.report(ConnectionStatus::Failed(err.to_string()));
            return Ended::Lost {
                was_connected: false,
            };
        }
    };
    let ping_window = match handshake(transport.as_mut(), token, inbox, shared) {
        Ok(window) => window,
        Err(ended) => {
            transport.close();
            return ended;
        }
    };

    let lost = Ended::Lost {
        was_connected: true,
    };
    let mut last_ping = Instant::now();
    let ended = loop {
        match inbox.try_recv() {
            Ok(Command::Emit(frame)) => {
                if let Err(err) = transport.send_text(&frame) {
                    warn!("failed to emit on real-time channel: {err}");
                    break lost;
                }
                continue;
            }
            Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => {
                let _ = transport.send_text(&protocol::encode(&Packet::Disconnect));
                break Ended::Stopped;
            }
            Err(TryRecvError::Empty) => {}
        }

        if let Some(window) = ping_window {
            if last_ping.elapsed() > window {
                warn!("no ping from the server within {window:?}");
                break lost;
            }
        }

        let frame = match transport.poll_text() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => {
                warn!("real-time channel dropped: {err}");
                break lost;
            }
        };
        match protocol::decode(&frame) {
            Ok(Packet::Ping) => {
                last_ping = Instant::now();
                if let Err(err) = transport.send_text(&protocol::encode(&Packet::Pong)) {
                    warn!("failed to answer ping: {err}");
                    break lost;
                }
            }
            Ok(Packet::Event { name, data }) => match RealtimeEvent::from_wire(&name, data) {
                Ok(Some(event)) => shared.dispatch(&event),
                Ok(None) => debug!("ignoring real-time event {name}"),
                Err(err) => warn!("malformed {name} payload: {err}"),
            },
            Ok(Packet::Disconnect) => {
                info!("server disconnected the real-time socket");
                break Ended::ServerClosed;
            }
            Ok(Packet::Close) => {
                info!("server closed the real-time transport");
                break lost;
            }
            Ok(other) => debug!("ignoring packet {other:?}"),
            Err(err) => warn!("undecodable frame {frame:?}: {err}"),
        }
    };
    transport.close();
    ended
}

/// Waits for the Engine.IO open, sends the auth connect and waits for the
/// server's acknowledgement. Returns how long the server may stay silent
/// between pings.
fn handshake(
    transport: &mut dyn Transport,
    token: Option<String>,
    inbox: &Receiver<Command>,
    shared: &Shared,
) -> std::result::Result<Option<Duration>, Ended> {
    let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
    let mut opened = false;
    let mut ping_window = None;
    while Instant::now() < deadline {
        if let Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) = inbox.try_recv() {
            return Err(Ended::Stopped);
        }
        let frame = match transport.poll_text() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => return Err(handshake_lost(shared, err)),
        };
        let packet = protocol::decode(&frame).map_err(|err| handshake_lost(shared, err))?;
        match packet {
            Packet::Open(handshake) => {
                debug!("engine session {} open", handshake.sid);
                opened = true;
                let window = handshake.ping_interval + handshake.ping_timeout;
                ping_window = (window > 0).then(|| Duration::from_millis(window));
                let auth = json!({ "token": token });
                transport
                    .send_text(&protocol::encode(&Packet::Connect(Some(auth))))
                    .map_err(|err| handshake_lost(shared, err))?;
            }
            Packet::Ping => transport
                .send_text(&protocol::encode(&Packet::Pong))
                .map_err(|err| handshake_lost(shared, err))?,
            Packet::Connect(_) if opened => {
                shared.connected.store(true, Ordering::SeqCst);
                info!("real-time channel connected");
                shared.report(ConnectionStatus::Connected);
                return Ok(ping_window);
            }
            Packet::ConnectError(message) => {
                let err = RoadmapError::Transport(message);
                warn!("real-time handshake rejected: {err}");
                shared.report(ConnectionStatus::Failed(err.to_string()));
                return Err(Ended::ServerClosed);
            }
            other => debug!("ignoring {other:?} during handshake"),
        }
    }
    Err(handshake_lost(
        shared,
        RoadmapError::Transport("handshake timed out".into()),
    ))
}

fn handshake_lost(shared: &Shared, err: RoadmapError) -> Ended {
    warn!("real-time handshake failed: {err}");
    shared.report(ConnectionStatus::Failed(err.to_string()));
    Ended::Lost {
        was_connected: false,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport for exercising the client without a server.

    use super::*;

    pub struct MemoryTransport {
        incoming: Receiver<String>,
        outgoing: Sender<String>,
    }

    impl Transport for MemoryTransport {
        fn send_text(&mut self, frame: &str) -> Result<()> {
            self.outgoing
                .send(frame.to_string())
                .map_err(|_| RoadmapError::Transport("peer gone".into()))
        }

        fn poll_text(&mut self) -> Result<Option<String>> {
            match self.incoming.recv_timeout(Duration::from_millis(10)) {
                Ok(frame) => Ok(Some(frame)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    Err(RoadmapError::Transport("peer gone".into()))
                }
            }
        }

        fn close(&mut self) {}
    }

    /// Server side of one in-memory connection.
    pub struct ServerEnd {
        pub to_client: Sender<String>,
        pub from_client: Receiver<String>,
    }

    impl ServerEnd {
        pub fn expect_frame(&self) -> String {
            self.from_client
                .recv_timeout(Duration::from_secs(2))
                .expect("client frame")
        }

        pub fn send(&self, frame: &str) {
            self.to_client.send(frame.to_string()).expect("client alive");
        }

        /// Plays the server half of the handshake and returns the auth frame.
        pub fn accept(&self) -> String {
            self.send(r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#);
            let auth = self.expect_frame();
            self.send(r#"40{"sid":"socket-1"}"#);
            auth
        }

        pub fn emit(&self, name: &str, data: Value) {
            self.send(&protocol::encode(&Packet::Event {
                name: name.to_string(),
                data,
            }));
        }
    }

    #[derive(Default)]
    pub struct MemoryConnector {
        opened: Mutex<Vec<ServerEnd>>,
        refuse: AtomicBool,
    }

    impl MemoryConnector {
        pub fn refusing() -> Self {
            let connector = Self::default();
            connector.refuse.store(true, Ordering::SeqCst);
            connector
        }

        /// Waits for the client to open a connection and returns its server end.
        pub fn next_server(&self) -> ServerEnd {
            let deadline = Instant::now() + Duration::from_secs(2);
            loop {
                if let Some(end) = self.opened.lock().expect("lock").pop() {
                    return end;
                }
                assert!(Instant::now() < deadline, "client never connected");
                thread::sleep(Duration::from_millis(5));
            }
        }

        pub fn open_count(&self) -> usize {
            self.opened.lock().expect("lock").len()
        }
    }

    impl Connector for MemoryConnector {
        fn open(&self, _url: &Url) -> Result<Box<dyn Transport>> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(RoadmapError::Transport("connection refused".into()));
            }
            let (to_client, incoming) = mpsc::channel();
            let (outgoing, from_client) = mpsc::channel();
            self.opened.lock().expect("lock").push(ServerEnd {
                to_client,
                from_client,
            });
            Ok(Box::new(MemoryTransport { incoming, outgoing }))
        }
    }

    pub fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(5));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{wait_until, MemoryConnector};
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn client(connector: &Arc<MemoryConnector>, token: Option<&str>) -> RealtimeClient {
        let credentials = CredentialStore::in_memory();
        if let Some(token) = token {
            credentials.store(token).expect("store token");
        }
        let connector: Arc<dyn Connector> = connector.clone();
        RealtimeClient::new("http://localhost:5000", credentials, connector).expect("client")
    }

    #[test]
    fn handshake_sends_token_and_marks_connected() {
        let connector = Arc::new(MemoryConnector::default());
        let mut client = client(&connector, Some("secret"));
        client.connect();
        let server = connector.next_server();
        let auth = server.accept();
        assert_eq!(auth, r#"40{"token":"secret"}"#);
        wait_until(|| client.is_connected());
    }

    #[test]
    fn connect_is_idempotent_while_active() {
        let connector = Arc::new(MemoryConnector::default());
        let mut client = client(&connector, None);
        client.connect();
        client.connect();
        let _server = connector.next_server();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(connector.open_count(), 0);
    }

    #[test]
    fn join_while_disconnected_is_an_error() {
        let connector = Arc::new(MemoryConnector::default());
        let client = client(&connector, None);
        assert!(matches!(
            client.join_item("abc"),
            Err(RoadmapError::NotConnected)
        ));
    }

    #[test]
    fn rooms_and_pings_go_over_the_wire() {
        let connector = Arc::new(MemoryConnector::default());
        let mut client = client(&connector, None);
        client.connect();
        let server = connector.next_server();
        server.accept();
        wait_until(|| client.is_connected());

        client.join_item("abc123").expect("join");
        assert_eq!(server.expect_frame(), r#"42["join_item","abc123"]"#);
        server.send("2");
        assert_eq!(server.expect_frame(), "3");
        client.leave_item("abc123").expect("leave");
        assert_eq!(server.expect_frame(), r#"42["leave_item","abc123"]"#);

        client.disconnect();
        assert_eq!(server.expect_frame(), "41");
        assert!(!client.is_connected());
    }

    #[test]
    fn events_reach_typed_listeners_until_removed() {
        let connector = Arc::new(MemoryConnector::default());
        let mut client = client(&connector, None);
        let votes = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&votes);
        client.on_vote_updated(move |change| {
            assert_eq!(change.item_id, "abc123");
            seen.fetch_add(1, Ordering::SeqCst);
        });
        client.on_comment_deleted(|_| panic!("no comment events expected"));
        assert_eq!(client.listener_count(), 2);

        client.connect();
        let server = connector.next_server();
        server.accept();
        wait_until(|| client.is_connected());

        let vote = serde_json::json!({
            "itemId": "abc123", "voteCount": 3, "userId": "u9", "action": "removed"
        });
        server.emit("vote_updated", vote.clone());
        wait_until(|| votes.load(Ordering::SeqCst) == 1);

        client.off_all_listeners();
        assert_eq!(client.listener_count(), 0);
        server.emit("vote_updated", vote);
        server.emit("comment_deleted", serde_json::json!({ "itemId": "x", "commentId": "y" }));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(votes.load(Ordering::SeqCst), 1);
    }

    fn fast(client: RealtimeClient) -> RealtimeClient {
        client.with_backoff(Backoff::from_initial(Duration::from_millis(20)))
    }

    fn record_statuses(client: &RealtimeClient) -> Arc<Mutex<Vec<ConnectionStatus>>> {
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        client.on_status(move |status| sink.lock().expect("lock").push(status.clone()));
        statuses
    }

    #[test]
    fn refused_connection_reports_failure_and_retries() {
        let connector = Arc::new(MemoryConnector::refusing());
        let mut client = fast(client(&connector, None));
        let statuses = record_statuses(&client);
        client.connect();
        wait_until(|| statuses.lock().expect("lock").len() >= 4);
        let seen = statuses.lock().expect("lock")[..4].to_vec();
        assert!(matches!(seen[0], ConnectionStatus::Failed(_)));
        assert_eq!(seen[1], ConnectionStatus::Disconnected);
        assert!(matches!(seen[2], ConnectionStatus::Failed(_)));
        assert_eq!(seen[3], ConnectionStatus::Disconnected);
        assert!(!client.is_connected());
    }

    #[test]
    fn lost_connection_is_reopened() {
        let connector = Arc::new(MemoryConnector::default());
        let mut client = fast(client(&connector, Some("secret")));
        client.connect();
        let server = connector.next_server();
        server.accept();
        wait_until(|| client.is_connected());

        drop(server);
        let server = connector.next_server();
        assert_eq!(server.accept(), r#"40{"token":"secret"}"#);
        wait_until(|| client.is_connected());
        client.join_item("abc123").expect("join after reconnect");
        assert_eq!(server.expect_frame(), r#"42["join_item","abc123"]"#);
    }

    #[test]
    fn silent_server_is_dropped_after_ping_window() {
        let connector = Arc::new(MemoryConnector::default());
        let mut client = fast(client(&connector, None));
        let statuses = record_statuses(&client);
        client.connect();
        let server = connector.next_server();
        server.send(r#"0{"sid":"s1","upgrades":[],"pingInterval":30,"pingTimeout":30}"#);
        let _auth = server.expect_frame();
        server.send("40");
        wait_until(|| statuses.lock().expect("lock").len() >= 2);
        assert_eq!(
            statuses.lock().expect("lock")[..2].to_vec(),
            vec![ConnectionStatus::Connected, ConnectionStatus::Disconnected]
        );
        // The first server end is still alive, so this is a fresh attempt.
        let _again = connector.next_server();
    }

    #[test]
    fn server_disconnect_is_not_retried() {
        let connector = Arc::new(MemoryConnector::default());
        let mut client = fast(client(&connector, None));
        let statuses = record_statuses(&client);
        client.connect();
        let server = connector.next_server();
        server.accept();
        wait_until(|| client.is_connected());

        server.send("41");
        wait_until(|| !client.is_connected());
        thread::sleep(Duration::from_millis(100));
        assert_eq!(connector.open_count(), 0);
        assert_eq!(
            statuses.lock().expect("lock").last(),
            Some(&ConnectionStatus::Disconnected)
        );
    }

    #[test]
    fn server_connect_error_fails_handshake() {
        let connector = Arc::new(MemoryConnector::default());
        let mut client = client(&connector, Some("expired"));
        let failed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&failed);
        client.on_status(move |status| {
            if let ConnectionStatus::Failed(reason) = status {
                assert_eq!(reason, "transport error: Authentication error");
                flag.store(true, Ordering::SeqCst);
            }
        });
        client.connect();
        let server = connector.next_server();
        server.send(r#"0{"sid":"s1","pingInterval":25000,"pingTimeout":20000}"#);
        let _auth = server.expect_frame();
        server.send(r#"44{"message":"Authentication error"}"#);
        wait_until(|| failed.load(Ordering::SeqCst));
        assert!(!client.is_connected());
    }
}

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use log::debug;
use reqwest::Url;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::error::{Result, RoadmapError};

/// A bidirectional text-frame pipe owned by the connection thread.
pub trait Transport: Send {
    fn send_text(&mut self, frame: &str) -> Result<()>;
    /// Waits briefly for the next frame. `Ok(None)` means nothing arrived yet.
    fn poll_text(&mut self) -> Result<Option<String>>;
    fn close(&mut self);
}

pub trait Connector: Send + Sync {
    fn open(&self, url: &Url) -> Result<Box<dyn Transport>>;
}

/// Maps the socket server's http(s) base onto the Engine.IO websocket
/// endpoint.
pub fn socket_endpoint(base: &str) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|err| RoadmapError::Transport(format!("invalid socket url {base}: {err}")))?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|_| RoadmapError::Transport(format!("cannot use {scheme} for {base}")))?;
    let path = format!("{}/socket.io/", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct WsConnector {
    pub poll_interval: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
        }
    }
}

impl Connector for WsConnector {
    fn open(&self, url: &Url) -> Result<Box<dyn Transport>> {
        let host = url
            .host_str()
            .ok_or_else(|| RoadmapError::Transport(format!("{url} has no host")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| RoadmapError::Transport(format!("{url} has no port")))?;
        let stream = TcpStream::connect((host, port))?;
        let (mut socket, _response) = tungstenite::client_tls(url.as_str(), stream)
            .map_err(|err| RoadmapError::Transport(format!("websocket handshake failed: {err}")))?;
        // Reads must time out so the connection thread can service emits.
        set_read_timeout(&mut socket, self.poll_interval)?;
        debug!("websocket open to {url}");
        Ok(Box::new(WsTransport { socket }))
    }
}

fn set_read_timeout(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    timeout: Duration,
) -> Result<()> {
    match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout))?,
        MaybeTlsStream::Rustls(stream) => stream.get_ref().set_read_timeout(Some(timeout))?,
        _ => {}
    }
    Ok(())
}

struct WsTransport {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl Transport for WsTransport {
    fn send_text(&mut self, frame: &str) -> Result<()> {
        self.socket
            .send(Message::Text(frame.to_string()))
            .map_err(|err| RoadmapError::Transport(err.to_string()))
    }

    fn poll_text(&mut self) -> Result<Option<String>> {
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(Some(text)),
            Ok(Message::Close(_)) => Err(RoadmapError::Transport("closed by server".into())),
            // Pings are answered by tungstenite; binary frames are unused.
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(err) => Err(RoadmapError::Transport(err.to_string())),
        }
    }

    fn close(&mut self) {
        let _ = self.socket.close(None);
        let _ = self.socket.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_switches_scheme_and_adds_query() {
        let url = socket_endpoint("http://localhost:5000").expect("url");
        assert_eq!(
            url.as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
        let url = socket_endpoint("https://roadmap.example.com/rt/").expect("url");
        assert_eq!(
            url.as_str(),
            "wss://roadmap.example.com/rt/socket.io/?EIO=4&transport=websocket"
        );
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RoadmapError>;

#[derive(Error, Debug)]
pub enum RoadmapError {
    /// Non-success gateway response. `message` is whatever the server put in
    /// its error body.
    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    /// A signed-in action was attempted without a session.
    #[error("login required to {action}")]
    AuthRequired { action: String },

    #[error("{0}")]
    ValidationFailed(String),

    #[error("real-time connection is not established")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RoadmapError {
    pub fn validation(message: impl Into<String>) -> Self {
        RoadmapError::ValidationFailed(message.into())
    }

    /// Message suitable for a user-facing notice.
    pub fn user_message(&self) -> String {
        match self {
            RoadmapError::RequestFailed { message, .. } => message.clone(),
            RoadmapError::ValidationFailed(message) => message.clone(),
            RoadmapError::AuthRequired { action } => format!("Please log in to {action}."),
            _ => "Something went wrong".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_hide_internal_detail() {
        let auth = RoadmapError::AuthRequired {
            action: "comment".into(),
        };
        assert_eq!(auth.user_message(), "Please log in to comment.");
        assert_eq!(auth.to_string(), "login required to comment");
        assert_eq!(
            RoadmapError::Transport("reset by peer".into()).user_message(),
            "Something went wrong"
        );
    }
}

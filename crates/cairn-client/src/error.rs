use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Only one local send may be outstanding at a time.
    #[error("a message is already being sent")]
    SendInFlight,

    #[error("not logged in")]
    NotAuthenticated,

    #[error("server answered {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("gateway closed during handshake")]
    Handshake,

    #[error("malformed gateway frame: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(e))
    }
}

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the library.
#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced a response (DNS, connection, timeout).
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The reqwest client could not be constructed from the given options.
    #[error("could not start up the client")]
    ClientFormation(#[source] reqwest::Error),

    /// The server answered with a status the endpoint does not define.
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(StatusCode),

    /// The board is not present in the board listing.
    #[error("board /{0}/ does not exist")]
    BoardNotFound(String),

    /// The thread returned 404.
    #[error("thread {id} on /{board}/ does not exist")]
    ThreadNotFound {
        /// Board the thread was requested from.
        board: String,
        /// Requested thread ID.
        id: u64,
    },

    /// The response was not shaped like the API promises.
    #[error("unexpected response shape: {0}")]
    Schema(String),

    /// A response body failed to decode.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if the error happened below the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

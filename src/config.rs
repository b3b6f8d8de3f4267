use std::time::Duration;

/// The domain hosting the API, the HTML mirror and the media host.
pub const DEFAULT_DOMAIN: &str = "8ch.net";

/// Which site to talk to and over which protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    domain: String,
    https: bool,
}

impl Site {
    /// The default site over `https` or plain `http`.
    pub fn new(https: bool) -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            https,
        }
    }

    /// A vichan-compatible site on another domain.
    pub fn with_domain(domain: impl Into<String>, https: bool) -> Self {
        Self {
            domain: domain.into(),
            https,
        }
    }

    /// Returns the site domain without protocol.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns true if requests go over `https`.
    pub fn https(&self) -> bool {
        self.https
    }

    pub(crate) fn protocol(&self) -> &'static str {
        if self.https {
            "https://"
        } else {
            "http://"
        }
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Options for the reqwest-backed [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Sent as `User-Agent` with every request.
    pub user_agent: String,
    /// Whole-request timeout. `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user_agent: format!("dot8ch/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
        }
    }
}

use std::fmt::Debug;

use crate::{config::ClientOptions, error::Error, result::Result};
use async_trait::async_trait;
use reqwest::{
    header::{IF_MODIFIED_SINCE, LAST_MODIFIED, USER_AGENT},
    Client as ReqwestClient, StatusCode,
};
use serde::Deserialize;

/// The HTTP seam every board and thread request goes through.
///
/// [`Client`] is the real implementation. Anything else that can answer a
/// `GET` and a `HEAD` (a recording stub in tests, a caching proxy) can stand in
/// for it.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Issues a `GET`, attaching `If-Modified-Since` when a precondition is given.
    ///
    /// # Errors
    ///
    /// Any status is a successful reply; only failures below HTTP are errors.
    async fn get(&self, url: &str, if_modified_since: Option<&str>) -> Result<Reply>;

    /// Issues a `HEAD` and returns the status.
    ///
    /// # Errors
    ///
    /// Fails only below HTTP, like [`Transport::get`].
    async fn head(&self, url: &str) -> Result<StatusCode>;
}

/// Client for requesting data from the API.
#[derive(Debug, Clone)]
pub struct Client {
    http: ReqwestClient,
    user_agent: String,
}

impl Client {
    /// Returns a client with default [`ClientOptions`].
    pub fn new() -> Client {
        Client {
            http: ReqwestClient::new(),
            user_agent: ClientOptions::default().user_agent,
        }
    }

    /// Returns a client configured with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientFormation`] if the underlying reqwest client cannot be built.
    pub fn with_options(options: ClientOptions) -> Result<Client> {
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(Error::ClientFormation)?;
        Ok(Client {
            http,
            user_agent: options.user_agent,
        })
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for Client {
    async fn get(&self, url: &str, if_modified_since: Option<&str>) -> Result<Reply> {
        let response = {
            let mut builder = self.http.get(url).header(USER_AGENT, &self.user_agent);
            if let Some(time) = if_modified_since {
                builder = builder.header(IF_MODIFIED_SINCE, time);
            }
            log::debug!("request for {} dispatched", url);
            builder.send().await?
        };
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|x| x.to_str().ok())
            .map(ToString::to_string);
        let status = response.status();
        log::debug!("response status: {}", status);

        let body = response.bytes().await?.to_vec();
        Ok(Reply {
            status,
            body,
            last_modified,
        })
    }

    async fn head(&self, url: &str) -> Result<StatusCode> {
        log::debug!("head request for {} dispatched", url);
        let response = self
            .http
            .head(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;
        Ok(response.status())
    }
}

/// A response as seen by the library: status, body and `Last-Modified`.
#[derive(Debug, Clone)]
pub struct Reply {
    /// HTTP status of the response.
    pub status: StatusCode,
    /// Raw response body.
    pub body: Vec<u8>,
    /// The `Last-Modified` header, if the server sent one.
    pub last_modified: Option<String>,
}

impl Reply {
    /// Builds a reply out of its parts.
    pub fn new(status: StatusCode, body: Vec<u8>, last_modified: Option<String>) -> Self {
        Self {
            status,
            body,
            last_modified,
        }
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the body does not decode into `T`.
    pub fn json<T>(&self) -> Result<T>
    where
        T: for<'a> Deserialize<'a>,
    {
        serde_json::from_slice(&self.body).map_err(Into::into)
    }

    /// Returns the reply unchanged if the status is `200 OK`.
    pub(crate) fn ok(self) -> Result<Self> {
        match self.status {
            StatusCode::OK => Ok(self),
            code => Err(Error::UnexpectedStatus(code)),
        }
    }
}

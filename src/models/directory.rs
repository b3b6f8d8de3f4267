//! Board metadata from `boards.json`.
//!
//! The listing is fetched once into a [`BoardDirectory`] and reused by every
//! [`Board`](crate::board::Board) built from that directory. Nothing refreshes it
//! automatically; call [`BoardDirectory::clear`] to force a refetch.

use std::{collections::HashMap, sync::Arc};

use crate::{
    client::Transport,
    config::Site,
    error::Error,
    models::{de_bool, maybe_de_string, maybe_de_u64},
    result::Result,
    url::Url,
};
use serde::{Deserialize, Serialize};

/// One entry of the board listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardInfo {
    /// The directory the board lives in, e.g. `tech`.
    pub uri: String,

    /// The readable title at the top of the board.
    #[serde(default)]
    pub title: String,

    /// Subtitle under the title.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_string"
    )]
    pub subtitle: Option<String>,

    /// True if the board is worksafe.
    #[serde(default, deserialize_with = "de_bool")]
    pub sfw: bool,

    /// True if the board is listed publicly.
    #[serde(default, deserialize_with = "de_bool")]
    pub indexed: bool,

    /// Listing weight.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub weight: Option<u64>,

    /// Language of the board.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_string"
    )]
    pub locale: Option<String>,

    /// Tags the owner set for the board.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Maximum number of concurrent users seen.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub max: Option<u64>,

    /// Posts per hour.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub pph: Option<u64>,

    /// Posts per day.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub ppd: Option<u64>,

    /// Total posts ever made on the board.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub posts_total: Option<u64>,

    /// Currently active users.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub active: Option<u64>,

    /// Creation time as reported by the listing.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_string"
    )]
    pub time: Option<String>,
}

/// Owned cache of the board listing.
///
/// Share one directory between boards to fetch `boards.json` only once.
/// Callers building boards from several tasks wrap it in their own lock.
#[derive(Debug, Default)]
pub struct BoardDirectory {
    boards: Option<HashMap<String, Arc<BoardInfo>>>,
}

impl BoardDirectory {
    /// An empty directory. The listing is fetched on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the board listing unless it is already loaded.
    ///
    /// # Errors
    ///
    /// Transport failures and non-200 statuses propagate. A listing that is not
    /// a list of objects with a string `uri` yields [`Error::Schema`].
    pub async fn init(&mut self, transport: &dyn Transport, site: &Site) -> Result<()> {
        if self.boards.is_some() {
            return Ok(());
        }
        let url = Url::board_list(site);
        let reply = transport.get(&url, None).await?.ok()?;
        let listing: Vec<BoardInfo> = reply
            .json()
            .map_err(|e| Error::Schema(format!("board listing: {e}")))?;
        log::debug!("loaded metadata for {} boards", listing.len());

        self.boards = Some(
            listing
                .into_iter()
                .map(|info| (info.uri.clone(), Arc::new(info)))
                .collect(),
        );
        Ok(())
    }

    /// Forgets the listing; the next [`init`](Self::init) fetches it again.
    pub fn clear(&mut self) {
        self.boards = None;
    }

    /// Returns true if the listing has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.boards.is_some()
    }

    /// Looks up a board loaded by [`init`](Self::init).
    pub fn get(&self, name: &str) -> Option<Arc<BoardInfo>> {
        self.boards.as_ref()?.get(name).cloned()
    }

    /// Loads the listing if needed and looks up `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoardNotFound`] if the listing has no such board.
    pub async fn resolve(
        &mut self,
        transport: &dyn Transport,
        site: &Site,
        name: &str,
    ) -> Result<Arc<BoardInfo>> {
        self.init(transport, site).await?;
        self.get(name)
            .ok_or_else(|| Error::BoardNotFound(name.to_string()))
    }

    /// Returns every loaded board name, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .boards
            .iter()
            .flat_map(HashMap::keys)
            .cloned()
            .collect();
        names.sort();
        names
    }
}

//! A board and its cache of threads.
//!
//! A [`Board`] remembers every thread it has produced. Listing calls
//! ([`Board::get_threads`], [`Board::get_all_threads`]) never overwrite a cached
//! thread with the partial snippet they receive; they flag it with
//! [`Thread::wants_update`] instead, and [`Board::refresh_cache`] can later
//! update exactly those.
//!
//! # Example: Fetching a thread and watching it for replies
//! ```ignore
//! use dot8ch::{board::Board, directory::BoardDirectory, Site};
//!
//! let mut directory = BoardDirectory::new();
//! let mut board = Board::new(&mut directory, "tech", &Site::new(true), None).await?;
//!
//! if let Some(thread) = board.get_thread(1234).await? {
//!     // later on
//!     let update = board.update_thread(&thread, false).await?;
//!     println!("{} new posts", update.new_posts());
//! }
//! ```

use std::{collections::HashMap, sync::Arc};

use crate::{
    client::{Client, Transport},
    config::Site,
    error::Error,
    models::{
        directory::{BoardDirectory, BoardInfo},
        post::RawPost,
        thread::{SharedThread, Thread, ThreadPayload, Update},
    },
    result::Result,
    url::Url,
};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;

/// `{board}/{page}.json`
#[derive(Debug, Deserialize)]
struct PagePayload {
    threads: Vec<ThreadPayload>,
}

/// A page of `{board}/catalog.json`.
#[derive(Debug, Deserialize)]
struct CatalogPage {
    threads: Vec<CatalogThread>,
}

/// A catalog topic, with its newest replies inlined under `last_replies`.
#[derive(Debug, Deserialize)]
struct CatalogThread {
    #[serde(flatten)]
    op: RawPost,
    #[serde(default)]
    last_replies: Vec<RawPost>,
}

impl CatalogThread {
    fn into_posts(self) -> Vec<RawPost> {
        std::iter::once(self.op).chain(self.last_replies).collect()
    }
}

/// A page of `{board}/threads.json`.
#[derive(Debug, Deserialize)]
struct ThreadListPage {
    threads: Vec<ThreadStub>,
}

#[derive(Debug, Deserialize)]
struct ThreadStub {
    no: u64,
}

/// How [`Board::get_thread_with`] treats the cache and missing threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadQuery {
    /// Update the thread if it is already cached.
    pub update_if_cached: bool,
    /// Return [`Error::ThreadNotFound`] on 404 instead of `Ok(None)`.
    pub raise_404: bool,
}

impl Default for ThreadQuery {
    fn default() -> Self {
        Self {
            update_if_cached: true,
            raise_404: false,
        }
    }
}

/// A board of the site, its metadata and its thread cache.
#[derive(Debug)]
pub struct Board {
    name: String,
    info: Arc<BoardInfo>,
    url: Arc<Url>,
    transport: Arc<dyn Transport>,
    threads: HashMap<u64, SharedThread>,
}

impl Board {
    /// Returns the board `name`, resolving its metadata through `directory`.
    ///
    /// Pass a transport to share one connection between boards; `None` creates
    /// a default [`Client`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoardNotFound`] if the board listing does not contain `name`,
    /// or any error from fetching the listing.
    pub async fn new(
        directory: &mut BoardDirectory,
        name: &str,
        site: &Site,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self> {
        let transport = transport.unwrap_or_else(|| Arc::new(Client::new()));
        let info = directory.resolve(transport.as_ref(), site, name).await?;
        Ok(Self {
            name: name.to_string(),
            info,
            url: Arc::new(Url::new(site, name)),
            transport,
            threads: HashMap::new(),
        })
    }

    /// Returns a thread, fetching it unless it is cached.
    ///
    /// A cached thread is updated before being returned. A missing thread is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// See [`Board::get_thread_with`].
    pub async fn get_thread(&mut self, id: u64) -> Result<Option<SharedThread>> {
        self.get_thread_with(id, ThreadQuery::default()).await
    }

    /// Returns a thread, with explicit cache and 404 policy.
    ///
    /// # Errors
    ///
    /// Transport failures and unexpected statuses propagate, as does
    /// [`Error::ThreadNotFound`] when `query.raise_404` is set.
    pub async fn get_thread_with(
        &mut self,
        id: u64,
        query: ThreadQuery,
    ) -> Result<Option<SharedThread>> {
        if let Some(cached) = self.threads.get(&id).cloned() {
            log::debug!("thread {} on /{}/ served from cache", id, self.name);
            if query.update_if_cached {
                self.update_thread(&cached, false).await?;
            }
            return Ok(Some(cached));
        }

        let reply = self.transport.get(&self.url.thread_api(id), None).await?;
        match reply.status {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND if query.raise_404 => {
                return Err(Error::ThreadNotFound {
                    board: self.name.clone(),
                    id,
                })
            }
            StatusCode::NOT_FOUND => return Ok(None),
            code => return Err(Error::UnexpectedStatus(code)),
        }

        let payload: ThreadPayload = reply.json()?;
        let mut thread = Thread::from_posts(payload.posts, self.url.clone(), true)?;
        thread.remember_last_modified(reply.last_modified);
        let id = thread.id();
        let handle = Arc::new(Mutex::new(thread));
        self.threads.insert(id, handle.clone());
        Ok(Some(handle))
    }

    /// Returns true if the thread exists, without fetching its posts.
    ///
    /// # Errors
    ///
    /// Transport failures propagate.
    pub async fn thread_exists(&self, id: u64) -> Result<bool> {
        let status = self.transport.head(&self.url.thread_api(id)).await?;
        Ok(status.is_success())
    }

    /// Returns the threads on index page `page`. Page `0` is the first page.
    ///
    /// Threads not yet cached come back partial (topic plus a few replies).
    /// Cached threads are returned as they are and flagged as wanting an update.
    ///
    /// # Errors
    ///
    /// Transport failures, non-200 statuses and undecodable bodies propagate.
    pub async fn get_threads(&mut self, page: u32) -> Result<Vec<SharedThread>> {
        let reply = self.transport.get(&self.url.page(page), None).await?.ok()?;
        let page: PagePayload = reply.json()?;
        self.absorb_listing(page.threads.into_iter().map(|t| t.posts))
            .await
    }

    /// Returns the ID of every thread on the board, in listing order.
    ///
    /// # Errors
    ///
    /// Transport failures, non-200 statuses and undecodable bodies propagate.
    pub async fn get_all_thread_ids(&self) -> Result<Vec<u64>> {
        let reply = self
            .transport
            .get(&self.url.thread_list(), None)
            .await?
            .ok()?;
        let pages: Vec<ThreadListPage> = reply.json()?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.threads)
            .map(|stub| stub.no)
            .collect())
    }

    /// Returns every thread on the board.
    ///
    /// Without `expand` this is a single catalog request yielding partial threads,
    /// merged into the cache like [`Board::get_threads`]. With `expand` every thread
    /// is fetched in full, one request each, skipping those that 404 meanwhile.
    /// This is slow on big boards.
    ///
    /// # Errors
    ///
    /// Transport failures, unexpected statuses and undecodable bodies propagate.
    pub async fn get_all_threads(&mut self, expand: bool) -> Result<Vec<SharedThread>> {
        if !expand {
            let reply = self.transport.get(&self.url.catalog(), None).await?.ok()?;
            let pages: Vec<CatalogPage> = reply.json()?;
            let listing = pages
                .into_iter()
                .flat_map(|page| page.threads)
                .map(CatalogThread::into_posts);
            return self.absorb_listing(listing).await;
        }

        let ids = self.get_all_thread_ids().await?;
        log::info!("expanding {} threads on /{}/", ids.len(), self.name);
        let mut threads = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(thread) = self.get_thread_with(id, ThreadQuery::default()).await? {
                threads.push(thread);
            }
        }
        Ok(threads)
    }

    /// Fetches new posts for a thread and merges them.
    ///
    /// - A dead thread is left alone unless `force` is set.
    /// - The request carries `If-Modified-Since` when the thread knows its
    ///   modification time and `force` is not set.
    /// - `404` marks the thread dead and evicts it from the cache. The handle
    ///   stays readable.
    /// - `200` on a dead thread revives it and puts it back in the cache.
    /// - Transport failures are reported as [`Update::Deferred`], not as errors.
    ///
    /// The caller must not hold the thread's lock while calling this.
    ///
    /// # Errors
    ///
    /// Statuses other than 200, 304 and 404 yield [`Error::UnexpectedStatus`];
    /// an undecodable body yields [`Error::Json`].
    pub async fn update_thread(&mut self, handle: &SharedThread, force: bool) -> Result<Update> {
        let mut thread = handle.lock().await;
        if thread.is_404() && !force {
            return Ok(Update::Skipped);
        }

        let precondition = if force {
            None
        } else {
            thread.last_modified().map(ToString::to_string)
        };
        let reply = match self
            .transport
            .get(&thread.api_url(), precondition.as_deref())
            .await
        {
            Ok(reply) => reply,
            Err(err) if err.is_transport() => {
                log::warn!("update of thread {} deferred: {}", thread.id(), err);
                return Ok(Update::Deferred);
            }
            Err(err) => return Err(err),
        };

        match reply.status {
            StatusCode::NOT_MODIFIED => Ok(Update::NotModified),
            StatusCode::NOT_FOUND => {
                log::info!("thread {} on /{}/ is gone", thread.id(), self.name);
                thread.mark_dead();
                self.threads.remove(&thread.id());
                Ok(Update::Gone)
            }
            StatusCode::OK => {
                let payload: ThreadPayload = reply.json()?;
                let was_dead = thread.is_404();
                let delta = thread.apply(payload.posts, force)?;
                thread.remember_last_modified(reply.last_modified);
                if was_dead {
                    log::info!("thread {} on /{}/ is back", thread.id(), self.name);
                    self.threads.insert(thread.id(), handle.clone());
                }
                log::debug!("thread {} updated: {} new posts", thread.id(), delta);
                Ok(Update::Applied(delta))
            }
            code => Err(Error::UnexpectedStatus(code)),
        }
    }

    /// Pulls every post of a partial thread. Does nothing for full threads.
    ///
    /// # Errors
    ///
    /// Same as [`Board::update_thread`].
    pub async fn expand_thread(&mut self, handle: &SharedThread) -> Result<Update> {
        if !handle.lock().await.is_partial() {
            return Ok(Update::Skipped);
        }
        self.update_thread(handle, true).await
    }

    /// Updates every cached thread, or only those flagged by a listing.
    ///
    /// Returns the total change in reply count.
    ///
    /// # Errors
    ///
    /// Stops at the first error from [`Board::update_thread`].
    pub async fn refresh_cache(&mut self, only_if_wants_update: bool) -> Result<isize> {
        // updates may evict threads, so walk a snapshot
        let snapshot: Vec<SharedThread> = self.threads.values().cloned().collect();
        log::info!(
            "refreshing {} cached threads on /{}/",
            snapshot.len(),
            self.name
        );

        let mut total = 0;
        for handle in snapshot {
            if only_if_wants_update && !handle.lock().await.wants_update() {
                continue;
            }
            total += self.update_thread(&handle, false).await?.new_posts();
        }
        Ok(total)
    }

    /// Drops every cached thread.
    pub fn clear_cache(&mut self) {
        self.threads.clear();
    }

    /// Returns a cached thread without touching the network.
    pub fn cached(&self, id: u64) -> Option<SharedThread> {
        self.threads.get(&id).cloned()
    }

    /// Returns the IDs of the cached threads, sorted.
    pub fn cached_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.threads.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the transport the board issues requests with.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Returns the URL builder for this board.
    pub fn urls(&self) -> &Url {
        &self.url
    }

    /// Merges listing snippets into the cache, in listing order.
    async fn absorb_listing<I>(&mut self, listing: I) -> Result<Vec<SharedThread>>
    where
        I: IntoIterator<Item = Vec<RawPost>>,
    {
        let mut threads = Vec::new();
        for posts in listing {
            let id = posts
                .first()
                .map(|op| op.no)
                .ok_or_else(|| Error::Schema(format!("empty thread in /{}/ listing", self.name)))?;

            if let Some(cached) = self.threads.get(&id) {
                cached.lock().await.set_wants_update();
                threads.push(cached.clone());
                continue;
            }
            let thread = Thread::from_posts(posts, self.url.clone(), false)?;
            let handle = Arc::new(Mutex::new(thread));
            self.threads.insert(id, handle.clone());
            threads.push(handle);
        }
        log::debug!("listing on /{}/ yielded {} threads", self.name, threads.len());
        Ok(threads)
    }

    /// Returns the name of the board, e.g. `tech`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the metadata record of the board.
    pub fn info(&self) -> &BoardInfo {
        &self.info
    }

    /// Returns the board URI from the listing.
    pub fn uri(&self) -> &str {
        &self.info.uri
    }

    /// Returns the board title.
    pub fn title(&self) -> &str {
        &self.info.title
    }

    /// Returns the board subtitle.
    pub fn subtitle(&self) -> Option<&str> {
        self.info.subtitle.as_deref()
    }

    /// Returns true if the board is publicly indexed.
    pub fn is_indexed(&self) -> bool {
        self.info.indexed
    }

    /// Returns true if the board is worksafe.
    pub fn is_worksafe(&self) -> bool {
        self.info.sfw
    }

    /// Returns the listing weight.
    pub fn weight(&self) -> Option<u64> {
        self.info.weight
    }

    /// Returns the board language.
    pub fn locale(&self) -> Option<&str> {
        self.info.locale.as_deref()
    }

    /// Returns the board tags.
    pub fn tags(&self) -> &[String] {
        &self.info.tags
    }

    /// Returns the most users ever seen at once.
    pub fn max_users(&self) -> Option<u64> {
        self.info.max
    }

    /// Returns the number of active users.
    pub fn active_users(&self) -> Option<u64> {
        self.info.active
    }

    /// Returns posts per hour.
    pub fn hourly_users(&self) -> Option<u64> {
        self.info.pph
    }

    /// Returns posts per day.
    pub fn daily_users(&self) -> Option<u64> {
        self.info.ppd
    }

    /// Returns the total number of posts on the board.
    pub fn num_posts(&self) -> Option<u64> {
        self.info.posts_total
    }

    /// Returns the creation time from the listing.
    pub fn time(&self) -> Option<&str> {
        self.info.time.as_deref()
    }

    /// Returns true if the board is accessed over `https`.
    pub fn https(&self) -> bool {
        self.url.https()
    }
}

#[cfg(feature = "display")]
impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Board /{}/ ({} cached threads)", self.name, self.threads.len())
    }
}

/// Returns a [`Board`] for each name, sharing one transport.
///
/// # Errors
///
/// Fails on the first name missing from the listing.
pub async fn get_boards<I, S>(
    directory: &mut BoardDirectory,
    names: I,
    site: &Site,
    transport: Option<Arc<dyn Transport>>,
) -> Result<Vec<Board>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let transport = transport.unwrap_or_else(|| Arc::new(Client::new()));
    let mut boards = Vec::new();
    for name in names {
        let board = Board::new(directory, name.as_ref(), site, Some(transport.clone())).await?;
        boards.push(board);
    }
    Ok(boards)
}

/// Like [`get_boards`], with names separated by whitespace: `"tech v b"`.
///
/// # Errors
///
/// Same as [`get_boards`].
pub async fn get_boards_str(
    directory: &mut BoardDirectory,
    names: &str,
    site: &Site,
    transport: Option<Arc<dyn Transport>>,
) -> Result<Vec<Board>> {
    get_boards(directory, names.split_whitespace(), site, transport).await
}

/// Returns a [`Board`] for every board in the listing, sorted by name.
///
/// # Errors
///
/// Fails if the listing cannot be fetched.
pub async fn get_all_boards(
    directory: &mut BoardDirectory,
    site: &Site,
    transport: Option<Arc<dyn Transport>>,
) -> Result<Vec<Board>> {
    let transport = transport.unwrap_or_else(|| Arc::new(Client::new()));
    directory.init(transport.as_ref(), site).await?;
    let names = directory.names();
    get_boards(directory, names, site, Some(transport)).await
}

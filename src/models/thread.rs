//! Threads and the incremental update algorithm.

use std::sync::Arc;

use crate::{
    error::Error,
    models::{file::File, post::Post, post::RawPost},
    result::Result,
    url::Url,
};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// A cached thread, shared between the [`Board`](crate::board::Board) cache and callers.
///
/// The handle stays valid after the board evicts the thread on 404.
pub type SharedThread = Arc<Mutex<Thread>>;

/// `If-Modified-Since: Wed, 21 Oct 2015 07:28:00 GMT`
const HTTP_DATE: &str = "%a, %d %b %Y %T GMT";

/// `{"posts": [topic, reply...]}` as returned by the thread and page endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ThreadPayload {
    pub(crate) posts: Vec<RawPost>,
}

/// What a call to [`Board::update_thread`](crate::board::Board::update_thread) did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// The thread is dead and the update was not forced. No request was sent.
    Skipped,
    /// The server reported `304 Not Modified`.
    NotModified,
    /// The server reported `404`; the thread was marked dead and evicted.
    Gone,
    /// The request failed below HTTP. Nothing changed; try again later.
    Deferred,
    /// New content was merged. Holds the change in reply count.
    Applied(isize),
}

impl Update {
    /// Returns the change in reply count, `0` for everything but [`Update::Applied`].
    pub fn new_posts(self) -> isize {
        match self {
            Update::Applied(delta) => delta,
            _ => 0,
        }
    }
}

/// A topic post plus its replies, oldest first.
#[derive(Debug, Clone)]
pub struct Thread {
    id: u64,
    url: Arc<Url>,
    topic: Post,
    replies: Vec<Post>,
    /// ID of the newest reply merged so far (the topic's ID when there are none).
    last_reply_id: Option<u64>,
    last_modified: Option<String>,
    omitted_posts: u64,
    omitted_images: u64,
    dead: bool,
    wants_update: bool,
}

impl Thread {
    /// Builds a thread from the posts of a thread, page or catalog response.
    ///
    /// `full` is true for a direct thread fetch, which sets the watermark.
    /// Listing snippets leave it unset so the first update replaces every reply.
    pub(crate) fn from_posts(posts: Vec<RawPost>, url: Arc<Url>, full: bool) -> Result<Self> {
        let mut posts = posts.into_iter();
        let head = posts
            .next()
            .ok_or_else(|| Error::Schema("thread without posts".to_string()))?;
        let id = head.no;
        let topic = Post::new(head, id, url.clone());
        let mut replies: Vec<Post> = posts.map(|p| Post::new(p, id, url.clone())).collect();
        sort_replies(&mut replies);

        let last_reply_id = full.then(|| replies.last().map_or(id, Post::id));
        Ok(Self {
            id,
            last_modified: http_date(topic.last_modified()),
            omitted_posts: topic.omitted_posts(),
            omitted_images: topic.omitted_images(),
            url,
            topic,
            replies,
            last_reply_id,
            dead: false,
            wants_update: false,
        })
    }

    /// Merges the posts of a fresh `200 OK` response and returns the change in reply count.
    ///
    /// With a watermark and no `force`, only replies newer than the watermark are
    /// appended. Otherwise the reply list is replaced wholesale.
    pub(crate) fn apply(&mut self, posts: Vec<RawPost>, force: bool) -> Result<isize> {
        let mut posts = posts.into_iter();
        let head = posts
            .next()
            .ok_or_else(|| Error::Schema(format!("thread {} without posts", self.id)))?;
        let before = self.replies.len();

        self.topic = Post::new(head, self.id, self.url.clone());
        let fresh = posts.map(|p| Post::new(p, self.id, self.url.clone()));
        match self.last_reply_id {
            Some(mark) if !force => {
                let mut newer: Vec<Post> = fresh.filter(|p| p.id() > mark).collect();
                sort_replies(&mut newer);
                self.replies.extend(newer);
            }
            _ => {
                self.replies = fresh.collect();
                sort_replies(&mut self.replies);
            }
        }

        self.dead = false;
        self.wants_update = false;
        self.omitted_posts = 0;
        self.omitted_images = 0;
        self.last_reply_id = Some(self.replies.last().map_or(self.id, Post::id));
        if let Some(date) = http_date(self.topic.last_modified()) {
            self.last_modified = Some(date);
        }

        Ok(delta(before, self.replies.len()))
    }

    pub(crate) fn mark_dead(&mut self) {
        self.dead = true;
    }

    pub(crate) fn set_wants_update(&mut self) {
        self.wants_update = true;
    }

    /// Takes the `Last-Modified` header of a `200` reply when the topic carries no timestamp.
    pub(crate) fn remember_last_modified(&mut self, header: Option<String>) {
        if self.topic.last_modified().is_none() && header.is_some() {
            self.last_modified = header;
        }
    }

    /// Returns the thread ID, which is the topic's post ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the board this thread lives on.
    pub fn board(&self) -> &str {
        self.url.board()
    }

    /// Returns the original post.
    pub fn topic(&self) -> &Post {
        &self.topic
    }

    /// Returns the replies, oldest first.
    pub fn replies(&self) -> &[Post] {
        &self.replies
    }

    /// Returns the topic followed by every reply.
    pub fn posts(&self) -> impl Iterator<Item = &Post> + '_ {
        std::iter::once(&self.topic).chain(self.replies.iter())
    }

    /// Finds a post of the thread by ID.
    pub fn find(&self, id: u64) -> Option<&Post> {
        self.posts().find(|post| post.id() == id)
    }

    /// Returns the number of replies currently held.
    pub fn num_replies(&self) -> usize {
        self.replies.len()
    }

    /// Returns the ID of the newest merged reply, if the thread was ever fully fetched.
    pub fn last_reply_id(&self) -> Option<u64> {
        self.last_reply_id
    }

    /// Returns the precondition sent with the next update.
    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    /// Returns how many replies a listing left out. `0` once fully fetched.
    pub fn omitted_posts(&self) -> u64 {
        self.omitted_posts
    }

    /// Returns how many image replies a listing left out. `0` once fully fetched.
    pub fn omitted_images(&self) -> u64 {
        self.omitted_images
    }

    /// Returns true if the thread was built from a listing and misses replies.
    pub fn is_partial(&self) -> bool {
        self.omitted_posts > 0
    }

    /// Returns true if the server reported the thread gone.
    pub fn is_404(&self) -> bool {
        self.dead
    }

    /// Returns true if a listing saw this thread while it was cached.
    pub fn wants_update(&self) -> bool {
        self.wants_update
    }

    /// Returns true if the thread is pinned.
    pub fn is_sticky(&self) -> bool {
        self.topic.is_sticky()
    }

    /// Returns true if the thread is closed to replies.
    pub fn is_closed(&self) -> bool {
        self.topic.is_locked()
    }

    /// Returns the HTML URL of the thread.
    pub fn url(&self) -> String {
        self.url.thread_html(self.id)
    }

    /// Returns the JSON URL of the thread.
    pub fn api_url(&self) -> String {
        self.url.thread_api(self.id)
    }

    /// Returns true if the thread is served over `https`.
    pub fn https(&self) -> bool {
        self.url.https()
    }

    /// Returns every attachment of the thread, topic first, in posting order.
    pub fn file_objects(&self) -> impl Iterator<Item = &File> + '_ {
        self.posts()
            .filter(|post| post.has_file())
            .flat_map(Post::all_files)
    }

    /// Returns the URL of every attachment.
    pub fn files(&self) -> impl Iterator<Item = String> + '_ {
        self.file_objects().filter_map(File::file_url)
    }

    /// Returns the URL of every thumbnail.
    pub fn thumbnails(&self) -> impl Iterator<Item = String> + '_ {
        self.file_objects().filter_map(File::thumbnail_url)
    }

    /// Returns the stored name of every attachment.
    pub fn filenames(&self) -> impl Iterator<Item = String> + '_ {
        self.file_objects().filter_map(File::filename)
    }

    /// Returns the stored name of every thumbnail.
    pub fn thumbnail_names(&self) -> impl Iterator<Item = String> + '_ {
        self.file_objects().filter_map(File::thumbnail_name)
    }
}

#[cfg(feature = "display")]
impl std::fmt::Display for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Thread /{}/{} | replies: {}",
            self.board(),
            self.id,
            self.replies.len()
        )?;
        if self.omitted_posts > 0 || self.omitted_images > 0 {
            write!(
                f,
                " | {} omitted images, {} omitted posts",
                self.omitted_images, self.omitted_posts
            )?;
        }
        Ok(())
    }
}

/// Replies must be strictly increasing by ID.
fn sort_replies(replies: &mut Vec<Post>) {
    replies.sort_by_key(Post::id);
    replies.dedup_by_key(|post| post.id());
}

fn delta(before: usize, after: usize) -> isize {
    let wide = |n: usize| isize::try_from(n).unwrap_or(isize::MAX);
    wide(after) - wide(before)
}

fn http_date(timestamp: Option<u64>) -> Option<String> {
    let secs = i64::try_from(timestamp?).ok()?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|time| time.format(HTTP_DATE).to_string())
}

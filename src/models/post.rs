//! A single message of a thread.

use std::sync::Arc;

use crate::{
    models::{
        file::{File, RawFile},
        macros::str_opt_ref,
        maybe_de_bool, maybe_de_u64,
    },
    text,
    url::Url,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Post fields as the thread, page and catalog endpoints send them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct RawPost {
    /// The numeric post ID.
    pub(crate) no: u64,

    /// For replies: the thread being replied to. For OP posts: `0`.
    #[serde(default)]
    pub(crate) resto: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) sub: Option<String>,

    /// Comment HTML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) com: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) trip: Option<String>,

    /// Per-thread poster hash, on boards that show one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,

    /// UNIX timestamp of post creation.
    #[serde(default)]
    pub(crate) time: i64,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_bool"
    )]
    pub(crate) sticky: Option<bool>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_bool"
    )]
    pub(crate) locked: Option<bool>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_bool"
    )]
    pub(crate) cyclical: Option<bool>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_bool"
    )]
    pub(crate) bumplocked: Option<bool>,

    /// vichan puts the modification time in the OP rather than in a header.
    /// Thread fetches and updates disagree on the key spelling, and some
    /// payloads carry both.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub(crate) last_modified: Option<u64>,

    #[serde(
        default,
        rename = "last-modified",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub(crate) last_modified_dashed: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub(crate) omitted_posts: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub(crate) omitted_images: Option<u64>,

    /// Primary attachment.
    #[serde(flatten)]
    pub(crate) file: RawFile,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) extra_files: Option<Vec<RawFile>>,
}

/// A post as fetched at one point in time.
///
/// Posts are snapshots: a thread update replaces them rather than mutating them,
/// so a `Post` kept across [`Board::update_thread`](crate::board::Board::update_thread)
/// stays readable but may be stale.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    data: RawPost,
    thread_id: u64,
    url: Arc<Url>,
    first_file: Option<File>,
    extra_files: Vec<File>,
}

impl Post {
    pub(crate) fn new(mut data: RawPost, thread_id: u64, url: Arc<Url>) -> Self {
        let first_file = data
            .file
            .is_present()
            .then(|| File::new(data.file.clone(), data.no, url.clone()));
        let extra_files = data
            .extra_files
            .take()
            .unwrap_or_default()
            .into_iter()
            .map(|raw| File::new(raw, data.no, url.clone()))
            .collect();
        Self {
            data,
            thread_id,
            url,
            first_file,
            extra_files,
        }
    }

    /// Returns the numeric post ID.
    pub fn id(&self) -> u64 {
        self.data.no
    }

    /// Returns the ID of the thread this post belongs to.
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    /// Returns true if this post is the topic of its thread.
    pub fn is_op(&self) -> bool {
        self.data.no == self.thread_id
    }

    /// Returns the name the user posted with.
    pub fn name(&self) -> Option<&str> {
        str_opt_ref!(self.data.name)
    }

    /// Returns the email field.
    pub fn email(&self) -> Option<&str> {
        str_opt_ref!(self.data.email)
    }

    /// Returns the tripcode.
    pub fn tripcode(&self) -> Option<&str> {
        str_opt_ref!(self.data.trip)
    }

    /// Returns the per-thread poster hash, on boards that show one.
    pub fn poster_hash(&self) -> Option<&str> {
        str_opt_ref!(self.data.id)
    }

    /// Returns the subject.
    pub fn subject(&self) -> Option<&str> {
        str_opt_ref!(self.data.sub)
    }

    /// Returns the comment HTML exactly as sent.
    pub fn html_comment(&self) -> &str {
        self.data.com.as_deref().unwrap_or_default()
    }

    /// Returns the comment HTML with `<wbr>` markers removed.
    pub fn comment(&self) -> String {
        text::strip_wbr(self.html_comment())
    }

    /// Returns the comment as plain text.
    pub fn text_comment(&self) -> String {
        text::clean_comment_body(self.html_comment())
    }

    /// Returns the comment run through a custom cleaner.
    pub fn text_comment_with<F>(&self, clean: F) -> String
    where
        F: Fn(&str) -> String,
    {
        clean(self.html_comment())
    }

    /// Returns the UNIX timestamp of post creation.
    pub fn timestamp(&self) -> i64 {
        self.data.time
    }

    /// Returns the time of post creation.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.data.time, 0).single()
    }

    /// Returns the `last_modified` timestamp carried by topic posts.
    pub fn last_modified(&self) -> Option<u64> {
        self.data.last_modified.or(self.data.last_modified_dashed)
    }

    /// Returns true if the thread is pinned.
    pub fn is_sticky(&self) -> bool {
        self.data.sticky.unwrap_or(false)
    }

    /// Returns true if the thread is closed to replies.
    pub fn is_locked(&self) -> bool {
        self.data.locked.unwrap_or(false)
    }

    /// Returns true if the thread drops old replies as new ones arrive.
    pub fn is_cyclical(&self) -> bool {
        self.data.cyclical.unwrap_or(false)
    }

    /// Returns true if the thread no longer bumps.
    pub fn is_bumplocked(&self) -> bool {
        self.data.bumplocked.unwrap_or(false)
    }

    pub(crate) fn omitted_posts(&self) -> u64 {
        self.data.omitted_posts.unwrap_or(0)
    }

    pub(crate) fn omitted_images(&self) -> u64 {
        self.data.omitted_images.unwrap_or(0)
    }

    /// Returns true if the post has a primary attachment.
    pub fn has_file(&self) -> bool {
        self.first_file.is_some()
    }

    /// Returns true if the post has attachments beyond the primary one.
    pub fn has_extra_files(&self) -> bool {
        !self.extra_files.is_empty()
    }

    /// Returns the primary attachment.
    pub fn first_file(&self) -> Option<&File> {
        self.first_file.as_ref()
    }

    /// Returns the attachments after the primary one.
    pub fn extra_files(&self) -> &[File] {
        &self.extra_files
    }

    /// Returns every attachment, primary first.
    pub fn all_files(&self) -> impl Iterator<Item = &File> + '_ {
        self.first_file.iter().chain(self.extra_files.iter())
    }

    /// Returns the HTML URL pointing at this post.
    pub fn url(&self) -> String {
        format!("{}#p{}", self.url.thread_html(self.thread_id), self.data.no)
    }
}

#[cfg(feature = "display")]
impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Post /{}/{}#{} | has file: {} | has extra files: {}",
            self.url.board(),
            self.thread_id,
            self.data.no,
            self.has_file(),
            self.has_extra_files()
        )
    }
}

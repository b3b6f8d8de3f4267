//! Endpoint and media URLs for a vichan-style site.
//!
//! | What            | Template                                          |
//! |-----------------|---------------------------------------------------|
//! | board list      | `{proto}{domain}/boards.json`                     |
//! | page            | `{proto}{domain}/{board}/{page}.json`             |
//! | thread list     | `{proto}{domain}/{board}/threads.json`            |
//! | catalog         | `{proto}{domain}/{board}/catalog.json`            |
//! | thread (API)    | `{proto}{domain}/{board}/res/{id}.json`           |
//! | thread (HTML)   | `{proto}{domain}/{board}/res/{id}.html`           |
//! | file (new)      | `{proto}media.{domain}/file_store/{hash}{ext}`    |
//! | thumb (new)     | `{proto}media.{domain}/file_store/thumb/{hash}{ext}` |
//! | file (legacy)   | `{proto}media.{domain}/{board}/src/{tim}{ext}`    |
//! | thumb (legacy)  | `{proto}media.{domain}/{board}/thumb/{tim}{ext}`  |
//!
//! Board pages are numbered from zero.

use crate::config::Site;

/// Length of a content-addressed (sha256 hex) file identifier.
const CONTENT_HASH_LEN: usize = 64;

/// Builds URLs for one board of a [`Site`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    api: String,
    media: String,
    board: String,
    https: bool,
}

impl Url {
    /// URL builder for `board` on `site`.
    pub fn new(site: &Site, board: &str) -> Self {
        let protocol = site.protocol();
        Self {
            api: format!("{protocol}{}", site.domain()),
            media: format!("{protocol}media.{}", site.domain()),
            board: board.to_string(),
            https: site.https(),
        }
    }

    /// Listing of every board on the site. Does not depend on the board.
    pub fn board_list(site: &Site) -> String {
        format!("{}{}/boards.json", site.protocol(), site.domain())
    }

    /// Returns the board this builder is scoped to.
    pub fn board(&self) -> &str {
        &self.board
    }

    /// Returns true if the URLs use `https`.
    pub fn https(&self) -> bool {
        self.https
    }

    /// JSON for index page `page`. Page `0` is the first page.
    pub fn page(&self, page: u32) -> String {
        format!("{}/{}/{page}.json", self.api, self.board)
    }

    /// HTML for index page `page`.
    pub fn page_html(&self, page: u32) -> String {
        format!("{}/{}/{page}.html", self.api, self.board)
    }

    /// Full catalog with recent replies inlined.
    pub fn catalog(&self) -> String {
        format!("{}/{}/catalog.json", self.api, self.board)
    }

    /// Every thread ID on the board, grouped by page.
    pub fn thread_list(&self) -> String {
        format!("{}/{}/threads.json", self.api, self.board)
    }

    /// JSON for a single thread.
    pub fn thread_api(&self, thread_id: u64) -> String {
        format!("{}/{}/res/{thread_id}.json", self.api, self.board)
    }

    /// HTML page of a single thread.
    pub fn thread_html(&self, thread_id: u64) -> String {
        format!("{}/{}/res/{thread_id}.html", self.api, self.board)
    }

    /// Static asset served by the site.
    pub fn static_item(&self, item: &str) -> String {
        format!("{}/static/{item}", self.api)
    }

    /// Full-size attachment.
    ///
    /// 64 character identifiers are content hashes in the shared file store,
    /// anything else is a legacy per-board timestamp.
    pub fn file(&self, tim: &str, ext: &str) -> String {
        if is_content_hash(tim) {
            format!("{}/file_store/{tim}{ext}", self.media)
        } else {
            format!("{}/{}/src/{tim}{ext}", self.media, self.board)
        }
    }

    /// Thumbnail of an attachment. See [`thumbnail_ext`] for the extension.
    pub fn thumbnail(&self, tim: &str, ext: &str) -> String {
        let ext = thumbnail_ext(ext);
        if is_content_hash(tim) {
            format!("{}/file_store/thumb/{tim}{ext}", self.media)
        } else {
            format!("{}/{}/thumb/{tim}{ext}", self.media, self.board)
        }
    }
}

/// PNGs keep their extension when thumbnailed, everything else becomes a JPEG.
pub fn thumbnail_ext(ext: &str) -> &'static str {
    if ext == ".png" {
        ".png"
    } else {
        ".jpg"
    }
}

pub(crate) fn is_content_hash(tim: &str) -> bool {
    tim.len() == CONTENT_HASH_LEN
}

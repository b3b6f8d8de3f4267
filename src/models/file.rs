//! Attachments of a post.

use std::sync::Arc;

use crate::{
    client::Transport,
    models::{macros::str_opt_ref, maybe_de_bool, maybe_de_string, maybe_de_u64},
    result::Result,
    url::{self, Url},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Attachment fields as they appear on a post or inside `extra_files`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct RawFile {
    /// Name of the file on the poster's device, without extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) filename: Option<String>,

    /// Server-side identifier: a 64 character hash or a legacy timestamp.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_string"
    )]
    pub(crate) tim: Option<String>,

    /// Extension including the leading dot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) ext: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub(crate) fsize: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub(crate) w: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub(crate) h: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub(crate) tn_w: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_u64"
    )]
    pub(crate) tn_h: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "maybe_de_bool"
    )]
    pub(crate) filedeleted: Option<bool>,

    /// Base64 encoded MD5 of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) md5: Option<String>,
}

impl RawFile {
    pub(crate) fn is_present(&self) -> bool {
        self.filename.is_some()
    }
}

/// An attachment of a [`Post`](crate::post::Post): its hash, names, dimensions and URLs.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    data: RawFile,
    post_id: u64,
    url: Arc<Url>,
}

impl File {
    pub(crate) fn new(data: RawFile, post_id: u64, url: Arc<Url>) -> Self {
        Self { data, post_id, url }
    }

    /// Returns the ID of the post this file is attached to.
    pub fn post_id(&self) -> u64 {
        self.post_id
    }

    /// Returns the server-side identifier (content hash or legacy timestamp).
    pub fn tim(&self) -> Option<&str> {
        str_opt_ref!(self.data.tim)
    }

    /// Returns the MD5 of the file, base64 encoded as the API sends it.
    pub fn md5(&self) -> Option<&str> {
        str_opt_ref!(self.data.md5)
    }

    /// Returns the decoded MD5 digest.
    pub fn md5_bytes(&self) -> Option<Vec<u8>> {
        self.md5().and_then(|md5| STANDARD.decode(md5).ok())
    }

    /// Returns the MD5 digest as lowercase hex.
    pub fn md5_hex(&self) -> Option<String> {
        self.md5_bytes().map(hex::encode)
    }

    /// Returns the name the file is stored under on the media host (`{tim}{ext}`).
    pub fn filename(&self) -> Option<String> {
        let (tim, ext) = self.tim_ext()?;
        Some(format!("{tim}{ext}"))
    }

    /// Returns the file's name on the uploader's device, with extension.
    pub fn original_name(&self) -> Option<String> {
        let name = self.data.filename.as_deref()?;
        Some(format!("{name}{}", self.extension().unwrap_or_default()))
    }

    /// Returns the extension including the dot, e.g. `.png`.
    pub fn extension(&self) -> Option<&str> {
        str_opt_ref!(self.data.ext)
    }

    /// Returns the file size in bytes.
    pub fn size(&self) -> Option<u64> {
        self.data.fsize
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> Option<u64> {
        self.data.w
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> Option<u64> {
        self.data.h
    }

    /// Returns the thumbnail width in pixels.
    pub fn thumbnail_width(&self) -> Option<u64> {
        self.data.tn_w
    }

    /// Returns the thumbnail height in pixels.
    pub fn thumbnail_height(&self) -> Option<u64> {
        self.data.tn_h
    }

    /// Returns true if the file was deleted after being posted.
    pub fn is_deleted(&self) -> bool {
        self.data.filedeleted.unwrap_or(false)
    }

    /// Returns the URL of the full-size file.
    pub fn file_url(&self) -> Option<String> {
        let (tim, ext) = self.tim_ext()?;
        Some(self.url.file(tim, ext))
    }

    /// Returns the URL of the thumbnail.
    pub fn thumbnail_url(&self) -> Option<String> {
        let (tim, ext) = self.tim_ext()?;
        Some(self.url.thumbnail(tim, ext))
    }

    /// Returns the name the thumbnail is stored under.
    pub fn thumbnail_name(&self) -> Option<String> {
        let (tim, ext) = self.tim_ext()?;
        Some(format!("{tim}{}", url::thumbnail_ext(ext)))
    }

    /// Downloads the full-size file.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, on any status but `200 OK`, or with
    /// [`Error::Schema`](crate::error::Error::Schema) if the file has no identifier.
    pub async fn fetch(&self, transport: &dyn Transport) -> Result<Vec<u8>> {
        let url = self.file_url().ok_or_else(|| self.missing())?;
        Ok(transport.get(&url, None).await?.ok()?.body)
    }

    /// Downloads the thumbnail.
    ///
    /// # Errors
    ///
    /// Same as [`File::fetch`].
    pub async fn fetch_thumbnail(&self, transport: &dyn Transport) -> Result<Vec<u8>> {
        let url = self.thumbnail_url().ok_or_else(|| self.missing())?;
        Ok(transport.get(&url, None).await?.ok()?.body)
    }

    fn tim_ext(&self) -> Option<(&str, &str)> {
        Some((self.tim()?, self.extension()?))
    }

    fn missing(&self) -> crate::error::Error {
        crate::error::Error::Schema(format!("file on post {} has no identifier", self.post_id))
    }
}

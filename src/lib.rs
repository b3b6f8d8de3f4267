#![deny(clippy::all, clippy::pedantic)]
#![deny(missing_docs)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]
//! # dot8ch
//!
//! dot8ch is a convenient wrapper library around 8chan's (and other vichan sites')
//! read-only JSON API.
//!
//! This library can fetch and cache:
//! - [`Board`]s and their metadata
//! - [`Thread`]s, from index pages, the catalog or in full
//! - [`Post`]s and their [`File`]s
//!
//! While:
//! - sending `If-Modified-Since` with every thread update,
//! - appending only new replies on update,
//! - evicting threads from the cache once they 404.
//!
//! Requests are issued one at a time, in the order the caller awaits them. There
//! is no rate limiting or retrying; call [`Board::update_thread`] again later.
//!
//! ## Example: Printing the comment from a thread.
//!
//! ```no_run
//! # type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
//! use dot8ch::{board::Board, directory::BoardDirectory, Site};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut directory = BoardDirectory::new();
//!     let mut board = Board::new(&mut directory, "tech", &Site::new(true), None).await?;
//!
//!     let ids = board.get_all_thread_ids().await?;
//!     if let Some(thread) = board.get_thread(ids[0]).await? {
//!         // update thread
//!         board.update_thread(&thread, false).await?;
//!
//!         // print thread's OP comment
//!         let comment = thread.lock().await.topic().text_comment();
//!         println!("op says: {comment}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [`Board`]:  crate::board::Board
//! [`Board::update_thread`]:  crate::board::Board::update_thread
//! [`Thread`]: crate::thread::Thread
//! [`Post`]:   crate::post::Post
//! [`File`]:   crate::file::File

/// Client module contains the [`Transport`] seam and the reqwest-backed [`Client`].
pub mod client;

/// Site and client configuration.
pub mod config;

/// Contains [`Error`]s that can be thrown by the libary.
///
/// [`Error`]: crate::error::Error
pub mod error;

/// Endpoint and media URL builder.
pub mod url;

/// Plain-text rendering of comment HTML.
pub mod text;

pub(crate) mod models;

pub(crate) mod result;

pub use client::{Client, Reply, Transport};
pub use config::{ClientOptions, Site};
pub use models::*;
pub use result::Result;

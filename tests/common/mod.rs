#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use dot8ch::{error::Error, Reply, Transport};
use reqwest::StatusCode;
use serde_json::{json, Value};

pub const BOARDS: &str = "https://8ch.net/boards.json";

/// One request as the stub saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub method: &'static str,
    pub url: String,
    pub if_modified_since: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Canned {
    Reply(StatusCode, Vec<u8>, Option<String>),
    Broken,
}

/// Replays queued responses per URL. The last response of a queue repeats.
#[derive(Debug, Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<String, VecDeque<Canned>>>,
    seen: Mutex<Vec<Seen>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Debug)
            .init();
        Arc::new(Self::default())
    }

    pub fn json(&self, url: &str, body: &Value) -> &Self {
        self.push(url, Canned::Reply(StatusCode::OK, body.to_string().into_bytes(), None))
    }

    /// Like [`StubTransport::json`], with a `Last-Modified` header.
    pub fn json_dated(&self, url: &str, body: &Value, last_modified: &str) -> &Self {
        let body = body.to_string().into_bytes();
        self.push(url, Canned::Reply(StatusCode::OK, body, Some(last_modified.to_string())))
    }

    pub fn status(&self, url: &str, status: StatusCode) -> &Self {
        self.push(url, Canned::Reply(status, Vec::new(), None))
    }

    pub fn broken(&self, url: &str) -> &Self {
        self.push(url, Canned::Broken)
    }

    fn push(&self, url: &str, canned: Canned) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(canned);
        self
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn hits(&self, url: &str) -> usize {
        self.seen().iter().filter(|s| s.url == url).count()
    }

    pub fn last_for(&self, url: &str) -> Option<Seen> {
        self.seen().into_iter().filter(|s| s.url == url).last()
    }

    fn answer(&self, method: &'static str, url: &str, ims: Option<&str>) -> Canned {
        self.seen.lock().unwrap().push(Seen {
            method,
            url: url.to_string(),
            if_modified_since: ims.map(ToString::to_string),
        });
        let mut routes = self.routes.lock().unwrap();
        let queue = routes
            .get_mut(url)
            .unwrap_or_else(|| panic!("no route for {url}"));
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &str, if_modified_since: Option<&str>) -> dot8ch::Result<Reply> {
        match self.answer("GET", url, if_modified_since) {
            Canned::Reply(status, body, last_modified) => Ok(Reply::new(status, body, last_modified)),
            Canned::Broken => Err(Error::Transport("connection reset".into())),
        }
    }

    async fn head(&self, url: &str) -> dot8ch::Result<StatusCode> {
        match self.answer("HEAD", url, None) {
            Canned::Reply(status, ..) => Ok(status),
            Canned::Broken => Err(Error::Transport("connection reset".into())),
        }
    }
}

pub fn boards_listing() -> Value {
    json!([
        {
            "uri": "tech", "title": "Technology", "subtitle": "gadgets", "sfw": "1",
            "indexed": 1, "weight": 0, "locale": "en", "tags": ["tech", "programming"],
            "max": "120", "pph": 4, "ppd": "96", "posts_total": "20000", "active": 31,
            "time": null
        },
        {
            "uri": "v", "title": "Video Games", "sfw": 0, "indexed": "1",
            "locale": "", "tags": [], "posts_total": 5
        }
    ])
}

pub fn thread_url(id: u64) -> String {
    format!("https://8ch.net/tech/res/{id}.json")
}

pub fn post(no: u64, resto: u64) -> Value {
    json!({"no": no, "resto": resto, "time": 1_500_000_000 + no, "com": format!("post {no}")})
}

/// `{"posts": [...]}` for a thread with an OP and the given reply IDs.
pub fn thread_body(op: u64, replies: &[u64]) -> Value {
    let mut topic = post(op, 0);
    topic["last_modified"] = json!(1_445_412_480);
    let mut posts = vec![topic];
    posts.extend(replies.iter().map(|&no| post(no, op)));
    json!({ "posts": posts })
}

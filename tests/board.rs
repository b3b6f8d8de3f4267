mod common;

use std::sync::Arc;

use common::{boards_listing, post, thread_body, thread_url, StubTransport, BOARDS};
use dot8ch::{
    board::{get_all_boards, get_boards_str, Board, ThreadQuery},
    directory::BoardDirectory,
    error::Error,
    thread::Update,
    Site, Transport,
};
use reqwest::StatusCode;
use serde_json::json;

const PAGE_0: &str = "https://8ch.net/tech/0.json";
const CATALOG: &str = "https://8ch.net/tech/catalog.json";
const THREADS: &str = "https://8ch.net/tech/threads.json";

async fn board(stub: &Arc<StubTransport>) -> anyhow::Result<Board> {
    stub.json(BOARDS, &boards_listing());
    let mut directory = BoardDirectory::new();
    let transport: Arc<dyn Transport> = stub.clone();
    Ok(Board::new(&mut directory, "tech", &Site::new(true), Some(transport)).await?)
}

fn replies(thread: &dot8ch::thread::Thread) -> Vec<u64> {
    thread.replies().iter().map(dot8ch::post::Post::id).collect()
}

#[tokio::test]
async fn board_metadata_comes_from_listing() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let board = board(&stub).await?;

    assert_eq!(board.name(), "tech");
    assert_eq!(board.title(), "Technology");
    assert_eq!(board.subtitle(), Some("gadgets"));
    assert!(board.is_worksafe());
    assert!(board.is_indexed());
    assert_eq!(board.tags(), ["tech", "programming"]);
    assert_eq!(board.max_users(), Some(120));
    assert_eq!(board.daily_users(), Some(96));
    assert_eq!(board.num_posts(), Some(20_000));
    assert_eq!(board.time(), None);
    assert!(board.https());
    Ok(())
}

#[tokio::test]
async fn listing_is_fetched_once_per_directory() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    stub.json(BOARDS, &boards_listing());
    let transport: Arc<dyn Transport> = stub.clone();
    let mut directory = BoardDirectory::new();
    let site = Site::new(true);

    let boards = get_boards_str(&mut directory, "tech v", &site, Some(transport.clone())).await?;
    assert_eq!(boards.len(), 2);
    let _again = Board::new(&mut directory, "v", &site, Some(transport.clone())).await?;
    assert_eq!(stub.hits(BOARDS), 1);

    let all = get_all_boards(&mut directory, &site, Some(transport.clone())).await?;
    let names: Vec<_> = all.iter().map(Board::name).collect();
    assert_eq!(names, ["tech", "v"]);
    assert_eq!(stub.hits(BOARDS), 1);

    directory.clear();
    Board::new(&mut directory, "tech", &site, Some(transport)).await?;
    assert_eq!(stub.hits(BOARDS), 2);
    Ok(())
}

#[tokio::test]
async fn unknown_board_is_an_error() {
    let stub = StubTransport::new();
    stub.json(BOARDS, &boards_listing());
    let mut directory = BoardDirectory::new();
    let transport: Arc<dyn Transport> = stub.clone();

    let err = Board::new(&mut directory, "nope", &Site::new(true), Some(transport))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BoardNotFound(name) if name == "nope"));
}

#[tokio::test]
async fn malformed_listing_is_a_schema_error() {
    let stub = StubTransport::new();
    stub.json(BOARDS, &json!({"boards": "nope"}));
    let mut directory = BoardDirectory::new();
    let transport: Arc<dyn Transport> = stub.clone();

    let err = Board::new(&mut directory, "tech", &Site::new(true), Some(transport))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
    assert!(!directory.is_loaded());
}

#[tokio::test]
async fn get_thread_caches_and_updates() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(&thread_url(100), &thread_body(100, &[101, 102, 103, 104, 105]));
    stub.json(&thread_url(100), &thread_body(100, &[101, 102, 103, 104, 105, 106, 107]));

    let thread = board.get_thread(100).await?.expect("thread exists");
    {
        let t = thread.lock().await;
        assert_eq!(t.num_replies(), 5);
        assert_eq!(t.last_reply_id(), Some(105));
        assert_eq!(t.topic().text_comment(), "post 100");
    }
    assert_eq!(board.cached_ids(), [100]);

    // cached: the same handle comes back, updated conditionally
    let again = board.get_thread(100).await?.expect("cached");
    assert!(Arc::ptr_eq(&thread, &again));
    assert_eq!(stub.hits(&thread_url(100)), 2);
    let seen = stub.last_for(&thread_url(100)).unwrap();
    assert_eq!(
        seen.if_modified_since.as_deref(),
        Some("Wed, 21 Oct 2015 07:28:00 GMT")
    );
    assert_eq!(replies(&*again.lock().await), [101, 102, 103, 104, 105, 106, 107]);

    // no update requested
    let query = ThreadQuery {
        update_if_cached: false,
        ..ThreadQuery::default()
    };
    board.get_thread_with(100, query).await?;
    assert_eq!(stub.hits(&thread_url(100)), 2);
    Ok(())
}

#[tokio::test]
async fn update_counts_new_replies_only() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(&thread_url(1), &thread_body(1, &[2, 3, 4, 5, 6]));
    stub.json(&thread_url(1), &thread_body(1, &[2, 3, 4, 5, 6, 7, 8]));
    stub.json(&thread_url(1), &thread_body(1, &[2, 3, 4, 5, 6, 7, 8]));

    let thread = board.get_thread(1).await?.unwrap();
    assert_eq!(board.update_thread(&thread, false).await?, Update::Applied(2));
    assert_eq!(thread.lock().await.num_replies(), 7);

    let update = board.update_thread(&thread, false).await?;
    assert_eq!(update.new_posts(), 0);
    assert_eq!(replies(&*thread.lock().await), [2, 3, 4, 5, 6, 7, 8]);
    Ok(())
}

#[tokio::test]
async fn not_modified_leaves_thread_untouched() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(&thread_url(1), &thread_body(1, &[2, 3]));
    stub.status(&thread_url(1), StatusCode::NOT_MODIFIED);

    let thread = board.get_thread(1).await?.unwrap();
    let before = thread.lock().await.clone();
    assert_eq!(board.update_thread(&thread, false).await?, Update::NotModified);

    let after = thread.lock().await;
    assert_eq!(after.topic(), before.topic());
    assert_eq!(after.replies(), before.replies());
    assert_eq!(after.last_reply_id(), before.last_reply_id());
    assert_eq!(after.omitted_posts(), before.omitted_posts());
    assert_eq!(after.omitted_images(), before.omitted_images());
    Ok(())
}

#[tokio::test]
async fn header_precondition_follows_latest_reply() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    let url = board.urls().thread_api(1);
    assert_eq!(url, thread_url(1));

    // no last_modified on the topic, so only the header dates the thread
    let body = json!({ "posts": [post(1, 0), post(2, 1)] });
    stub.json_dated(&url, &body, "Wed, 21 Oct 2015 07:21:00 GMT")
        .json_dated(&url, &body, "Wed, 21 Oct 2015 07:22:00 GMT")
        .json_dated(&url, &body, "Wed, 21 Oct 2015 07:23:00 GMT");

    let thread = board.get_thread(1).await?.unwrap();
    board.update_thread(&thread, false).await?;
    board.update_thread(&thread, false).await?;

    let sent: Vec<_> = stub
        .seen()
        .into_iter()
        .filter(|s| s.url == url)
        .map(|s| s.if_modified_since)
        .collect();
    assert_eq!(
        sent,
        [
            None,
            Some("Wed, 21 Oct 2015 07:21:00 GMT".to_string()),
            Some("Wed, 21 Oct 2015 07:22:00 GMT".to_string()),
        ]
    );
    assert_eq!(
        thread.lock().await.last_modified(),
        Some("Wed, 21 Oct 2015 07:23:00 GMT")
    );
    Ok(())
}

#[tokio::test]
async fn gone_thread_leaves_cache_and_comes_back_on_force() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(&thread_url(1), &thread_body(1, &[2, 3]));
    stub.status(&thread_url(1), StatusCode::NOT_FOUND);
    stub.json(&thread_url(1), &thread_body(1, &[2, 3, 4]));

    let thread = board.get_thread(1).await?.unwrap();
    assert_eq!(board.update_thread(&thread, false).await?, Update::Gone);
    assert!(thread.lock().await.is_404());
    assert!(board.cached(1).is_none());
    // still readable
    assert_eq!(thread.lock().await.num_replies(), 2);

    // dead threads are not polled unless forced
    let hits = stub.hits(&thread_url(1));
    assert_eq!(board.update_thread(&thread, false).await?, Update::Skipped);
    assert_eq!(stub.hits(&thread_url(1)), hits);

    assert_eq!(board.update_thread(&thread, true).await?, Update::Applied(1));
    assert!(!thread.lock().await.is_404());
    let cached = board.cached(1).expect("back in cache");
    assert!(Arc::ptr_eq(&cached, &thread));
    // forced refreshes are unconditional
    assert_eq!(stub.last_for(&thread_url(1)).unwrap().if_modified_since, None);
    Ok(())
}

#[tokio::test]
async fn get_thread_after_404_goes_to_network() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(&thread_url(1), &thread_body(1, &[2]));
    stub.status(&thread_url(1), StatusCode::NOT_FOUND);

    let thread = board.get_thread(1).await?.unwrap();
    board.update_thread(&thread, false).await?;
    let hits = stub.hits(&thread_url(1));

    assert!(board.get_thread(1).await?.is_none());
    assert_eq!(stub.hits(&thread_url(1)), hits + 1);

    let strict = ThreadQuery {
        raise_404: true,
        ..ThreadQuery::default()
    };
    let err = board.get_thread_with(1, strict).await.unwrap_err();
    assert!(matches!(err, Error::ThreadNotFound { id: 1, .. }));
    Ok(())
}

#[tokio::test]
async fn transport_failure_defers_update() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(&thread_url(1), &thread_body(1, &[2]));
    stub.broken(&thread_url(1));

    let thread = board.get_thread(1).await?.unwrap();
    assert_eq!(board.update_thread(&thread, false).await?, Update::Deferred);
    assert_eq!(thread.lock().await.num_replies(), 1);
    assert!(board.cached(1).is_some());

    // everywhere else transport failures propagate
    stub.broken(THREADS);
    assert!(board.get_all_thread_ids().await.unwrap_err().is_transport());
    Ok(())
}

#[tokio::test]
async fn unexpected_status_is_an_error() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(&thread_url(1), &thread_body(1, &[2]));
    stub.status(&thread_url(1), StatusCode::INTERNAL_SERVER_ERROR);

    let thread = board.get_thread(1).await?.unwrap();
    let err = board.update_thread(&thread, false).await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedStatus(StatusCode::INTERNAL_SERVER_ERROR)));

    stub.status(&thread_url(9), StatusCode::FORBIDDEN);
    assert!(matches!(
        board.get_thread(9).await,
        Err(Error::UnexpectedStatus(StatusCode::FORBIDDEN))
    ));
    Ok(())
}

#[tokio::test]
async fn thread_exists_uses_head() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let board = board(&stub).await?;
    stub.status(&thread_url(1), StatusCode::OK);
    stub.status(&thread_url(2), StatusCode::NOT_FOUND);

    assert!(board.thread_exists(1).await?);
    assert!(!board.thread_exists(2).await?);
    assert!(stub.seen().iter().skip(1).all(|s| s.method == "HEAD"));
    assert!(board.cached_ids().is_empty());
    Ok(())
}

fn page_body(threads: &[(u64, &[u64], u64)]) -> serde_json::Value {
    let threads: Vec<_> = threads
        .iter()
        .map(|&(op, replies, omitted)| {
            let mut topic = post(op, 0);
            topic["omitted_posts"] = json!(omitted);
            topic["omitted_images"] = json!(0);
            let mut posts = vec![topic];
            posts.extend(replies.iter().map(|&no| post(no, op)));
            json!({ "posts": posts })
        })
        .collect();
    json!({ "threads": threads })
}

#[tokio::test]
async fn listing_does_not_overwrite_cached_threads() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(PAGE_0, &page_body(&[(10, &[40, 41], 20), (20, &[], 0)]));
    stub.json(PAGE_0, &page_body(&[(10, &[45], 30), (30, &[31], 0)]));

    let first = board.get_threads(0).await?;
    assert_eq!(first.len(), 2);
    {
        let t = first[0].lock().await;
        assert!(t.is_partial());
        assert!(!t.wants_update());
        assert_eq!(t.last_reply_id(), None);
        assert_eq!(replies(&t), [40, 41]);
    }

    let second = board.get_threads(0).await?;
    assert!(Arc::ptr_eq(&first[0], &second[0]));
    {
        let t = second[0].lock().await;
        assert!(t.wants_update());
        assert_eq!(replies(&t), [40, 41]);
        assert_eq!(t.omitted_posts(), 20);
    }
    assert!(!second[1].lock().await.wants_update());
    assert_eq!(board.cached_ids(), [10, 20, 30]);
    Ok(())
}

#[tokio::test]
async fn refresh_cache_updates_flagged_threads_and_survives_eviction() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(PAGE_0, &page_body(&[(10, &[11], 0), (20, &[21], 0)]));
    board.get_threads(0).await?;
    board.get_threads(0).await?; // both flagged now

    stub.json(&thread_url(10), &thread_body(10, &[11, 12, 13]));
    stub.status(&thread_url(20), StatusCode::NOT_FOUND);

    let total = board.refresh_cache(true).await?;
    assert_eq!(total, 2);
    assert_eq!(board.cached_ids(), [10]);
    let t = board.cached(10).unwrap();
    let t = t.lock().await;
    assert!(!t.wants_update());
    assert_eq!(t.last_reply_id(), Some(13));
    Ok(())
}

#[tokio::test]
async fn refresh_cache_can_skip_unflagged_threads() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(&thread_url(1), &thread_body(1, &[2]));
    board.get_thread(1).await?;

    assert_eq!(board.refresh_cache(true).await?, 0);
    assert_eq!(stub.hits(&thread_url(1)), 1);

    board.refresh_cache(false).await?;
    assert_eq!(stub.hits(&thread_url(1)), 2);
    Ok(())
}

#[tokio::test]
async fn clear_cache_forces_refetch() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(&thread_url(1), &thread_body(1, &[2]));

    let old = board.get_thread(1).await?.unwrap();
    board.clear_cache();
    assert!(board.cached_ids().is_empty());

    let fresh = board.get_thread(1).await?.unwrap();
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert_eq!(stub.hits(&thread_url(1)), 2);
    // a fresh fetch carries no precondition
    assert_eq!(stub.last_for(&thread_url(1)).unwrap().if_modified_since, None);
    Ok(())
}

#[tokio::test]
async fn catalog_unpacks_last_replies() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    let mut op = post(10, 0);
    op["omitted_posts"] = json!(5);
    op["last_replies"] = json!([post(16, 10), post(17, 10)]);
    stub.json(
        CATALOG,
        &json!([
            {"page": 0, "threads": [op, post(20, 0)]},
            {"page": 1, "threads": [post(30, 0)]}
        ]),
    );

    let threads = board.get_all_threads(false).await?;
    assert_eq!(threads.len(), 3);
    let t = threads[0].lock().await;
    assert_eq!(t.id(), 10);
    assert_eq!(replies(&t), [16, 17]);
    assert_eq!(t.omitted_posts(), 5);
    assert_eq!(t.topic().id(), 10);
    drop(t);
    assert_eq!(threads[1].lock().await.num_replies(), 0);
    assert_eq!(board.cached_ids(), [10, 20, 30]);
    Ok(())
}

#[tokio::test]
async fn expanded_listing_fetches_each_thread_and_drops_404s() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(
        THREADS,
        &json!([
            {"page": 0, "threads": [{"no": 3, "last_modified": 1}, {"no": 1, "last_modified": 2}]},
            {"page": 1, "threads": [{"no": 2, "last_modified": 3}]}
        ]),
    );
    stub.json(&thread_url(3), &thread_body(3, &[4]));
    stub.status(&thread_url(1), StatusCode::NOT_FOUND);
    stub.json(&thread_url(2), &thread_body(2, &[]));

    assert_eq!(board.get_all_thread_ids().await?, [3, 1, 2]);

    let threads = board.get_all_threads(true).await?;
    let mut ids = Vec::new();
    for t in &threads {
        ids.push(t.lock().await.id());
    }
    assert_eq!(ids, [3, 2]);
    assert_eq!(threads[1].lock().await.last_reply_id(), Some(2));
    Ok(())
}

#[tokio::test]
async fn expand_turns_partial_thread_into_full() -> anyhow::Result<()> {
    let stub = StubTransport::new();
    let mut board = board(&stub).await?;
    stub.json(PAGE_0, &page_body(&[(10, &[14], 3)]));
    stub.json(&thread_url(10), &thread_body(10, &[11, 12, 13, 14]));

    let thread = board.get_threads(0).await?.remove(0);
    assert_eq!(board.expand_thread(&thread).await?, Update::Applied(3));
    {
        let t = thread.lock().await;
        assert!(!t.is_partial());
        assert_eq!(replies(&t), [11, 12, 13, 14]);
    }

    // already full
    assert_eq!(board.expand_thread(&thread).await?, Update::Skipped);
    assert_eq!(stub.hits(&thread_url(10)), 1);
    Ok(())
}

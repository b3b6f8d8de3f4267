use dot8ch::{board::Board, directory::BoardDirectory, Site};
use simple_logger::SimpleLogger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // setting up logging.
    SimpleLogger::new().init()?;

    let mut directory = BoardDirectory::new();
    let mut v = Board::new(&mut directory, "v", &Site::new(true), None).await?;
    println!("/{}/ - {} ({:?} posts)", v.name(), v.title(), v.num_posts());

    // Pages start at 0.
    let threads = v.get_threads(0).await?;
    println!("got {} threads from the first page", threads.len());

    // Asking again only flags the cached threads...
    v.get_threads(0).await?;

    // ...which we can then bring up to date in one go.
    let new_posts = v.refresh_cache(true).await?;
    println!("{new_posts} new posts across the first page");

    for thread in &threads {
        let thread = thread.lock().await;
        for url in thread.files() {
            println!("{url}");
        }
    }

    Ok(())
}

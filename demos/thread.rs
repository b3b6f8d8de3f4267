use dot8ch::{board::Board, directory::BoardDirectory, Site};
use simple_logger::SimpleLogger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // setting up the logger
    SimpleLogger::new().init()?;

    // The directory holds the board listing, fetched once.
    let mut directory = BoardDirectory::new();
    let mut tech = Board::new(&mut directory, "tech", &Site::new(true), None).await?;

    // Pick the first thread on the board.
    let ids = tech.get_all_thread_ids().await?;
    let Some(&first) = ids.first() else {
        println!("/tech/ is empty");
        return Ok(());
    };

    let Some(thread) = tech.get_thread(first).await? else {
        println!("thread {first} 404'd before we got to it");
        return Ok(());
    };

    {
        let thread = thread.lock().await;
        println!("{} ({} replies)", thread.url(), thread.num_replies());
        println!("sticky? {} closed? {}", thread.is_sticky(), thread.is_closed());
        println!("op says: {}", thread.topic().text_comment());
        for file in thread.file_objects() {
            println!("  {:?} -> {:?}", file.original_name(), file.file_url());
        }
    }

    // Later we ask for new replies. Nothing was posted in the meantime most likely.
    let update = tech.update_thread(&thread, false).await?;
    println!("{:?}: {} new posts", update, update.new_posts());

    Ok(())
}

//! Headless stories demo.
//!
//! Seeds an in-memory backend, publishes two stories, composes the strip and
//! plays it through with every media load succeeding instantly.
//!
//! ```bash
//! STORIES_IMAGE_DURATION_MS=500 cargo run -p stories-client --bin stories-demo
//! ```

use std::sync::Arc;
use stories_client::{
    AuthorDisplay, Clock, MemoryProfiles, MemoryStore, NewStory, SessionIdentity, StoriesConfig,
    StoriesSession, SystemClock, UserId, ViewerCommand, ViewerEvent,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = StoriesConfig::from_env()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::new(clock.clone()));

    let me = UserId::new();
    let friend = UserId::new();
    let profiles = MemoryProfiles::new()
        .with_profile(me, AuthorDisplay::new("You", ""))
        .with_profile(friend, AuthorDisplay::new("Robin", ""));
    let identity = Arc::new(SessionIdentity::signed_in(friend));

    let mut session = StoriesSession::new(
        config,
        store.clone(),
        Arc::new(profiles),
        identity.clone(),
        clock,
    );

    session
        .publish(
            NewStory::image("https://www.dropbox.com/s/demo/sunrise.jpg").with_caption("morning"),
        )
        .await?;
    session
        .publish(NewStory::video("https://cdn.example.com/clips/waves.mp4"))
        .await?;

    identity.sign_in(me);
    let strip = session.refresh_feed().await;
    for (position, entry) in strip.entries().iter().enumerate() {
        let label = match &entry.story {
            Some(story) => format!("{} ({})", story.media_url(), story.media_type().name()),
            None => "+ add your story".to_string(),
        };
        println!("[{position}] {}: {label}", entry.author_display.display_name);
    }

    let Some(mut viewer) = session.open_strip(&strip, 1) else {
        println!("nothing to play");
        return Ok(());
    };
    while let Some(event) = viewer.next_event().await {
        match event {
            ViewerEvent::Load {
                index,
                generation,
                story,
            } => {
                println!("loading #{index}: {}", story.media_url());
                viewer
                    .send(ViewerCommand::MediaReady {
                        generation,
                        duration: None,
                    })
                    .await;
            }
            ViewerEvent::Started { index, .. } => println!("playing #{index}"),
            ViewerEvent::Closed { failed } => {
                println!("viewer closed ({} failed)", failed.len());
                break;
            }
            _ => {}
        }
    }

    let strip = session.restamp_feed().unwrap_or(strip);
    let viewed = strip.entries().iter().filter(|e| e.viewed).count();
    println!("{viewed} of {} entries viewed", strip.len());
    Ok(())
}

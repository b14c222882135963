//! Stories client: publishing, the feed strip, and the timed viewer.
//!
//! This crate provides:
//! - Collaborator traits for the story store, profile directory and identity
//! - In-memory implementations of every collaborator
//! - A feed service that keeps the last good strip when fetches fail
//! - A viewer worker that drives [`stories_core::PlaybackEngine`] from a timer
//! - [`StoriesSession`], which wires all of the above together
//!
//! # Quick Start
//!
//! ```ignore
//! use stories_client::{StoriesSession, StoriesConfig, SystemClock, NewStory};
//!
//! let config = StoriesConfig::from_env()?;
//! let mut session = StoriesSession::new(config, store, profiles, identity, Arc::new(SystemClock));
//! session.publish(NewStory::image("https://www.dropbox.com/s/abc/beach.jpg")).await?;
//!
//! let strip = session.refresh_feed().await;
//! if let Some(mut viewer) = session.open_strip(&strip, 1) {
//!     while let Some(event) = viewer.next_event().await {
//!         // render, load media, forward taps
//!     }
//! }
//! ```

pub mod backend;
pub mod clock;
pub mod config;
pub mod feed;
pub mod memory;
pub mod publish;
pub mod session;
pub mod testing;
pub mod viewer;

// Primary public API
pub use backend::{Identity, ProfileDirectory, StoryStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, StoriesConfig};
pub use feed::{FeedService, FeedSnapshot, ViewedStories};
pub use memory::{MemoryProfiles, MemoryStore, SessionIdentity};
pub use publish::StoryPublisher;
pub use session::StoriesSession;
pub use viewer::{StoryViewer, ViewerCommand, ViewerEvent, ViewerHandle};

pub use stories_core::{
    AuthorDisplay, CreateError, FeedEntry, FetchError, MediaType, NewStory, Phase, Story,
    StoryId, TapZone, UserId, ViewerState,
};

//! Ephemeral stories: media that lives for 24 hours.
//!
//! This crate provides:
//! - The story data model with a fixed, write-once expiry
//! - Share-link normalization for media URLs
//! - Feed composition (one entry per author, most recent first)
//! - A playback state machine for the story viewer
//!
//! Everything here is synchronous and free of I/O. Fetching, timers and
//! collaborator wiring live in `stories-client`.
//!
//! # Quick Start
//!
//! ```ignore
//! use stories_core::{feed, FeedEntry, AuthorDisplay, PlaybackEngine, PlaybackConfig};
//!
//! let strip = feed::compose(Some(me), &active, FeedEntry::placeholder(my_display));
//! let mut engine = PlaybackEngine::new(author_stories, PlaybackConfig::default());
//! engine.media_ready(None);
//! while !engine.is_closed() {
//!     engine.tick();
//! }
//! ```

pub mod error;
pub mod feed;
pub mod id;
pub mod media_link;
pub mod playback;
pub mod story;
pub mod ttl;

// Primary public API
pub use error::{CreateError, Error, FetchError, Result};
pub use id::{StoryId, UserId};
pub use playback::{
    Phase, PlaybackConfig, PlaybackEngine, PlaybackEvent, Step, TapZone, ViewerState,
};
pub use story::{AuthorDisplay, FeedEntry, MediaType, NewStory, Story, StoryRecord};

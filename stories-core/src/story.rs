//! Story and feed entry types.

use crate::id::{StoryId, UserId};
use crate::{media_link, ttl};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media a story carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// A still image, shown for a fixed duration.
    Image,
    /// A video, shown for its own length when known.
    Video,
}

impl MediaType {
    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

/// One unit of ephemeral content.
///
/// `expires_at` is fixed when the story is built and cannot be changed
/// afterwards; there is deliberately no setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoryRecord", into = "StoryRecord")]
pub struct Story {
    id: StoryId,
    author_id: UserId,
    media_url: String,
    media_type: MediaType,
    caption: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Story {
    /// Build a story created at `created_at`; the expiry is derived once here.
    pub fn new(
        id: StoryId,
        author_id: UserId,
        media_url: impl Into<String>,
        media_type: MediaType,
        caption: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            author_id,
            media_url: media_url.into(),
            media_type,
            caption,
            created_at,
            expires_at: ttl::compute_expiry(created_at),
        }
    }

    pub fn id(&self) -> StoryId {
        self.id
    }

    pub fn author_id(&self) -> UserId {
        self.author_id
    }

    pub fn media_url(&self) -> &str {
        &self.media_url
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the story is still visible at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        ttl::is_active(self, now)
    }

    /// Re-apply link normalization to the media URL. Timestamps are untouched.
    pub fn normalized(mut self) -> Self {
        self.media_url = media_link::normalize(&self.media_url);
        self
    }
}

/// Raw record shape exchanged with a backend.
///
/// `expiresAt` may be omitted, in which case it is derived from `createdAt`.
/// When present it must agree with the fixed TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRecord {
    pub id: StoryId,
    pub author_id: UserId,
    pub media_url: String,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A record whose expiry disagrees with its creation time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("story {id} expires at {expires_at}, expected {expected}")]
pub struct ExpiryMismatch {
    pub id: StoryId,
    pub expires_at: DateTime<Utc>,
    pub expected: DateTime<Utc>,
}

impl TryFrom<StoryRecord> for Story {
    type Error = ExpiryMismatch;

    fn try_from(record: StoryRecord) -> Result<Self, Self::Error> {
        let story = Story::new(
            record.id,
            record.author_id,
            record.media_url,
            record.media_type,
            record.caption,
            record.created_at,
        );
        match record.expires_at {
            Some(expires_at) if expires_at != story.expires_at => Err(ExpiryMismatch {
                id: story.id,
                expires_at,
                expected: story.expires_at,
            }),
            _ => Ok(story),
        }
    }
}

impl From<Story> for StoryRecord {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            author_id: story.author_id,
            media_url: story.media_url,
            media_type: story.media_type,
            caption: story.caption,
            created_at: story.created_at,
            expires_at: Some(story.expires_at),
        }
    }
}

/// Input for creating a story, before the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStory {
    pub media_url: String,
    pub media_type: MediaType,
    pub caption: Option<String>,
}

impl NewStory {
    /// Create a draft for the given media.
    pub fn new(media_url: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            media_url: media_url.into(),
            media_type,
            caption: None,
        }
    }

    /// Shorthand for an image draft.
    pub fn image(media_url: impl Into<String>) -> Self {
        Self::new(media_url, MediaType::Image)
    }

    /// Shorthand for a video draft.
    pub fn video(media_url: impl Into<String>) -> Self {
        Self::new(media_url, MediaType::Video)
    }

    /// Set the caption. Blank captions are dropped.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        let caption = caption.into();
        self.caption = if caption.trim().is_empty() {
            None
        } else {
            Some(caption)
        };
        self
    }
}

/// Denormalized author info for rendering a feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthorDisplay {
    pub display_name: String,
    pub avatar_url: String,
}

impl AuthorDisplay {
    pub fn new(display_name: impl Into<String>, avatar_url: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            avatar_url: avatar_url.into(),
        }
    }

    /// Fallback used when the profile lookup yields nothing.
    pub fn unknown(fallback_name: impl Into<String>) -> Self {
        Self::new(fallback_name, "")
    }
}

/// Display-ready projection used by the feed strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// The underlying story; `None` for the "add your own" slot.
    pub story: Option<Story>,
    pub author_display: AuthorDisplay,
    pub is_own: bool,
    /// Session-local; never persisted.
    pub viewed: bool,
}

impl FeedEntry {
    /// The synthetic "add your own" slot.
    pub fn placeholder(author_display: AuthorDisplay) -> Self {
        Self {
            story: None,
            author_display,
            is_own: true,
            viewed: false,
        }
    }

    /// An entry carrying a story.
    pub fn for_story(story: Story, is_own: bool) -> Self {
        Self {
            story: Some(story),
            author_display: AuthorDisplay::default(),
            is_own,
            viewed: false,
        }
    }

    /// Whether this is the placeholder slot.
    pub fn is_placeholder(&self) -> bool {
        self.story.is_none()
    }

    /// Author of the carried story, if any.
    pub fn author_id(&self) -> Option<UserId> {
        self.story.as_ref().map(Story::author_id)
    }

    /// Creation time of the carried story, if any.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.story.as_ref().map(Story::created_at)
    }
}

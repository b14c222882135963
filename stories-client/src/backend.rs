//! Collaborators the stories subsystem consumes.
//!
//! These are the only contracts with the rest of the application: a durable
//! story store, a profile directory and the signed-in identity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stories_core::error::{CreateResult, FetchResult};
use stories_core::{AuthorDisplay, NewStory, Story, UserId};

/// Durable record of stories. Create and query only.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Create a story authored by `author_id`.
    ///
    /// Fails with `Unauthenticated` when there is no author and with
    /// `InvalidMedia` when the media URL is empty.
    async fn create(&self, author_id: Option<UserId>, draft: NewStory) -> CreateResult<Story>;

    /// Stories with `expires_at > now`, optionally for one author, newest first.
    async fn query_active(
        &self,
        now: DateTime<Utc>,
        author_id: Option<UserId>,
    ) -> FetchResult<Vec<Story>>;
}

/// Lookup of display info for authors.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// `None` when the profile does not exist; never an error.
    async fn get(&self, author_id: UserId) -> Option<AuthorDisplay>;
}

/// The signed-in user, if any.
pub trait Identity: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

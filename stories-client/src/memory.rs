//! In-memory collaborators.
//!
//! `MemoryStore` keeps records in a vector behind an async lock and applies
//! the same validation and filtering rules a remote store is expected to.
//! Expired records stay until `purge_expired` is called; nothing calls it
//! automatically.

use crate::backend::{Identity, ProfileDirectory, StoryStore};
use crate::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock as StdRwLock};
use stories_core::error::{CreateError, CreateResult, FetchResult};
use stories_core::{feed, AuthorDisplay, NewStory, Story, StoryId, UserId};
use tokio::sync::RwLock;

/// Story store held in process memory.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    stories: RwLock<Vec<Story>>,
}

impl MemoryStore {
    /// Create an empty store stamping records with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            stories: RwLock::new(Vec::new()),
        }
    }

    /// Insert an already-built record, keeping its timestamps.
    pub async fn insert(&self, story: Story) {
        self.stories.write().await.push(story);
    }

    /// Number of records held, expired ones included.
    pub async fn len(&self) -> usize {
        self.stories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stories.read().await.is_empty()
    }

    /// Physically drop records that are no longer active at `now`.
    ///
    /// Only removes what `query_active` would already hide.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut stories = self.stories.write().await;
        let before = stories.len();
        stories.retain(|story| story.is_active(now));
        let purged = before - stories.len();
        if purged > 0 {
            tracing::debug!(purged, "purged expired stories");
        }
        purged
    }

    /// Look up a record by id, active or not.
    pub async fn get(&self, id: StoryId) -> Option<Story> {
        self.stories
            .read()
            .await
            .iter()
            .find(|story| story.id() == id)
            .cloned()
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn create(&self, author_id: Option<UserId>, draft: NewStory) -> CreateResult<Story> {
        let author_id = author_id.ok_or(CreateError::Unauthenticated)?;
        if draft.media_url.trim().is_empty() {
            return Err(CreateError::invalid_media("media URL is empty"));
        }

        let story = Story::new(
            StoryId::new(),
            author_id,
            draft.media_url,
            draft.media_type,
            draft.caption,
            self.clock.now(),
        );
        self.stories.write().await.push(story.clone());
        Ok(story)
    }

    async fn query_active(
        &self,
        now: DateTime<Utc>,
        author_id: Option<UserId>,
    ) -> FetchResult<Vec<Story>> {
        let stories = self.stories.read().await;
        let mut active: Vec<Story> = stories
            .iter()
            .filter(|story| story.is_active(now))
            .filter(|story| author_id.map_or(true, |author| story.author_id() == author))
            .cloned()
            .collect();
        active.sort_by(feed::recency);
        Ok(active)
    }
}

/// Profile directory held in process memory.
#[derive(Debug, Default)]
pub struct MemoryProfiles {
    profiles: StdRwLock<HashMap<UserId, AuthorDisplay>>,
}

impl MemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile.
    pub fn insert(&self, author_id: UserId, display: AuthorDisplay) {
        self.profiles
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(author_id, display);
    }

    /// Builder-style `insert`.
    pub fn with_profile(self, author_id: UserId, display: AuthorDisplay) -> Self {
        self.insert(author_id, display);
        self
    }
}

#[async_trait]
impl ProfileDirectory for MemoryProfiles {
    async fn get(&self, author_id: UserId) -> Option<AuthorDisplay> {
        self.profiles
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&author_id)
            .cloned()
    }
}

/// An identity that can be signed in and out.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    user: StdRwLock<Option<UserId>>,
}

impl SessionIdentity {
    /// Start signed in as `user`.
    pub fn signed_in(user: UserId) -> Self {
        Self {
            user: StdRwLock::new(Some(user)),
        }
    }

    /// Start signed out.
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: UserId) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl Identity for SessionIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        *self.user.read().unwrap_or_else(|e| e.into_inner())
    }
}

//! Testing utilities for the stories client.
//!
//! This module provides tools for integration testing:
//! - `FailingStore` to simulate an unreachable backend on demand
//! - `TestHarness` wiring in-memory collaborators and a manual clock into a
//!   `StoriesSession`

use crate::backend::StoryStore;
use crate::clock::{Clock, ManualClock};
use crate::config::StoriesConfig;
use crate::memory::{MemoryProfiles, MemoryStore, SessionIdentity};
use crate::session::StoriesSession;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use stories_core::error::{CreateResult, FetchError, FetchResult};
use stories_core::{AuthorDisplay, MediaType, NewStory, Story, StoryId, UserId};

/// A store that can be switched into failing reads.
pub struct FailingStore {
    inner: Arc<MemoryStore>,
    failing: AtomicBool,
    queries: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            queries: AtomicUsize::new(0),
        }
    }

    /// The wrapped store, for seeding records directly.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Make `query_active` fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// How many times `query_active` was called.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoryStore for FailingStore {
    async fn create(&self, author_id: Option<UserId>, draft: NewStory) -> CreateResult<Story> {
        self.inner.create(author_id, draft).await
    }

    async fn query_active(
        &self,
        now: DateTime<Utc>,
        author_id: Option<UserId>,
    ) -> FetchResult<Vec<Story>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable {
                reason: "simulated outage".to_string(),
            });
        }
        self.inner.query_active(now, author_id).await
    }
}

/// Test harness for running story scenarios.
pub struct TestHarness {
    /// The clock every collaborator reads.
    pub clock: Arc<ManualClock>,
    /// The backing store, switchable into failure.
    pub store: Arc<FailingStore>,
    /// Profile directory.
    pub profiles: Arc<MemoryProfiles>,
    /// The signed-in identity.
    pub identity: Arc<SessionIdentity>,
    /// The session under test.
    pub session: StoriesSession,
}

impl TestHarness {
    /// The fixed start time of every harness.
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// A harness signed in as `viewer`, with the given config.
    pub fn with_config(viewer: UserId, config: StoriesConfig) -> Self {
        let clock = Arc::new(ManualClock::new(Self::epoch()));
        let store = Arc::new(FailingStore::new(Arc::new(MemoryStore::new(clock.clone()))));
        let profiles = Arc::new(MemoryProfiles::new());
        let identity = Arc::new(SessionIdentity::signed_in(viewer));
        let session = StoriesSession::new(
            config,
            store.clone(),
            profiles.clone(),
            identity.clone(),
            clock.clone(),
        );
        Self {
            clock,
            store,
            profiles,
            identity,
            session,
        }
    }

    /// A harness signed in as `viewer` with default config.
    pub fn new(viewer: UserId) -> Self {
        Self::with_config(viewer, StoriesConfig::new())
    }

    /// Register a display name for `user`.
    pub fn profile(&self, user: UserId, name: &str) -> &Self {
        self.profiles
            .insert(user, AuthorDisplay::new(name, format!("https://avatars.example.com/{user}")));
        self
    }

    /// Seed a story by `author` created `minutes_ago` before the clock's now.
    pub async fn seed(&self, author: UserId, minutes_ago: i64, media_type: MediaType) -> Story {
        let id = StoryId::new();
        let story = Story::new(
            id,
            author,
            format!("https://cdn.example.com/{id}"),
            media_type,
            None,
            self.clock.now() - Duration::minutes(minutes_ago),
        );
        self.store.inner().insert(story.clone()).await;
        story
    }
}

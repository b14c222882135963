//! Feed service: fetch, filter, compose and cache the story strip.
//!
//! A fetch failure never surfaces as an error. The service serves the own
//! entry plus whatever it composed last time, marks the snapshot stale and
//! keeps the error for a passive indicator. Calling `refresh` again is the
//! retry; nothing retries automatically.

use crate::backend::{Identity, ProfileDirectory, StoryStore};
use crate::clock::Clock;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use stories_core::{feed, AuthorDisplay, FeedEntry, FetchError, Story, StoryId, UserId};

/// Session-local set of stories the user has watched.
///
/// Cloning shares the set; it is never persisted.
#[derive(Debug, Clone, Default)]
pub struct ViewedStories(Arc<Mutex<HashSet<StoryId>>>);

impl ViewedStories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a story as viewed. Returns `true` the first time.
    pub fn mark(&self, id: StoryId) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).insert(id)
    }

    pub fn contains(&self, id: StoryId) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An immutable composed feed. Viewers built from one snapshot are not
/// affected by later refreshes.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    entries: Arc<[FeedEntry]>,
    viewer: Option<UserId>,
    composed_at: DateTime<Utc>,
    stale: bool,
    last_error: Option<FetchError>,
}

impl FeedSnapshot {
    /// All entries; the first is always the own entry.
    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn own_entry(&self) -> &FeedEntry {
        &self.entries[0]
    }

    /// Entries for other authors, most recent first.
    pub fn others(&self) -> &[FeedEntry] {
        &self.entries[1..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a snapshot holds at least the own entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn viewer(&self) -> Option<UserId> {
        self.viewer
    }

    pub fn composed_at(&self) -> DateTime<Utc> {
        self.composed_at
    }

    /// Whether this was served from cache after a failed fetch.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Stories that can be played, in strip order, with their entry index.
    pub fn playable(&self) -> impl Iterator<Item = (usize, &Story)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.story.as_ref().map(|story| (i, story)))
    }
}

/// Builds feed snapshots from the store, caching the last good one.
pub struct FeedService {
    store: Arc<dyn StoryStore>,
    profiles: Arc<dyn ProfileDirectory>,
    identity: Arc<dyn Identity>,
    clock: Arc<dyn Clock>,
    fallback_name: String,
    viewed: ViewedStories,
    last_good: Option<FeedSnapshot>,
    current: Option<FeedSnapshot>,
}

impl FeedService {
    pub fn new(
        store: Arc<dyn StoryStore>,
        profiles: Arc<dyn ProfileDirectory>,
        identity: Arc<dyn Identity>,
        clock: Arc<dyn Clock>,
        fallback_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            profiles,
            identity,
            clock,
            fallback_name: fallback_name.into(),
            viewed: ViewedStories::new(),
            last_good: None,
            current: None,
        }
    }

    /// The shared viewed set.
    pub fn viewed(&self) -> &ViewedStories {
        &self.viewed
    }

    /// The most recent snapshot, if `refresh` has run.
    pub fn current(&self) -> Option<&FeedSnapshot> {
        self.current.as_ref()
    }

    /// Fetch and compose a fresh snapshot, degrading to the cache on failure.
    pub async fn refresh(&mut self) -> FeedSnapshot {
        let viewer = self.identity.current_user_id();
        let now = self.clock.now();
        let placeholder = FeedEntry::placeholder(self.own_display(viewer).await);

        let snapshot = match self.store.query_active(now, None).await {
            Ok(stories) => {
                let active: Vec<Story> = stories
                    .into_iter()
                    .filter(|story| story.is_active(now))
                    .map(Story::normalized)
                    .collect();
                let mut entries = feed::compose(viewer, &active, placeholder);
                self.fill_author_displays(&mut entries[1..]).await;
                self.stamp_viewed(&mut entries);
                tracing::debug!(
                    fetched = active.len(),
                    authors = entries.len() - 1,
                    "composed story feed"
                );

                let snapshot = FeedSnapshot {
                    entries: entries.into(),
                    viewer,
                    composed_at: now,
                    stale: false,
                    last_error: None,
                };
                self.last_good = Some(snapshot.clone());
                snapshot
            }
            Err(error) => {
                tracing::warn!(%error, "story fetch failed, serving cached feed");
                let entries = self.degraded_entries(viewer, placeholder, now);
                FeedSnapshot {
                    entries: entries.into(),
                    viewer,
                    composed_at: now,
                    stale: true,
                    last_error: Some(error),
                }
            }
        };

        self.current = Some(snapshot.clone());
        snapshot
    }

    /// Record a story as viewed.
    pub fn mark_viewed(&self, id: StoryId) -> bool {
        self.viewed.mark(id)
    }

    /// Re-stamp the current snapshot's `viewed` flags without fetching.
    pub fn restamp(&mut self) -> Option<FeedSnapshot> {
        let current = self.current.as_ref()?;
        let mut entries = current.entries.to_vec();
        self.stamp_viewed(&mut entries);
        let snapshot = FeedSnapshot {
            entries: entries.into(),
            ..current.clone()
        };
        self.current = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Own entry plus the last good entries that are still active.
    fn degraded_entries(
        &self,
        viewer: Option<UserId>,
        placeholder: FeedEntry,
        now: DateTime<Utc>,
    ) -> Vec<FeedEntry> {
        let cached = self.last_good.as_ref();
        let still_active =
            |entry: &&FeedEntry| entry.story.as_ref().is_some_and(|s| s.is_active(now));

        let own = cached
            .filter(|snapshot| snapshot.viewer == viewer)
            .map(FeedSnapshot::own_entry)
            .filter(still_active)
            .map(|entry| FeedEntry {
                author_display: placeholder.author_display.clone(),
                ..entry.clone()
            })
            .unwrap_or(placeholder);

        let mut entries = vec![own];
        if let Some(cached) = cached {
            entries.extend(
                cached
                    .others()
                    .iter()
                    .filter(still_active)
                    .filter(|entry| viewer.is_none() || entry.author_id() != viewer)
                    .cloned(),
            );
        }
        self.stamp_viewed(&mut entries);
        entries
    }

    async fn own_display(&self, viewer: Option<UserId>) -> AuthorDisplay {
        match viewer {
            Some(id) => self.display_for(id).await,
            None => AuthorDisplay::unknown(&self.fallback_name),
        }
    }

    async fn display_for(&self, author: UserId) -> AuthorDisplay {
        self.profiles
            .get(author)
            .await
            .unwrap_or_else(|| AuthorDisplay::unknown(&self.fallback_name))
    }

    async fn fill_author_displays(&self, entries: &mut [FeedEntry]) {
        let lookups = entries.iter().map(|entry| async move {
            match entry.author_id() {
                Some(author) => self.display_for(author).await,
                None => AuthorDisplay::unknown(&self.fallback_name),
            }
        });
        let displays = join_all(lookups).await;
        for (entry, display) in entries.iter_mut().zip(displays) {
            entry.author_display = display;
        }
    }

    fn stamp_viewed(&self, entries: &mut [FeedEntry]) {
        for entry in entries {
            entry.viewed = entry
                .story
                .as_ref()
                .is_some_and(|story| self.viewed.contains(story.id()));
        }
    }
}

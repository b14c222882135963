//! StoriesSession - the primary public API for the stories strip.
//!
//! This module wires the collaborators into one object: publishing, feed
//! refresh with graceful degradation, and opening viewers either over the
//! cross-author strip or over a single author's stories.

use crate::backend::{Identity, ProfileDirectory, StoryStore};
use crate::clock::Clock;
use crate::config::StoriesConfig;
use crate::feed::{FeedService, FeedSnapshot, ViewedStories};
use crate::publish::StoryPublisher;
use crate::viewer::{StoryViewer, ViewerHandle};
use std::sync::Arc;
use stories_core::error::{CreateResult, FetchResult};
use stories_core::{feed, NewStory, Story, UserId};

/// A stories session for one signed-in (or signed-out) client.
pub struct StoriesSession {
    config: StoriesConfig,
    store: Arc<dyn StoryStore>,
    clock: Arc<dyn Clock>,
    publisher: StoryPublisher,
    feed: FeedService,
    viewer: StoryViewer,
}

impl StoriesSession {
    /// Create a session over the given collaborators.
    pub fn new(
        config: StoriesConfig,
        store: Arc<dyn StoryStore>,
        profiles: Arc<dyn ProfileDirectory>,
        identity: Arc<dyn Identity>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let feed = FeedService::new(
            store.clone(),
            profiles,
            identity.clone(),
            clock.clone(),
            config.fallback_display_name.clone(),
        );
        let viewer = StoryViewer::new(&config).with_viewed(feed.viewed().clone());
        let publisher = StoryPublisher::new(store.clone(), identity);

        Self {
            config,
            store,
            clock,
            publisher,
            feed,
            viewer,
        }
    }

    pub fn config(&self) -> &StoriesConfig {
        &self.config
    }

    /// Publish a new story as the signed-in user.
    ///
    /// Errors are reported here, to the initiating action. A successful
    /// story appears after the next `refresh_feed`.
    pub async fn publish(&self, draft: NewStory) -> CreateResult<Story> {
        self.publisher.publish(draft).await
    }

    /// Fetch and compose the strip. Never fails; see [`FeedSnapshot::is_stale`].
    pub async fn refresh_feed(&mut self) -> FeedSnapshot {
        self.feed.refresh().await
    }

    /// The last composed strip.
    pub fn feed(&self) -> Option<&FeedSnapshot> {
        self.feed.current()
    }

    /// Re-apply `viewed` flags to the last strip, e.g. after a viewer closes.
    pub fn restamp_feed(&mut self) -> Option<FeedSnapshot> {
        self.feed.restamp()
    }

    /// Stories viewed during this session.
    pub fn viewed(&self) -> &ViewedStories {
        self.feed.viewed()
    }

    /// Play the strip of `snapshot` from the entry at `position`.
    ///
    /// Returns `None` for the placeholder slot or an out-of-range position.
    pub fn open_strip(&self, snapshot: &FeedSnapshot, position: usize) -> Option<ViewerHandle> {
        snapshot.entries().get(position)?.story.as_ref()?;

        let mut start = 0;
        let mut stories = Vec::with_capacity(snapshot.len());
        for (index, story) in snapshot.playable() {
            if index < position {
                start += 1;
            }
            stories.push(story.clone());
        }
        Some(self.viewer.open(stories, start))
    }

    /// Play every active story of `author`, oldest first.
    pub async fn open_author(&self, author: UserId) -> FetchResult<ViewerHandle> {
        let now = self.clock.now();
        let mut stories: Vec<Story> = self
            .store
            .query_active(now, Some(author))
            .await?
            .into_iter()
            .filter(|story| story.is_active(now) && story.author_id() == author)
            .map(Story::normalized)
            .collect();
        stories.sort_by(|a, b| feed::recency(b, a));
        Ok(self.viewer.open(stories, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;
    use crate::viewer::ViewerEvent;
    use stories_core::{MediaType, Phase};

    #[tokio::test]
    async fn test_open_strip_skips_placeholder() {
        let me = UserId::new();
        let mut h = TestHarness::new(me);
        let a = UserId::new();
        let b = UserId::new();
        h.seed(a, 30, MediaType::Image).await;
        let newest = h.seed(b, 5, MediaType::Image).await;

        let snapshot = h.session.refresh_feed().await;
        assert_eq!(snapshot.len(), 3);
        assert!(h.session.open_strip(&snapshot, 0).is_none());
        assert!(h.session.open_strip(&snapshot, 7).is_none());

        let mut handle = h.session.open_strip(&snapshot, 1).unwrap();
        match handle.next_event().await {
            Some(ViewerEvent::Load { index, story, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(story.id(), newest.id());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(handle.state().len, 2);
        handle.close();
    }

    #[tokio::test]
    async fn test_open_strip_includes_own_story() {
        let me = UserId::new();
        let mut h = TestHarness::new(me);
        let mine = h.seed(me, 1, MediaType::Video).await;
        let theirs = h.seed(UserId::new(), 2, MediaType::Image).await;

        let snapshot = h.session.refresh_feed().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.entries()[0].story.as_ref().map(Story::id), Some(mine.id()));
        assert_eq!(snapshot.entries()[1].story.as_ref().map(Story::id), Some(theirs.id()));

        let state = h.session.open_strip(&snapshot, 1).unwrap().state();
        assert_eq!(state.len, 2);
        assert_eq!(state.index, 1);
    }

    #[tokio::test]
    async fn test_open_author_plays_oldest_first() {
        let h = TestHarness::new(UserId::new());
        let author = UserId::new();
        h.seed(author, 10, MediaType::Image).await;
        let first = h.seed(author, 300, MediaType::Image).await;
        h.seed(author, 60, MediaType::Video).await;
        h.seed(UserId::new(), 5, MediaType::Image).await;

        let mut handle = h.session.open_author(author).await.unwrap();
        assert_eq!(handle.state().len, 3);
        match handle.next_event().await {
            Some(ViewerEvent::Load { story, .. }) => assert_eq!(story.id(), first.id()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_open_author_without_stories_is_closed() {
        let h = TestHarness::new(UserId::new());
        let handle = h.session.open_author(UserId::new()).await.unwrap();
        assert_eq!(handle.wait().await.phase, Phase::Closed);
    }

    #[tokio::test]
    async fn test_open_author_fetch_failure_reported() {
        let h = TestHarness::new(UserId::new());
        h.store.set_failing(true);
        assert!(h.session.open_author(UserId::new()).await.is_err());
    }
}

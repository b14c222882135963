//! The write path: identity check, link validation, normalization, store.

use crate::backend::{Identity, StoryStore};
use std::sync::Arc;
use stories_core::error::{CreateError, CreateResult};
use stories_core::{media_link, NewStory, Story};

/// Publishes new stories on behalf of the signed-in user.
#[derive(Clone)]
pub struct StoryPublisher {
    store: Arc<dyn StoryStore>,
    identity: Arc<dyn Identity>,
}

impl StoryPublisher {
    pub fn new(store: Arc<dyn StoryStore>, identity: Arc<dyn Identity>) -> Self {
        Self { store, identity }
    }

    /// Validate, normalize and create a story.
    ///
    /// Nothing is written when validation fails. The new story shows up in
    /// the feed on its next refresh.
    pub async fn publish(&self, draft: NewStory) -> CreateResult<Story> {
        let author = self
            .identity
            .current_user_id()
            .ok_or(CreateError::Unauthenticated)?;

        let media_url = validate_media_url(&draft.media_url)?;
        let draft = NewStory {
            media_url: media_link::normalize(media_url),
            ..draft
        };

        let story = self.store.create(Some(author), draft).await?;
        tracing::info!(
            story = %story.id(),
            author = %author,
            media_type = story.media_type().name(),
            "published story"
        );
        Ok(story)
    }
}

/// Accept only http(s) links with a host; returns the trimmed link.
fn validate_media_url(raw: &str) -> CreateResult<&str> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(CreateError::invalid_media("media URL is empty"));
    }
    let Some((scheme, rest)) = url.split_once("://") else {
        return Err(unsupported(url));
    };
    if !(scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("http")) {
        return Err(unsupported(url));
    }
    if host(rest).is_empty() {
        return Err(CreateError::invalid_media(format!(
            "media URL has no host: {url}"
        )));
    }
    Ok(url)
}

/// Host part of everything after `scheme://`, without userinfo or port.
fn host(rest: &str) -> &str {
    let authority = rest
        .split(|c: char| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    match host.strip_prefix('[') {
        Some(bracketed) => bracketed.split(']').next().unwrap_or_default(),
        None => host.split(':').next().unwrap_or_default(),
    }
}

fn unsupported(url: &str) -> CreateError {
    CreateError::invalid_media(format!("unsupported media URL: {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StoryStore;
    use crate::clock::SystemClock;
    use crate::memory::{MemoryStore, SessionIdentity};
    use stories_core::{MediaType, UserId};

    fn publisher(identity: SessionIdentity) -> (Arc<MemoryStore>, StoryPublisher) {
        let store = Arc::new(MemoryStore::new(Arc::new(SystemClock)));
        let publisher = StoryPublisher::new(store.clone(), Arc::new(identity));
        (store, publisher)
    }

    #[tokio::test]
    async fn test_publish_normalizes_share_link() {
        let user = UserId::new();
        let (store, publisher) = publisher(SessionIdentity::signed_in(user));

        let story = publisher
            .publish(
                NewStory::video(" https://www.dropbox.com/s/k/clip.mp4?dl=0 ")
                    .with_caption("at the lake"),
            )
            .await
            .unwrap();

        assert_eq!(story.author_id(), user);
        assert_eq!(story.media_type(), MediaType::Video);
        assert_eq!(
            story.media_url(),
            "https://dl.dropboxusercontent.com/s/k/clip.mp4?dl=0"
        );
        assert_eq!(story.caption(), Some("at the lake"));
        assert_eq!(store.get(story.id()).await, Some(story));
    }

    #[tokio::test]
    async fn test_signed_out_cannot_publish() {
        let (store, publisher) = publisher(SessionIdentity::signed_out());

        let err = publisher
            .publish(NewStory::image("https://cdn.example.com/a.jpg"))
            .await
            .unwrap_err();

        assert_eq!(err, CreateError::Unauthenticated);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_media_rejected() {
        let (store, publisher) = publisher(SessionIdentity::signed_in(UserId::new()));

        for url in ["", "   ", "ftp://host/a.jpg", "content://media/1", "just text"] {
            let err = publisher.publish(NewStory::image(url)).await.unwrap_err();
            assert!(
                matches!(err, CreateError::InvalidMedia { .. }),
                "{url:?} gave {err:?}"
            );
        }
        assert!(store.query_active(chrono::Utc::now(), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_media_url_without_host_rejected() {
        let (store, publisher) = publisher(SessionIdentity::signed_in(UserId::new()));

        for url in [
            "https://",
            "http:///beach.jpg",
            "https://?dl=0",
            "https://user@/a.jpg",
            "https://:443/a.jpg",
            "https://[]/a.jpg",
        ] {
            let err = publisher.publish(NewStory::image(url)).await.unwrap_err();
            assert!(
                matches!(err, CreateError::InvalidMedia { .. }),
                "{url:?} gave {err:?}"
            );
        }
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_host_extraction() {
        assert_eq!(host("cdn.example.com/a.jpg"), "cdn.example.com");
        assert_eq!(host("me:pw@cdn.example.com:8443/a.jpg"), "cdn.example.com");
        assert_eq!(host("[::1]:8080/a.jpg"), "::1");
        assert_eq!(host("example.com?x=1"), "example.com");
        assert_eq!(host(""), "");
    }
}

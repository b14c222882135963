//! Feed composition: one entry per author, most recent first.
//!
//! `compose` is pure. It does not fetch, filter by time or look up profiles;
//! callers hand it the active stories and fill in author display afterwards.

use crate::id::UserId;
use crate::story::{FeedEntry, Story};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Recency order used everywhere in the feed: newest `created_at` first,
/// ties broken by the higher story id.
pub fn recency(a: &Story, b: &Story) -> Ordering {
    b.created_at()
        .cmp(&a.created_at())
        .then_with(|| b.id().cmp(&a.id()))
}

/// The most recent story in `stories`, if any.
pub fn latest<'a>(stories: impl IntoIterator<Item = &'a Story>) -> Option<&'a Story> {
    stories.into_iter().min_by(|a, b| recency(a, b))
}

/// Compose the feed strip.
///
/// The first element is always the viewer's own entry: their latest active
/// story if they have one, otherwise `own_placeholder`. Every other author
/// appears exactly once, carrying their latest story, ordered by recency.
/// A `None` viewer (signed out) still gets the placeholder slot.
pub fn compose(
    viewer: Option<UserId>,
    active_stories: &[Story],
    own_placeholder: FeedEntry,
) -> Vec<FeedEntry> {
    let (own, others): (Vec<&Story>, Vec<&Story>) = active_stories
        .iter()
        .partition(|story| Some(story.author_id()) == viewer);

    let mut by_author: HashMap<UserId, &Story> = HashMap::new();
    for story in others {
        by_author
            .entry(story.author_id())
            .and_modify(|current| {
                if recency(story, current) == Ordering::Less {
                    *current = story;
                }
            })
            .or_insert(story);
    }

    let mut heads: Vec<&Story> = by_author.into_values().collect();
    heads.sort_by(|a, b| recency(a, b));

    let own_entry = match latest(own) {
        Some(story) => FeedEntry {
            story: Some(story.clone()),
            is_own: true,
            ..own_placeholder
        },
        None => FeedEntry {
            story: None,
            is_own: true,
            ..own_placeholder
        },
    };

    let mut entries = Vec::with_capacity(heads.len() + 1);
    entries.push(own_entry);
    entries.extend(
        heads
            .into_iter()
            .map(|story| FeedEntry::for_story(story.clone(), false)),
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::StoryId;
    use crate::story::{AuthorDisplay, MediaType};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::HashSet;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    fn story(id: u128, author: UserId, minutes: i64) -> Story {
        Story::new(
            StoryId::from_u128(id),
            author,
            format!("https://cdn.example.com/{id}.jpg"),
            MediaType::Image,
            None,
            base() + Duration::minutes(minutes),
        )
    }

    fn placeholder() -> FeedEntry {
        FeedEntry::placeholder(AuthorDisplay::new("Me", "https://cdn.example.com/me.png"))
    }

    #[test]
    fn test_one_entry_per_author_latest_wins() {
        let viewer = UserId::from_u128(100);
        let a = UserId::from_u128(1);
        let b = UserId::from_u128(2);
        let stories = vec![
            story(10, a, 1),
            story(11, a, 2),
            story(12, a, 3),
            story(20, b, 4),
        ];

        let feed = compose(Some(viewer), &stories, placeholder());

        assert_eq!(feed.len(), 3);
        assert!(feed[0].is_own && feed[0].is_placeholder());
        assert_eq!(feed[1].story.as_ref().unwrap().id(), StoryId::from_u128(20));
        assert_eq!(feed[2].story.as_ref().unwrap().id(), StoryId::from_u128(12));
        assert!(!feed[1].is_own && !feed[2].is_own);
    }

    #[test]
    fn test_own_story_fills_own_slot() {
        let viewer = UserId::from_u128(100);
        let other = UserId::from_u128(1);
        let stories = vec![
            story(1, viewer, 5),
            story(2, viewer, 9),
            story(3, other, 1),
        ];

        let feed = compose(Some(viewer), &stories, placeholder());

        assert_eq!(feed.len(), 2);
        let own = &feed[0];
        assert!(own.is_own);
        assert_eq!(own.story.as_ref().unwrap().id(), StoryId::from_u128(2));
        assert_eq!(own.author_display.display_name, "Me");
        assert!(feed[1..].iter().all(|e| e.author_id() != Some(viewer)));
    }

    #[test]
    fn test_signed_out_viewer_gets_placeholder() {
        let a = UserId::from_u128(1);
        let feed = compose(None, &[story(1, a, 0)], placeholder());

        assert_eq!(feed.len(), 2);
        assert!(feed[0].is_own && feed[0].is_placeholder());
        assert_eq!(feed[1].author_id(), Some(a));
    }

    #[test]
    fn test_empty_input_yields_own_entry_only() {
        let feed = compose(Some(UserId::new()), &[], placeholder());
        assert_eq!(feed, vec![placeholder()]);
    }

    #[test]
    fn test_timestamp_tie_breaks_on_higher_id() {
        let a = UserId::from_u128(1);
        let stories = vec![story(5, a, 0), story(9, a, 0), story(7, a, 0)];

        let feed = compose(None, &stories, placeholder());

        assert_eq!(feed[1].story.as_ref().unwrap().id(), StoryId::from_u128(9));
    }

    #[test]
    fn test_output_stable_under_input_permutation() {
        let authors: Vec<UserId> = (1..=5).map(UserId::from_u128).collect();
        let mut stories = Vec::new();
        for (i, author) in authors.iter().enumerate() {
            for j in 0..3 {
                let n = (i * 10 + j) as u128;
                stories.push(story(n, *author, (j as i64) * 7 - i as i64));
            }
        }
        let forward = compose(None, &stories, placeholder());
        stories.reverse();
        let backward = compose(None, &stories, placeholder());

        assert_eq!(forward, backward);
        assert_eq!(forward, compose(None, &stories, placeholder()));
    }

    #[test]
    fn test_no_duplicate_authors_and_sorted() {
        let viewer = UserId::from_u128(99);
        let mut stories = Vec::new();
        for n in 0..40u128 {
            let author = UserId::from_u128(n % 7);
            stories.push(story(n + 1000, author, ((n * 37) % 23) as i64));
        }
        stories.push(story(5000, viewer, 3));

        let feed = compose(Some(viewer), &stories, placeholder());

        let distinct: HashSet<UserId> = stories
            .iter()
            .map(Story::author_id)
            .filter(|a| *a != viewer)
            .collect();
        assert_eq!(feed.len(), 1 + distinct.len());

        let authors: Vec<UserId> = feed[1..].iter().filter_map(FeedEntry::author_id).collect();
        let unique: HashSet<UserId> = authors.iter().copied().collect();
        assert_eq!(unique.len(), authors.len());

        for pair in feed[1..].windows(2) {
            let (x, y) = (pair[0].story.as_ref().unwrap(), pair[1].story.as_ref().unwrap());
            assert_ne!(recency(x, y), Ordering::Greater);
        }
    }
}

//! Time-to-live policy for stories.
//!
//! Expiry is computed once, at creation, as `created_at + STORY_TTL`. Reads
//! only ever compare against the stored `expires_at`; nothing extends it.

use crate::story::Story;
use chrono::{DateTime, Duration, Utc};

/// How long a story stays visible.
pub const STORY_TTL: Duration = Duration::hours(24);

/// Expiry timestamp for a story created at `created_at`.
pub fn compute_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + STORY_TTL
}

/// A story is active strictly before its expiry; the boundary itself is expired.
pub fn is_active(story: &Story, now: DateTime<Utc>) -> bool {
    now < story.expires_at()
}

/// Time left before the story expires, zero once it has.
pub fn remaining(story: &Story, now: DateTime<Utc>) -> Duration {
    (story.expires_at() - now).max(Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{StoryId, UserId};
    use crate::story::MediaType;
    use chrono::TimeZone;

    fn story_at(created_at: DateTime<Utc>) -> Story {
        Story::new(
            StoryId::new(),
            UserId::new(),
            "https://cdn.example.com/clip.mp4",
            MediaType::Video,
            None,
            created_at,
        )
    }

    #[test]
    fn test_active_until_boundary() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let story = story_at(created);

        assert!(is_active(&story, created));
        assert!(is_active(&story, created + Duration::hours(23)));
        assert!(is_active(
            &story,
            created + STORY_TTL - Duration::milliseconds(1)
        ));
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let story = story_at(created);

        assert!(!is_active(&story, created + STORY_TTL));
        assert!(!is_active(&story, created + Duration::days(3)));
    }

    #[test]
    fn test_story_method_agrees_with_policy() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let story = story_at(created);
        for hours in [0, 12, 24, 25] {
            let now = created + Duration::hours(hours);
            assert_eq!(story.is_active(now), now < created + Duration::hours(24));
        }
    }

    #[test]
    fn test_remaining_saturates_at_zero() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let story = story_at(created);

        assert_eq!(remaining(&story, created + Duration::hours(20)), Duration::hours(4));
        assert_eq!(remaining(&story, created + Duration::hours(30)), Duration::zero());
    }
}

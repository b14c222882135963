//! Playback state machine for an open story viewer.
//!
//! The engine is a reducer: it owns the viewer state and consumes discrete
//! [`PlaybackEvent`]s, returning a [`Step`] that tells the driver what, if
//! anything, it has to do next. It never sleeps or spawns; timing comes from
//! whoever feeds it `Tick`s.
//!
//! ```text
//!            media ready            tick (elapsed >= duration)
//!  Loading ──────────────► Playing ─────────────────────────► Loading (next)
//!     ▲                    │  ▲                               or Closed (last)
//!     │                    ▼  │ resume
//!     │                   Paused
//!     └── media error / tap right / tap left (index > 0)
//! ```
//!
//! # Generations
//!
//! Every time the current entry changes (and on close) the generation
//! counter is bumped. Ticks and media signals are stamped with the
//! generation they were issued for, and anything carrying an old generation
//! is ignored. A timer or loader that outlives its entry therefore cannot
//! touch the new one.

use crate::id::StoryId;
use crate::story::{MediaType, Story};
use std::collections::BTreeSet;
use std::time::Duration;

/// How long an image (or a video of unknown length) stays on screen.
pub const DEFAULT_IMAGE_DURATION: Duration = Duration::from_secs(5);

/// Spacing between progress ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Timing parameters for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    pub image_duration: Duration,
    pub tick_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            image_duration: DEFAULT_IMAGE_DURATION,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Lifecycle phase of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for the current entry's media; no progress accrues.
    Loading,
    /// Progress advances on every tick.
    Playing,
    /// Progress frozen by the user.
    Paused,
    /// Terminal. No further event has any effect.
    Closed,
}

/// Horizontal third of the display that received a tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapZone {
    Left,
    Center,
    Right,
}

impl TapZone {
    /// Classify a tap at `x` on a surface `width` wide.
    ///
    /// Out-of-range positions clamp to the nearest edge zone; a degenerate
    /// surface counts as the center.
    pub fn from_position(x: f32, width: f32) -> Self {
        if !(width > 0.0) || x.is_nan() {
            return TapZone::Center;
        }
        let third = width / 3.0;
        if x < third {
            TapZone::Left
        } else if x >= width - third {
            TapZone::Right
        } else {
            TapZone::Center
        }
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// One tick of the progress timer.
    Tick { generation: u64 },
    /// A tap in one of the three zones.
    Tap(TapZone),
    /// The user started holding the display.
    Hold,
    /// The user let go.
    Release,
    /// Media for the entry of `generation` can be shown. Videos may report
    /// their length.
    MediaReady {
        generation: u64,
        duration: Option<Duration>,
    },
    /// Media for the entry of `generation` failed to load or play.
    MediaError { generation: u64 },
    /// Close the viewer.
    Close,
}

/// What the driver has to do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Stale or irrelevant event; state unchanged.
    Ignored,
    /// Progress or phase changed within the same entry.
    Updated,
    /// Media for `index` became ready and playback (or a held pause) began.
    Ready { index: usize },
    /// The current entry restarted from zero without reloading media.
    Restarted { index: usize },
    /// A new entry is current and its media must be loaded.
    EntryChanged { index: usize, generation: u64 },
    /// The viewer is closed; release the timer.
    Closed,
}

/// Snapshot of the viewer state, cheap to clone and compare.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub index: usize,
    pub len: usize,
    /// Percentage in `0.0..=100.0` of the current entry.
    pub progress: f64,
    pub phase: Phase,
    pub generation: u64,
}

/// The playback engine. One instance per open viewer.
#[derive(Debug, Clone)]
pub struct PlaybackEngine {
    entries: Vec<Story>,
    config: PlaybackConfig,
    index: usize,
    elapsed: Duration,
    duration: Duration,
    phase: Phase,
    generation: u64,
    hold_pending: bool,
    failed: BTreeSet<usize>,
}

impl PlaybackEngine {
    /// Open the viewer on the first entry.
    pub fn new(entries: Vec<Story>, config: PlaybackConfig) -> Self {
        Self::open_at(entries, 0, config)
    }

    /// Open the viewer on `start`, clamped to the last entry. An empty
    /// sequence opens straight into `Closed`.
    pub fn open_at(entries: Vec<Story>, start: usize, config: PlaybackConfig) -> Self {
        let phase = if entries.is_empty() {
            Phase::Closed
        } else {
            Phase::Loading
        };
        let index = start.min(entries.len().saturating_sub(1));
        Self {
            entries,
            config,
            index,
            elapsed: Duration::ZERO,
            duration: config.image_duration,
            phase,
            generation: 1,
            hold_pending: false,
            failed: BTreeSet::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    pub fn entries(&self) -> &[Story] {
        &self.entries
    }

    /// The entry being shown, `None` once closed.
    pub fn current(&self) -> Option<&Story> {
        if self.is_closed() {
            None
        } else {
            self.entries.get(self.index)
        }
    }

    /// Progress through the current entry, as a percentage.
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 100.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64() * 100.0).min(100.0)
    }

    /// Playback duration of the current entry.
    pub fn entry_duration(&self) -> Duration {
        self.duration
    }

    /// Indices skipped because their media failed.
    pub fn failed(&self) -> impl Iterator<Item = usize> + '_ {
        self.failed.iter().copied()
    }

    pub fn is_failed(&self, index: usize) -> bool {
        self.failed.contains(&index)
    }

    /// Story ids that were skipped because their media failed.
    pub fn failed_stories(&self) -> Vec<StoryId> {
        self.failed
            .iter()
            .filter_map(|&i| self.entries.get(i).map(Story::id))
            .collect()
    }

    pub fn state(&self) -> ViewerState {
        ViewerState {
            index: self.index,
            len: self.entries.len(),
            progress: self.progress(),
            phase: self.phase,
            generation: self.generation,
        }
    }

    /// Feed one event through the state machine.
    pub fn handle(&mut self, event: PlaybackEvent) -> Step {
        if self.is_closed() {
            return Step::Ignored;
        }

        match event {
            PlaybackEvent::Tick { generation } => self.on_tick(generation),
            PlaybackEvent::Tap(zone) => self.on_tap(zone),
            PlaybackEvent::Hold => self.set_held(true),
            PlaybackEvent::Release => self.set_held(false),
            PlaybackEvent::MediaReady {
                generation,
                duration,
            } => self.on_media_ready(generation, duration),
            PlaybackEvent::MediaError { generation } => self.on_media_error(generation),
            PlaybackEvent::Close => self.close(),
        }
    }

    /// Shorthand for a tick of the current generation.
    pub fn tick(&mut self) -> Step {
        self.handle(PlaybackEvent::Tick {
            generation: self.generation,
        })
    }

    /// Shorthand for media-ready on the current generation.
    pub fn media_ready(&mut self, duration: Option<Duration>) -> Step {
        self.handle(PlaybackEvent::MediaReady {
            generation: self.generation,
            duration,
        })
    }

    /// Shorthand for media-error on the current generation.
    pub fn media_error(&mut self) -> Step {
        self.handle(PlaybackEvent::MediaError {
            generation: self.generation,
        })
    }

    /// Go to the next entry, or close after the last one.
    pub fn next(&mut self) -> Step {
        if self.is_closed() {
            return Step::Ignored;
        }
        if self.index + 1 < self.entries.len() {
            self.enter(self.index + 1)
        } else {
            self.close()
        }
    }

    /// Go to the previous entry; on the first entry restart it instead.
    pub fn previous(&mut self) -> Step {
        if self.is_closed() {
            return Step::Ignored;
        }
        if self.index > 0 {
            self.enter(self.index - 1)
        } else {
            self.elapsed = Duration::ZERO;
            Step::Restarted { index: 0 }
        }
    }

    /// Move to the terminal state. Idempotent.
    pub fn close(&mut self) -> Step {
        if self.is_closed() {
            return Step::Ignored;
        }
        self.phase = Phase::Closed;
        self.generation += 1;
        self.hold_pending = false;
        Step::Closed
    }

    fn on_tick(&mut self, generation: u64) -> Step {
        if generation != self.generation || self.phase != Phase::Playing {
            return Step::Ignored;
        }
        self.elapsed += self.config.tick_interval;
        if self.elapsed >= self.duration {
            self.elapsed = self.duration;
            return self.next();
        }
        Step::Updated
    }

    fn on_tap(&mut self, zone: TapZone) -> Step {
        match zone {
            TapZone::Left => self.previous(),
            TapZone::Right => self.next(),
            TapZone::Center => {
                let held = match self.phase {
                    Phase::Playing => true,
                    Phase::Paused => false,
                    _ => !self.hold_pending,
                };
                self.set_held(held)
            }
        }
    }

    fn set_held(&mut self, held: bool) -> Step {
        match (self.phase, held) {
            (Phase::Playing, true) => self.phase = Phase::Paused,
            (Phase::Paused, false) => self.phase = Phase::Playing,
            (Phase::Loading, held) if held != self.hold_pending => self.hold_pending = held,
            _ => return Step::Ignored,
        }
        Step::Updated
    }

    fn on_media_ready(&mut self, generation: u64, duration: Option<Duration>) -> Step {
        if generation != self.generation || self.phase != Phase::Loading {
            return Step::Ignored;
        }
        let is_video = self
            .entries
            .get(self.index)
            .is_some_and(|s| s.media_type() == MediaType::Video);
        self.duration = match duration {
            Some(d) if is_video && !d.is_zero() => d,
            _ => self.config.image_duration,
        };
        self.phase = if self.hold_pending {
            Phase::Paused
        } else {
            Phase::Playing
        };
        self.hold_pending = false;
        Step::Ready { index: self.index }
    }

    fn on_media_error(&mut self, generation: u64) -> Step {
        if generation != self.generation {
            return Step::Ignored;
        }
        self.failed.insert(self.index);
        self.next()
    }

    fn enter(&mut self, index: usize) -> Step {
        self.index = index;
        self.elapsed = Duration::ZERO;
        self.duration = self.config.image_duration;
        self.phase = Phase::Loading;
        self.hold_pending = false;
        self.generation += 1;
        Step::EntryChanged {
            index,
            generation: self.generation,
        }
    }
}

//! Timer-driven story viewer.
//!
//! `StoryViewer::open` spawns a worker task that exclusively owns a
//! [`PlaybackEngine`] and its tick interval. The UI talks to it through a
//! [`ViewerHandle`]: commands go in over a bounded channel, lifecycle events
//! come back over an unbounded one, and the latest [`ViewerState`] is
//! published on a watch channel for rendering.
//!
//! The interval only runs while the engine is `Playing` and is reset every
//! time playback (re)starts, so the first tick after a media-ready or a
//! resume is one full period away. Dropping or closing the handle aborts the
//! worker. From then on the published state is `Closed` and stays so, even
//! if the worker was mid-step when the handle went away.

use crate::config::StoriesConfig;
use crate::feed::ViewedStories;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stories_core::{
    Phase, PlaybackConfig, PlaybackEngine, PlaybackEvent, Step, Story, StoryId, TapZone,
    ViewerState,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Input from the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerCommand {
    /// A tap already classified into a zone.
    Tap(TapZone),
    /// A raw tap at `x` on a surface `width` wide.
    TapAt { x: f32, width: f32 },
    /// Start of a press-and-hold.
    Hold,
    /// End of a press-and-hold.
    Release,
    /// Media for the entry announced with `generation` is ready.
    MediaReady {
        generation: u64,
        duration: Option<Duration>,
    },
    /// Media for the entry announced with `generation` failed.
    MediaError { generation: u64 },
    /// Close the viewer.
    Close,
}

impl ViewerCommand {
    fn into_event(self) -> PlaybackEvent {
        match self {
            ViewerCommand::Tap(zone) => PlaybackEvent::Tap(zone),
            ViewerCommand::TapAt { x, width } => {
                PlaybackEvent::Tap(TapZone::from_position(x, width))
            }
            ViewerCommand::Hold => PlaybackEvent::Hold,
            ViewerCommand::Release => PlaybackEvent::Release,
            ViewerCommand::MediaReady {
                generation,
                duration,
            } => PlaybackEvent::MediaReady {
                generation,
                duration,
            },
            ViewerCommand::MediaError { generation } => PlaybackEvent::MediaError { generation },
            ViewerCommand::Close => PlaybackEvent::Close,
        }
    }
}

/// Output to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    /// Start loading `story`; reply with `MediaReady`/`MediaError` carrying
    /// this `generation`.
    Load {
        index: usize,
        generation: u64,
        story: Story,
    },
    /// Media is showing and the entry counts as viewed.
    Started { index: usize, story_id: StoryId },
    /// The current entry went back to zero; seek videos to the start.
    Restarted { index: usize },
    /// The entry's media failed and was skipped.
    Skipped { index: usize, story_id: StoryId },
    /// The viewer closed. Lists every story skipped on the way.
    Closed { failed: Vec<StoryId> },
}

/// Opens viewers with a shared configuration.
#[derive(Debug, Clone)]
pub struct StoryViewer {
    playback: PlaybackConfig,
    command_buffer: usize,
    viewed: Option<ViewedStories>,
}

impl StoryViewer {
    pub fn new(config: &StoriesConfig) -> Self {
        Self {
            playback: config.playback,
            command_buffer: config.command_buffer.max(1),
            viewed: None,
        }
    }

    /// Record started entries into `viewed`.
    pub fn with_viewed(mut self, viewed: ViewedStories) -> Self {
        self.viewed = Some(viewed);
        self
    }

    /// Open a viewer over `entries`, starting at `start`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self, entries: Vec<Story>, start: usize) -> ViewerHandle {
        let mut playback = self.playback;
        playback.tick_interval = playback.tick_interval.max(Duration::from_millis(1));
        let engine = PlaybackEngine::open_at(entries, start, playback);

        let (command_tx, command_rx) = mpsc::channel(self.command_buffer);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(engine.state());
        let state_tx = Arc::new(state_tx);
        let torn_down = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(viewer_loop(
            engine,
            command_rx,
            event_tx,
            Published {
                state: state_tx.clone(),
                torn_down: torn_down.clone(),
            },
            self.viewed.clone(),
        ));

        ViewerHandle {
            commands: command_tx,
            events: event_rx,
            state: state_rx,
            state_tx,
            torn_down,
            task,
        }
    }
}

/// Owner-side handle of an open viewer.
///
/// The worker lives exactly as long as this handle (or until playback ends).
pub struct ViewerHandle {
    commands: mpsc::Sender<ViewerCommand>,
    events: mpsc::UnboundedReceiver<ViewerEvent>,
    state: watch::Receiver<ViewerState>,
    state_tx: Arc<watch::Sender<ViewerState>>,
    torn_down: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ViewerHandle {
    /// Send a command. Returns `false` if the viewer is gone.
    pub async fn send(&self, command: ViewerCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Send without waiting for channel capacity.
    pub fn try_send(&self, command: ViewerCommand) -> bool {
        self.commands.try_send(command).is_ok()
    }

    /// Next lifecycle event; `None` once the viewer has finished and all
    /// events were drained.
    pub async fn next_event(&mut self) -> Option<ViewerEvent> {
        self.events.recv().await
    }

    /// Next lifecycle event if one is already queued.
    pub fn try_next_event(&mut self) -> Option<ViewerEvent> {
        self.events.try_recv().ok()
    }

    /// Latest state snapshot.
    pub fn state(&self) -> ViewerState {
        self.state.borrow().clone()
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ViewerState> {
        self.state.clone()
    }

    /// Whether the worker has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for playback to end on its own and return the final state.
    ///
    /// This consumes the handle, so no further command can be sent. Call it
    /// only while `Playing` with nothing left to answer: from `Loading` or
    /// `Paused` playback never ends on its own and this never returns.
    pub async fn wait(mut self) -> ViewerState {
        if let Err(error) = (&mut self.task).await {
            tracing::warn!(%error, "story viewer task ended abnormally");
        }
        self.state()
    }

    /// Close now. The state reads `Closed` when this returns and the worker
    /// stops at its next step without publishing anything.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for ViewerHandle {
    fn drop(&mut self) {
        self.torn_down.store(true, Ordering::Release);
        self.task.abort();
        self.state_tx.send_if_modified(|state| {
            if state.phase == Phase::Closed {
                return false;
            }
            state.phase = Phase::Closed;
            state.generation += 1;
            true
        });
    }
}

/// Worker side of the state channel.
struct Published {
    state: Arc<watch::Sender<ViewerState>>,
    torn_down: Arc<AtomicBool>,
}

impl Published {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Publish `next` unless the handle already closed the viewer. Returns
    /// `false` once the viewer is closed from outside.
    fn publish(&self, next: ViewerState) -> bool {
        let mut accepted = true;
        self.state.send_if_modified(|current| {
            if current.phase == Phase::Closed {
                accepted = false;
                return false;
            }
            *current = next;
            true
        });
        accepted
    }
}

async fn viewer_loop(
    mut engine: PlaybackEngine,
    mut commands: mpsc::Receiver<ViewerCommand>,
    events: mpsc::UnboundedSender<ViewerEvent>,
    published: Published,
    viewed: Option<ViewedStories>,
) {
    let mut ticker = time::interval(engine.config().tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick_generation = engine.generation();

    tracing::debug!(entries = engine.len(), start = engine.index(), "story viewer opened");
    match engine.current() {
        Some(story) => announce_load(&engine, story, &events),
        None => {
            let _ = events.send(ViewerEvent::Closed { failed: Vec::new() });
        }
    }

    while !engine.is_closed() {
        let was_playing = engine.phase() == Phase::Playing;
        let index = engine.index();

        let (step, skipped) = tokio::select! {
            _ = ticker.tick(), if was_playing => {
                let step = engine.handle(PlaybackEvent::Tick { generation: tick_generation });
                (step, false)
            }
            command = commands.recv() => match command {
                Some(command) => {
                    let step = engine.handle(command.into_event());
                    let skipped = matches!(command, ViewerCommand::MediaError { .. })
                        && step != Step::Ignored;
                    (step, skipped)
                }
                None => (engine.close(), false),
            },
        };

        if !was_playing && engine.phase() == Phase::Playing {
            ticker.reset();
            tick_generation = engine.generation();
        }

        if published.is_torn_down() {
            return;
        }

        if skipped {
            if let Some(story) = engine.entries().get(index) {
                tracing::warn!(story = %story.id(), index, "media failed to load, skipping");
                let _ = events.send(ViewerEvent::Skipped {
                    index,
                    story_id: story.id(),
                });
            }
        }
        report(step, &engine, &events, viewed.as_ref());

        if step != Step::Ignored && !published.publish(engine.state()) {
            return;
        }
    }
}

fn report(
    step: Step,
    engine: &PlaybackEngine,
    events: &mpsc::UnboundedSender<ViewerEvent>,
    viewed: Option<&ViewedStories>,
) {
    match step {
        Step::Ignored | Step::Updated => {}
        Step::Ready { index } => {
            if let Some(story) = engine.current() {
                if let Some(viewed) = viewed {
                    viewed.mark(story.id());
                }
                let _ = events.send(ViewerEvent::Started {
                    index,
                    story_id: story.id(),
                });
            }
        }
        Step::Restarted { index } => {
            let _ = events.send(ViewerEvent::Restarted { index });
        }
        Step::EntryChanged { .. } => {
            if let Some(story) = engine.current() {
                tracing::debug!(
                    index = engine.index(),
                    story = %story.id(),
                    "story viewer advanced"
                );
                announce_load(engine, story, events);
            }
        }
        Step::Closed => {
            tracing::debug!(index = engine.index(), "story viewer closed");
            let _ = events.send(ViewerEvent::Closed {
                failed: engine.failed_stories(),
            });
        }
    }
}

fn announce_load(
    engine: &PlaybackEngine,
    story: &Story,
    events: &mpsc::UnboundedSender<ViewerEvent>,
) {
    let _ = events.send(ViewerEvent::Load {
        index: engine.index(),
        generation: engine.generation(),
        story: story.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stories_core::{MediaType, UserId};

    fn stories(n: usize) -> Vec<Story> {
        let created = Utc.with_ymd_and_hms(2026, 10, 18, 10, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                Story::new(
                    StoryId::from_u128(i as u128 + 1),
                    UserId::from_u128(9),
                    format!("https://cdn.example.com/{i}.jpg"),
                    MediaType::Image,
                    None,
                    created,
                )
            })
            .collect()
    }

    fn viewer() -> StoryViewer {
        StoryViewer::new(
            &StoriesConfig::new()
                .with_image_duration(Duration::from_secs(1))
                .with_tick_interval(Duration::from_millis(100)),
        )
    }

    async fn expect_load(handle: &mut ViewerHandle) -> (usize, u64) {
        match handle.next_event().await {
            Some(ViewerEvent::Load {
                index, generation, ..
            }) => (index, generation),
            other => panic!("expected Load, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_through_and_closes() {
        let viewed = ViewedStories::new();
        let mut handle = viewer().with_viewed(viewed.clone()).open(stories(2), 0);

        for expected in 0..2 {
            let (index, generation) = expect_load(&mut handle).await;
            assert_eq!(index, expected);
            assert!(handle.send(ViewerCommand::MediaReady { generation, duration: None }).await);
            assert!(matches!(handle.next_event().await, Some(ViewerEvent::Started { .. })));
        }

        assert_eq!(
            handle.next_event().await,
            Some(ViewerEvent::Closed { failed: vec![] })
        );
        let state = handle.wait().await;
        assert_eq!(state.phase, Phase::Closed);
        assert_eq!(viewed.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_progress_while_loading() {
        let mut handle = viewer().open(stories(1), 0);
        expect_load(&mut handle).await;

        time::sleep(Duration::from_secs(5)).await;

        let state = handle.state();
        assert_eq!(state.phase, Phase::Loading);
        assert_eq!(state.progress, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_progress() {
        let mut handle = viewer().open(stories(1), 0);
        let (_, generation) = expect_load(&mut handle).await;
        handle.send(ViewerCommand::MediaReady { generation, duration: None }).await;
        handle.next_event().await;

        time::sleep(Duration::from_millis(350)).await;
        handle.send(ViewerCommand::Hold).await;
        time::sleep(Duration::from_millis(10)).await;
        let paused = handle.state();
        assert_eq!(paused.phase, Phase::Paused);
        assert!((paused.progress - 30.0).abs() < 1e-9);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.state().progress, paused.progress);

        handle.send(ViewerCommand::Release).await;
        time::sleep(Duration::from_millis(150)).await;
        assert!((handle.state().progress - 40.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_media_error_skips_to_next() {
        let mut handle = viewer().open(stories(2), 0);
        let (_, generation) = expect_load(&mut handle).await;

        handle.send(ViewerCommand::MediaError { generation }).await;

        assert_eq!(
            handle.next_event().await,
            Some(ViewerEvent::Skipped {
                index: 0,
                story_id: StoryId::from_u128(1)
            })
        );
        assert_eq!(expect_load(&mut handle).await.0, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_media_ready_ignored() {
        let mut handle = viewer().open(stories(3), 0);
        let (_, first) = expect_load(&mut handle).await;

        handle.send(ViewerCommand::TapAt { x: 290.0, width: 300.0 }).await;
        let (index, _) = expect_load(&mut handle).await;
        assert_eq!(index, 1);

        handle.send(ViewerCommand::MediaReady { generation: first, duration: None }).await;
        time::sleep(Duration::from_secs(2)).await;

        let state = handle.state();
        assert_eq!(state.index, 1);
        assert_eq!(state.phase, Phase::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_releases_timer() {
        let mut handle = viewer().open(stories(2), 0);
        let (_, generation) = expect_load(&mut handle).await;
        handle.send(ViewerCommand::MediaReady { generation, duration: None }).await;
        handle.next_event().await;
        time::sleep(Duration::from_millis(250)).await;

        let mut watcher = handle.subscribe();
        handle.close();

        let closed = watcher.borrow_and_update().clone();
        assert_eq!(closed.phase, Phase::Closed);

        time::sleep(Duration::from_secs(10)).await;
        assert!(!watcher.has_changed().unwrap_or(false));
        assert_eq!(*watcher.borrow(), closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_viewer_closes_immediately() {
        let mut handle = viewer().open(Vec::new(), 0);
        assert_eq!(
            handle.next_event().await,
            Some(ViewerEvent::Closed { failed: vec![] })
        );
        assert_eq!(handle.wait().await.phase, Phase::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_from_playing_runs_to_end() {
        let mut handle = viewer().open(stories(1), 0);
        let (_, generation) = expect_load(&mut handle).await;
        handle.send(ViewerCommand::MediaReady { generation, duration: None }).await;

        let state = handle.wait().await;
        assert_eq!(state.phase, Phase::Closed);
        assert_eq!(state.progress, 100.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_drop_mid_step_leaves_state_closed() {
        let viewer = StoryViewer::new(
            &StoriesConfig::new()
                .with_image_duration(Duration::from_secs(60))
                .with_tick_interval(Duration::from_millis(1))
                .with_command_buffer(4096),
        );

        for run in 0..300 {
            let handle = viewer.open(stories(2), 0);
            let generation = handle.state().generation;
            handle.try_send(ViewerCommand::MediaReady { generation, duration: None });
            for _ in 0..2000 {
                handle.try_send(ViewerCommand::Tap(TapZone::Center));
            }

            let state = handle.subscribe();
            drop(handle);
            time::sleep(Duration::from_millis(2)).await;

            assert_eq!(state.borrow().phase, Phase::Closed, "run {run}");
        }
    }
}

//! Host-side playback state
//!
//! The [`Player`] owns the current document and the time playback started. The host calls
//! [`Player::tick`] once per rendered frame and draws whatever comes back.

use crate::completion::{CompletionHandler, NoCompletion};
use crate::error::GifResult;
use crate::frame::Frame;
use crate::loader::{Loader, Ticket};
use crate::{GifDocument, Settings};
use imgref::ImgVec;
use rgb::RGBA8;
use std::time::Instant;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing requested yet, or the last decode failed
    Empty,
    /// Waiting for a decode
    Loading,
    /// Showing frames
    Ready,
    /// All loops played
    Finished,
}

pub struct Player<I = ImgVec<RGBA8>> {
    settings: Settings,
    state: PlaybackState,
    document: Option<GifDocument<I>>,
    /// When the current document became active
    started: Option<Instant>,
    /// Last ticket handed out
    latest: u64,
    /// Ticket of `document`
    installed: u64,
    /// The completion handler has run for `document`
    completed: bool,
    position: Option<usize>,
    on_complete: Box<dyn CompletionHandler>,
}

impl<I> Player<I> {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            state: PlaybackState::Empty,
            document: None,
            started: None,
            latest: 0,
            installed: 0,
            completed: false,
            position: None,
            on_complete: Box::new(NoCompletion {}),
        }
    }

    /// Called on every transition into [`PlaybackState::Finished`]
    #[must_use]
    pub fn with_completion_handler(mut self, handler: impl CompletionHandler + 'static) -> Self {
        self.on_complete = Box::new(handler);
        self
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn document(&self) -> Option<&GifDocument<I>> {
        self.document.as_ref()
    }

    /// Position in the frame set of the frame returned by the last tick
    #[inline]
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Starts a new decode request. Results for any earlier ticket will be ignored.
    ///
    /// The current document keeps playing until the new one is delivered, but the state stays
    /// [`PlaybackState::Loading`] until then.
    pub fn request(&mut self) -> Ticket {
        self.latest += 1;
        self.set_state(PlaybackState::Loading);
        Ticket(self.latest)
    }

    /// Hands a decode result to the player. Playback of the new document starts at `now`.
    ///
    /// Returns `Ok(false)` if the ticket has been superseded; the result is dropped.
    /// A failed decode leaves the player [`PlaybackState::Empty`] and returns the error.
    pub fn deliver(&mut self, ticket: Ticket, result: GifResult<GifDocument<I>>, now: Instant) -> GifResult<bool> {
        if ticket.0 != self.latest {
            debug!("dropping stale decode {ticket:?}, latest is {}", self.latest);
            return Ok(false);
        }
        match result {
            Ok(document) => {
                self.document = Some(document);
                self.installed = ticket.0;
                self.completed = false;
                self.started = Some(now);
                self.position = None;
                self.set_state(PlaybackState::Ready);
                Ok(true)
            },
            Err(err) => {
                self.document = None;
                self.installed = ticket.0;
                self.started = None;
                self.position = None;
                self.set_state(PlaybackState::Empty);
                Err(err)
            },
        }
    }

    /// Replaces the document with one decoded synchronously
    pub fn load(&mut self, document: GifDocument<I>, now: Instant) {
        let ticket = self.request();
        let delivered = self.deliver(ticket, Ok(document), now);
        debug_assert!(matches!(delivered, Ok(true)));
    }

    /// Seconds of playback time at `now`, after applying the speed setting
    pub fn elapsed(&self, now: Instant) -> Option<f64> {
        let started = self.started?;
        Some(now.saturating_duration_since(started).as_secs_f64() * self.settings.speed)
    }

    /// The frame to show at `now`. `None` while there is no document or after playback has finished.
    pub fn tick(&mut self, now: Instant) -> Option<&Frame<I>> {
        let elapsed = self.elapsed(now)?;
        self.advance(elapsed)
    }

    /// The frame to show `elapsed` seconds into playback. Use this if the host keeps its own clock.
    pub fn advance(&mut self, elapsed: f64) -> Option<&Frame<I>> {
        let document = self.document.as_ref()?;
        let loop_count = document.effective_loop_count(self.settings.loop_count);
        self.position = document.frames().position_at(elapsed, loop_count);
        let pending = self.latest != self.installed;
        match self.position {
            Some(_) if !pending => self.set_state(PlaybackState::Ready),
            Some(_) => {},
            None => {
                if !pending {
                    self.set_state(PlaybackState::Finished);
                }
                if !self.completed {
                    self.completed = true;
                    self.on_complete.finished();
                }
            },
        }
        let frames = self.document.as_ref()?.frames();
        self.position.and_then(|pos| frames.get(pos))
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            trace!("playback {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

impl Player {
    /// Delivers every finished decode from the loader. Returns `true` if a new document was installed.
    pub fn poll(&mut self, loader: &Loader, now: Instant) -> GifResult<bool> {
        let mut installed = false;
        while let Some(loaded) = loader.try_recv() {
            installed |= self.deliver(loaded.ticket, loaded.result, now)?;
        }
        Ok(installed)
    }
}

#[cfg(test)]
use crate::LoopCount;
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
fn doc(delays: &[f64], loops: LoopCount) -> GifDocument<usize> {
    struct Fixed<'a>(&'a [f64], LoopCount);
    impl crate::FrameSource for Fixed<'_> {
        type Image = usize;
        fn frame_count(&self) -> usize { self.0.len() }
        fn loop_count(&self) -> Option<u32> {
            match self.1 { LoopCount::Infinite => Some(0), LoopCount::Finite(n) => Some(n) }
        }
        fn image_at(&mut self, index: usize) -> Option<usize> { Some(index) }
        fn unclamped_delay_at(&self, index: usize) -> Option<f64> { Some(self.0[index]) }
        fn clamped_delay_at(&self, _: usize) -> Option<f64> { None }
    }
    GifDocument::from_source(Fixed(delays, loops))
}

#[cfg(test)]
struct Count(std::sync::Arc<std::sync::atomic::AtomicU32>);

#[cfg(test)]
impl CompletionHandler for Count {
    fn finished(&mut self) {
        self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[test]
fn states() {
    let mut p = Player::<usize>::new(Settings::default());
    let t0 = Instant::now();
    assert_eq!(p.state(), PlaybackState::Empty);
    assert!(p.tick(t0).is_none());
    assert_eq!(p.state(), PlaybackState::Empty);

    let ticket = p.request();
    assert_eq!(p.state(), PlaybackState::Loading);
    assert!(p.deliver(ticket, Ok(doc(&[0.1, 0.2, 0.3], LoopCount::Finite(1))), t0).unwrap());
    assert_eq!(p.state(), PlaybackState::Ready);

    assert_eq!(p.advance(0.05).map(|f| *f.image()), Some(0));
    assert_eq!(p.advance(0.25).map(|f| *f.image()), Some(1));
    assert_eq!(p.position(), Some(1));
    assert_eq!(p.advance(0.6).map(|f| *f.image()), Some(2));
    assert!(p.advance(0.61).is_none());
    assert_eq!(p.state(), PlaybackState::Finished);
    assert_eq!(p.position(), None);
}

#[test]
fn completion_fires_once_per_edge() {
    let count = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let fired = || count.load(std::sync::atomic::Ordering::SeqCst);
    let mut p = Player::new(Settings::default()).with_completion_handler(Count(count.clone()));
    let t0 = Instant::now();
    p.load(doc(&[0.5], LoopCount::Finite(2)), t0);

    assert!(p.advance(0.9).is_some());
    assert!(p.advance(1.5).is_none());
    assert!(p.advance(2.0).is_none());
    assert!(p.advance(10.0).is_none());
    assert_eq!(fired(), 1);

    // a new document restarts playback and re-arms the notification
    let t1 = t0 + Duration::from_secs(20);
    p.load(doc(&[0.5], LoopCount::Finite(1)), t1);
    assert_eq!(p.state(), PlaybackState::Ready);
    assert!(p.tick(t1 + Duration::from_millis(100)).is_some());
    assert!(p.tick(t1 + Duration::from_secs(1)).is_none());
    assert!(p.tick(t1 + Duration::from_secs(2)).is_none());
    assert_eq!(fired(), 2);
}

#[test]
fn stale_results_are_dropped() {
    let mut p = Player::<usize>::new(Settings::default());
    let now = Instant::now();
    let old = p.request();
    let new = p.request();
    assert!(p.deliver(new, Ok(doc(&[1.], LoopCount::Infinite)), now).unwrap());
    assert!(!p.deliver(old, Ok(doc(&[1., 1.], LoopCount::Infinite)), now).unwrap());
    assert_eq!(p.document().unwrap().frames().len(), 1);

    // an old failure doesn't clear the current document either
    assert!(!p.deliver(old, Err(crate::Error::Aborted), now).unwrap());
    assert_eq!(p.state(), PlaybackState::Ready);
}

#[test]
fn failed_decode_empties() {
    let mut p = Player::<usize>::new(Settings::default());
    let now = Instant::now();
    p.load(doc(&[1.], LoopCount::Infinite), now);
    let ticket = p.request();
    assert!(p.deliver(ticket, Err(crate::Error::Aborted), now).is_err());
    assert_eq!(p.state(), PlaybackState::Empty);
    assert!(p.document().is_none());
}

#[test]
fn settings_apply() {
    let settings = Settings { loop_count: Some(LoopCount::Infinite), speed: 2. };
    let mut p = Player::new(settings);
    let t0 = Instant::now();
    p.load(doc(&[1., 1.], LoopCount::Finite(1)), t0);
    assert_eq!(p.elapsed(t0 + Duration::from_millis(1500)), Some(3.));
    // 3s at 2x into a 2s animation that would otherwise have finished
    assert_eq!(p.tick(t0 + Duration::from_millis(1500)).map(|f| *f.image()), Some(0));
    assert_eq!(p.state(), PlaybackState::Ready);
}

#[test]
fn empty_document_finishes_immediately() {
    let mut p = Player::<usize>::new(Settings::default());
    p.load(doc(&[], LoopCount::Infinite), Instant::now());
    assert_eq!(p.state(), PlaybackState::Ready);
    assert!(p.advance(0.).is_none());
    assert_eq!(p.state(), PlaybackState::Finished);
}

#[test]
fn finished_document_while_loading() {
    let count = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let fired = || count.load(std::sync::atomic::Ordering::SeqCst);
    let mut p = Player::new(Settings::default()).with_completion_handler(Count(count.clone()));
    p.load(doc(&[0.5], LoopCount::Finite(1)), Instant::now());
    assert!(p.advance(1.0).is_none());
    assert_eq!(p.state(), PlaybackState::Finished);
    assert_eq!(fired(), 1);

    let ticket = p.request();
    assert!(p.advance(1.1).is_none());
    assert!(p.advance(1.2).is_none());
    assert_eq!(p.state(), PlaybackState::Loading);
    assert_eq!(fired(), 1);

    assert!(p.deliver(ticket, Ok(doc(&[0.5], LoopCount::Finite(1))), Instant::now()).unwrap());
    assert!(p.advance(0.1).is_some());
    assert_eq!(p.state(), PlaybackState::Ready);
    assert!(p.advance(1.0).is_none());
    assert_eq!(fired(), 2);
}

#[test]
fn playing_document_while_loading() {
    let count = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let fired = || count.load(std::sync::atomic::Ordering::SeqCst);
    let mut p = Player::new(Settings::default()).with_completion_handler(Count(count.clone()));
    p.load(doc(&[0.5, 0.5], LoopCount::Infinite), Instant::now());
    assert_eq!(p.advance(0.1).map(|f| *f.image()), Some(0));

    let ticket = p.request();
    // the old document is still shown
    assert_eq!(p.advance(0.7).map(|f| *f.image()), Some(1));
    assert_eq!(p.position(), Some(1));
    assert_eq!(p.state(), PlaybackState::Loading);

    // a stale failure doesn't end the wait either
    assert!(!p.deliver(Ticket(ticket.0 - 1), Err(crate::Error::Aborted), Instant::now()).unwrap());
    assert_eq!(p.state(), PlaybackState::Loading);

    assert!(p.deliver(ticket, Ok(doc(&[0.2], LoopCount::Finite(1))), Instant::now()).unwrap());
    assert_eq!(p.state(), PlaybackState::Ready);
    assert!(p.advance(0.1).is_some());
    assert_eq!(p.state(), PlaybackState::Ready);
    assert_eq!(fired(), 0);
}

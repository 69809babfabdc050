//! Decoded frames and the time-to-frame lookup
//!
//! A [`FrameSet`] is what a [`GifDocument`][crate::GifDocument] hands out for playback.
//! It never changes after construction, so it can be shared with a render thread as-is.

pub use imgref::{ImgRef, ImgVec};
pub use rgb::RGBA8;

use crate::source::DEFAULT_DELAY;
use crate::LoopCount;
use std::slice;

/// One still image and how long it stays on screen
#[derive(Debug, Clone)]
pub struct Frame<I = ImgVec<RGBA8>> {
    image: I,
    /// Seconds, always > 0
    delay: f64,
}

impl<I> Frame<I> {
    /// `delay` is in seconds. Zero, negative and non-finite delays become [`DEFAULT_DELAY`].
    pub fn new(image: I, delay: f64) -> Self {
        let delay = if delay > 0. && delay.is_finite() { delay } else { DEFAULT_DELAY };
        Self { image, delay }
    }

    #[inline]
    pub fn image(&self) -> &I {
        &self.image
    }

    #[inline]
    pub fn delay(&self) -> f64 {
        self.delay
    }

    #[inline]
    pub fn into_image(self) -> I {
        self.image
    }
}

impl Frame<ImgVec<RGBA8>> {
    /// Full-canvas pixels of this frame
    #[inline]
    pub fn pixels(&self) -> ImgRef<'_, RGBA8> {
        self.image.as_ref()
    }
}

/// Frames in display order
#[derive(Debug, Clone)]
pub struct FrameSet<I = ImgVec<RGBA8>> {
    frames: Vec<Frame<I>>,
}

impl<I> Default for FrameSet<I> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<I> FromIterator<Frame<I>> for FrameSet<I> {
    fn from_iter<T: IntoIterator<Item = Frame<I>>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<I> FrameSet<I> {
    #[inline]
    pub fn new(frames: Vec<Frame<I>>) -> Self {
        Self { frames }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn get(&self, position: usize) -> Option<&Frame<I>> {
        self.frames.get(position)
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Frame<I>> {
        self.frames.iter()
    }

    /// Sum of all delays in seconds. 0 when there are no frames.
    ///
    /// Summed front to back every time, so the result is the same as the prefix sums used by [`Self::position_at`].
    pub fn duration(&self) -> f64 {
        self.frames.iter().map(|f| f.delay).fold(0., |sum, d| sum + d)
    }

    /// The frame visible `elapsed` seconds after playback started.
    ///
    /// `None` means there's nothing to show: the set is empty, `elapsed` is negative,
    /// or all `loop_count` cycles have been played ("finished").
    #[inline]
    pub fn frame_at(&self, elapsed: f64, loop_count: LoopCount) -> Option<&Frame<I>> {
        self.position_at(elapsed, loop_count).and_then(|pos| self.frames.get(pos))
    }

    /// Like [`Self::frame_at`], but returns the index of the frame in this set.
    pub fn position_at(&self, elapsed: f64, loop_count: LoopCount) -> Option<usize> {
        let duration = self.duration();
        if duration == 0. {
            return None;
        }

        let mut time = elapsed;
        if time > duration {
            let within_budget = match loop_count {
                LoopCount::Infinite => true,
                LoopCount::Finite(n) => time <= duration * f64::from(n),
            };
            if !within_budget {
                return None;
            }
            // lands in [0, duration), so one wrap is always enough
            time %= duration;
        }
        self.position_in_cycle(time)
    }

    /// First frame whose [start, start + delay] window contains `time`. Windows are closed on both ends,
    /// so on a boundary the earlier frame wins.
    fn position_in_cycle(&self, time: f64) -> Option<usize> {
        let mut start = 0.;
        for (pos, frame) in self.frames.iter().enumerate() {
            if start <= time && time <= start + frame.delay {
                return Some(pos);
            }
            start += frame.delay;
        }
        None
    }
}

impl<'a, I> IntoIterator for &'a FrameSet<I> {
    type Item = &'a Frame<I>;
    type IntoIter = slice::Iter<'a, Frame<I>>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

impl<I> IntoIterator for FrameSet<I> {
    type Item = Frame<I>;
    type IntoIter = std::vec::IntoIter<Frame<I>>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

#[cfg(test)]
fn set(delays: &[f64]) -> FrameSet<usize> {
    delays.iter().enumerate().map(|(i, &d)| Frame::new(i, d)).collect()
}

#[cfg(test)]
fn at(frames: &FrameSet<usize>, t: f64, loops: LoopCount) -> Option<usize> {
    frames.frame_at(t, loops).map(|f| *f.image())
}

#[test]
fn unusable_delays_are_replaced() {
    for bad in [0., -0.5, f64::NAN, f64::INFINITY] {
        assert_eq!(Frame::new((), bad).delay(), DEFAULT_DELAY);
    }
    assert_eq!(Frame::new((), 0.04).delay(), 0.04);
}

#[test]
fn empty() {
    let frames = set(&[]);
    assert_eq!(frames.duration(), 0.);
    assert_eq!(at(&frames, 0., LoopCount::Infinite), None);
    assert_eq!(at(&frames, 1., LoopCount::Finite(1)), None);
}

#[test]
fn three_frames_once() {
    let frames = set(&[0.1, 0.2, 0.3]);
    let once = LoopCount::Finite(1);
    assert_eq!(frames.duration(), 0.1 + 0.2 + 0.3);
    assert_eq!(at(&frames, 0., once), Some(0));
    assert_eq!(at(&frames, 0.05, once), Some(0));
    assert_eq!(at(&frames, 0.25, once), Some(1));
    assert_eq!(at(&frames, 0.6, once), Some(2));
    assert_eq!(at(&frames, frames.duration(), once), Some(2));
    assert_eq!(at(&frames, 0.61, once), None);
}

#[test]
fn boundary_picks_earlier_frame() {
    let frames = set(&[0.5, 0.5, 1.0]);
    let once = LoopCount::Finite(1);
    assert_eq!(at(&frames, 0.5, once), Some(0));
    assert_eq!(at(&frames, 1.0, once), Some(1));
    assert_eq!(at(&frames, 1.000001, once), Some(2));
}

#[test]
fn prefix_bounds_hold() {
    let delays = [0.07, 0.13, 0.5, 0.01, 0.29];
    let frames = set(&delays);
    let duration = frames.duration();
    let mut t = 0.;
    while t <= duration {
        let k = at(&frames, t, LoopCount::Finite(1)).unwrap();
        let before: f64 = delays[..k].iter().fold(0., |s, d| s + d);
        assert!(before <= t && t <= before + delays[k], "{t} -> {k}");
        if k > 0 {
            // no earlier frame also contains t
            let prev: f64 = delays[..k - 1].iter().fold(0., |s, d| s + d);
            assert!(!(prev <= t && t <= prev + delays[k - 1]), "{t} -> {k}");
        }
        t += 0.003;
    }
}

#[test]
fn wraps_within_loop_budget() {
    let frames = set(&[0.1, 0.2, 0.3]);
    let twice = LoopCount::Finite(2);
    let duration = frames.duration();
    let eps = 0.01;
    assert_eq!(at(&frames, duration + eps, twice), at(&frames, eps, twice));
    assert_eq!(at(&frames, duration + 0.25, twice), Some(1));
    assert_eq!(at(&frames, duration * 2., twice), at(&frames, (duration * 2.) % duration, twice));
    assert_eq!(at(&frames, duration * 2. + eps, twice), None);
    assert_eq!(at(&frames, duration * 100., twice), None);
}

#[test]
fn infinite_never_finishes() {
    let frames = set(&[0.04, 0.06, 0.1]);
    let mut t = 0.;
    while t < 1000. {
        assert!(at(&frames, t, LoopCount::Infinite).is_some(), "{t}");
        t += 0.37;
    }
    assert!(at(&frames, 1e12, LoopCount::Infinite).is_some());
}

#[test]
fn zero_loops_still_plays_first_cycle() {
    let frames = set(&[1.0]);
    assert_eq!(at(&frames, 0.5, LoopCount::Finite(0)), Some(0));
    assert_eq!(at(&frames, 1.5, LoopCount::Finite(0)), None);
}

#[test]
fn before_start() {
    let frames = set(&[1.0]);
    assert_eq!(at(&frames, -0.1, LoopCount::Infinite), None);
    assert_eq!(at(&frames, f64::NAN, LoopCount::Infinite), None);
}

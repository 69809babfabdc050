//! What a decoder has to provide to build a [`GifDocument`][crate::GifDocument]
//!
//! [`GifSource`] is the implementation for GIF bytes. Anything else that can answer the
//! same per-index questions (another container format, a test fixture) can implement [`FrameSource`].

use crate::error::GifResult;
use imgref::ImgVec;
use rgb::RGBA8;

/// Used when a frame has no usable timing at all
pub const DEFAULT_DELAY: f64 = 1.0;

/// GIF delays are in 1/100th of a second
const CENTISECONDS: f64 = 100.;

/// A stored 1cs is raised to this. A stored 0 stays "not set" and ends up as [`DEFAULT_DELAY`].
const MIN_CLAMPED_DELAY_CS: u16 = 10;

/// Per-frame access to a decoded container.
///
/// Indices run from 0 to `frame_count() - 1`. Any of the per-index answers may be missing;
/// [`GifDocument`][crate::GifDocument] copes with that instead of failing.
pub trait FrameSource {
    type Image;

    /// Number of frame indices the container declares
    fn frame_count(&self) -> usize;

    /// Container-level loop count as stored in the file. `Some(0)` means forever, `None` means not specified.
    fn loop_count(&self) -> Option<u32>;

    /// Hands over the image for this index. Called at most once per index.
    fn image_at(&mut self, index: usize) -> Option<Self::Image>;

    /// Delay in seconds exactly as stored
    fn unclamped_delay_at(&self, index: usize) -> Option<f64>;

    /// Delay in seconds after the decoder's minimum-delay adjustment
    fn clamped_delay_at(&self, index: usize) -> Option<f64>;

    /// Delay to use for playback: the unclamped value if it's positive, then the clamped one,
    /// and [`DEFAULT_DELAY`] if neither is usable.
    fn delay_at(&self, index: usize) -> f64 {
        let usable = |d: Option<f64>| d.filter(|&d| d > 0. && d.is_finite());
        if let Some(delay) = usable(self.unclamped_delay_at(index)) {
            return delay;
        }
        if let Some(delay) = usable(self.clamped_delay_at(index)) {
            return delay;
        }
        debug!("frame {index} has no usable delay, using {DEFAULT_DELAY}s");
        DEFAULT_DELAY
    }
}

struct DecodedFrame {
    /// `None` if the frame couldn't be composited
    image: Option<ImgVec<RGBA8>>,
    delay_cs: u16,
}

/// GIF bytes decoded with the `gif` crate.
///
/// All frames are decoded up front and composited on the logical screen (disposal methods
/// and transparency applied), so every image is a complete canvas.
pub struct GifSource {
    frames: Vec<DecodedFrame>,
    repeat: gif::Repeat,
}

impl GifSource {
    /// Fails only if the header and screen descriptor can't be read.
    ///
    /// Errors later in the stream end the frame list early; the frame that failed is kept as an index without image.
    pub fn new(data: &[u8]) -> GifResult<Self> {
        let mut gif_opts = gif::DecodeOptions::new();
        // gif-dispose needs palette indices, not RGBA
        gif_opts.set_color_output(gif::ColorOutput::Indexed);

        let mut decoder = gif_opts.read_info(data)?;
        let mut screen = gif_dispose::Screen::new_decoder(&decoder);
        debug!("GIF screen {}x{}", decoder.width(), decoder.height());

        let mut frames = Vec::new();
        loop {
            let frame = match decoder.read_next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    debug!("frame {} is unreadable, stopping there: {err}", frames.len());
                    frames.push(DecodedFrame { image: None, delay_cs: 0 });
                    break;
                },
            };
            let image = match screen.blit_frame(frame) {
                Ok(()) => Some(screen.pixels_rgba().map_buf(|b| b.to_owned())),
                Err(err) => {
                    debug!("frame {} can't be drawn: {err}", frames.len());
                    None
                },
            };
            frames.push(DecodedFrame { image, delay_cs: frame.delay });
        }

        Ok(Self {
            frames,
            repeat: decoder.repeat(),
        })
    }
}

impl FrameSource for GifSource {
    type Image = ImgVec<RGBA8>;

    #[inline]
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn loop_count(&self) -> Option<u32> {
        match self.repeat {
            gif::Repeat::Infinite => Some(0),
            // the gif crate reports a missing NETSCAPE2.0 block as 0 repetitions
            gif::Repeat::Finite(0) => None,
            gif::Repeat::Finite(n) => Some(n.into()),
        }
    }

    fn image_at(&mut self, index: usize) -> Option<ImgVec<RGBA8>> {
        self.frames.get_mut(index)?.image.take()
    }

    fn unclamped_delay_at(&self, index: usize) -> Option<f64> {
        let cs = self.frames.get(index)?.delay_cs;
        (cs > 0).then(|| f64::from(cs) / CENTISECONDS)
    }

    fn clamped_delay_at(&self, index: usize) -> Option<f64> {
        let cs = match self.frames.get(index)?.delay_cs {
            0 => return None,
            1 => MIN_CLAMPED_DELAY_CS,
            cs => cs,
        };
        Some(f64::from(cs) / CENTISECONDS)
    }
}

#[cfg(test)]
struct Delays(Vec<(Option<f64>, Option<f64>)>);

#[cfg(test)]
impl FrameSource for Delays {
    type Image = ();
    fn frame_count(&self) -> usize { self.0.len() }
    fn loop_count(&self) -> Option<u32> { None }
    fn image_at(&mut self, _: usize) -> Option<()> { Some(()) }
    fn unclamped_delay_at(&self, index: usize) -> Option<f64> { self.0[index].0 }
    fn clamped_delay_at(&self, index: usize) -> Option<f64> { self.0[index].1 }
}

#[test]
fn delay_fallbacks() {
    let src = Delays(vec![
        (Some(0.02), Some(0.1)),
        (Some(0.), Some(0.1)),
        (None, Some(0.3)),
        (Some(0.), Some(0.)),
        (None, None),
        (Some(-1.), Some(-2.)),
        (Some(f64::NAN), None),
    ]);
    assert_eq!(src.delay_at(0), 0.02);
    assert_eq!(src.delay_at(1), 0.1);
    assert_eq!(src.delay_at(2), 0.3);
    assert_eq!(src.delay_at(3), DEFAULT_DELAY);
    assert_eq!(src.delay_at(4), DEFAULT_DELAY);
    assert_eq!(src.delay_at(5), DEFAULT_DELAY);
    assert_eq!(src.delay_at(6), DEFAULT_DELAY);
}

#[test]
fn not_a_gif() {
    assert!(GifSource::new(b"").is_err());
    assert!(GifSource::new(b"\x89PNG\r\n\x1a\n").is_err());
    assert!(GifSource::new(b"GIF89a").is_err());
}

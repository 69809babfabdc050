use crate::error::{Error, GifResult};
use crate::frame::{Frame, FrameSet};
use crate::source::{FrameSource, GifSource};
use crate::LoopCount;
use imgref::ImgVec;
use rgb::RGBA8;
use std::collections::HashMap;
use std::io;

/// Files without a NETSCAPE2.0 loop block are played once
pub const DEFAULT_LOOP_COUNT: u32 = 1;

/// Extension used for named resources
pub const RESOURCE_EXTENSION: &str = "gif";

/// Finds the bytes of a named resource, e.g. a file in an asset directory.
pub trait ResourceLocator {
    /// `Ok(None)` if there's nothing with this name.
    fn resolve(&self, name: &str, extension: &str) -> io::Result<Option<Vec<u8>>>;
}

/// Resources kept in memory, keyed by `name.extension`
#[derive(Debug, Default, Clone)]
pub struct ResourceBundle {
    files: HashMap<String, Vec<u8>>,
}

impl ResourceBundle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `file_name` includes the extension, e.g. `"spinner.gif"`
    pub fn insert(&mut self, file_name: impl Into<String>, data: Vec<u8>) {
        self.files.insert(file_name.into(), data);
    }
}

impl ResourceLocator for ResourceBundle {
    fn resolve(&self, name: &str, extension: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(&format!("{name}.{extension}")).cloned())
    }
}

/// A decoded animation: its frames and how many times to play them.
///
/// Built once, never modified. Drop it to free the frames.
#[derive(Debug, Clone)]
pub struct GifDocument<I = ImgVec<RGBA8>> {
    loop_count: LoopCount,
    frames: FrameSet<I>,
}

impl GifDocument {
    /// Decodes GIF bytes.
    ///
    /// Fails only if the data isn't a readable GIF. Broken frames further in are skipped,
    /// so a partially corrupt file still gives a playable document.
    pub fn decode(data: &[u8]) -> GifResult<Self> {
        let source = GifSource::new(data)?;
        Ok(Self::from_source(source))
    }

    /// Looks up `name.gif` with the locator, then decodes it like [`Self::decode`].
    pub fn from_named(name: &str, locator: &dyn ResourceLocator) -> GifResult<Self> {
        let data = locator.resolve(name, RESOURCE_EXTENSION)?
            .ok_or_else(|| Error::ResourceNotFound(name.to_owned()))?;
        Self::decode(&data)
    }
}

impl<I> GifDocument<I> {
    /// Builds a document from any decoder.
    ///
    /// Indices without an image are left out. Delays come from [`FrameSource::delay_at`].
    pub fn from_source<S: FrameSource<Image = I>>(mut source: S) -> Self {
        let loop_count = match source.loop_count() {
            None => {
                debug!("no loop count, playing {DEFAULT_LOOP_COUNT} time(s)");
                LoopCount::Finite(DEFAULT_LOOP_COUNT)
            },
            Some(0) => LoopCount::Infinite,
            Some(n) => LoopCount::Finite(n),
        };

        let frame_count = source.frame_count();
        let mut frames = Vec::with_capacity(frame_count);
        for index in 0..frame_count {
            let Some(image) = source.image_at(index) else {
                debug!("skipping frame {index}, no image");
                continue;
            };
            frames.push(Frame::new(image, source.delay_at(index)));
        }
        debug!("decoded {} of {frame_count} frames, loop count {loop_count}", frames.len());

        Self {
            loop_count,
            frames: FrameSet::new(frames),
        }
    }

    /// Loop count declared by the file (or the default)
    #[inline]
    pub fn loop_count(&self) -> LoopCount {
        self.loop_count
    }

    /// `loop_override`, if given, wins over the file's own loop count.
    #[inline]
    pub fn effective_loop_count(&self, loop_override: Option<LoopCount>) -> LoopCount {
        loop_override.unwrap_or(self.loop_count)
    }

    #[inline]
    pub fn frames(&self) -> &FrameSet<I> {
        &self.frames
    }

    #[inline]
    pub fn into_frames(self) -> FrameSet<I> {
        self.frames
    }

    /// Frame visible after `elapsed` seconds, using [`Self::effective_loop_count`].
    /// `None` when there is nothing to show or the animation has finished.
    #[inline]
    pub fn frame_at(&self, elapsed: f64, loop_override: Option<LoopCount>) -> Option<&Frame<I>> {
        self.frames.frame_at(elapsed, self.effective_loop_count(loop_override))
    }
}

#[cfg(test)]
struct Mock {
    loop_count: Option<u32>,
    /// image present, unclamped, clamped
    frames: Vec<(bool, Option<f64>, Option<f64>)>,
}

#[cfg(test)]
impl FrameSource for Mock {
    type Image = usize;
    fn frame_count(&self) -> usize { self.frames.len() }
    fn loop_count(&self) -> Option<u32> { self.loop_count }
    fn image_at(&mut self, index: usize) -> Option<usize> { self.frames[index].0.then_some(index) }
    fn unclamped_delay_at(&self, index: usize) -> Option<f64> { self.frames[index].1 }
    fn clamped_delay_at(&self, index: usize) -> Option<f64> { self.frames[index].2 }
}

#[test]
fn loop_count_mapping() {
    let doc = |loop_count| GifDocument::from_source(Mock { loop_count, frames: vec![] });
    assert_eq!(doc(None).loop_count(), LoopCount::Finite(1));
    assert_eq!(doc(Some(0)).loop_count(), LoopCount::Infinite);
    assert_eq!(doc(Some(3)).loop_count(), LoopCount::Finite(3));
    assert_eq!(doc(Some(0)).effective_loop_count(None), LoopCount::Infinite);
}

#[test]
fn override_wins() {
    let doc = GifDocument::from_source(Mock { loop_count: Some(0), frames: vec![(true, Some(1.), None)] });
    assert_eq!(doc.effective_loop_count(Some(LoopCount::Finite(2))), LoopCount::Finite(2));
    assert!(doc.frame_at(2.5, Some(LoopCount::Finite(2))).is_none());
    assert!(doc.frame_at(2.5, None).is_some());
}

#[test]
fn missing_images_are_skipped() {
    let doc = GifDocument::from_source(Mock {
        loop_count: None,
        frames: vec![
            (true, Some(0.1), None),
            (false, Some(0.2), None),
            (true, None, Some(0.3)),
            (true, Some(0.), Some(0.)),
            (false, None, None),
        ],
    });
    let frames: Vec<_> = doc.frames().iter().map(|f| (*f.image(), f.delay())).collect();
    assert_eq!(frames, [(0, 0.1), (2, 0.3), (3, 1.0)]);
}

#[test]
fn named_resources() {
    let mut bundle = ResourceBundle::new();
    bundle.insert("broken.gif", b"GIF89a\x01".to_vec());
    assert!(matches!(GifDocument::from_named("missing", &bundle), Err(Error::ResourceNotFound(name)) if name == "missing"));
    assert!(matches!(GifDocument::from_named("broken", &bundle), Err(Error::UnreadableContainer(_))));
}

#[test]
fn unreadable_resource() {
    struct Failing;
    impl ResourceLocator for Failing {
        fn resolve(&self, _: &str, _: &str) -> io::Result<Option<Vec<u8>>> {
            Err(io::ErrorKind::PermissionDenied.into())
        }
    }
    assert!(matches!(GifDocument::from_named("x", &Failing), Err(Error::UnreadableContainer(_))));
}

//! For finding out when an animation has played all of its loops

use crossbeam_channel::Sender;

/// A trait that is used to report the end of playback to some consumer.
pub trait CompletionHandler: Send {
    /// Called once each time playback goes from showing a frame to finished.
    fn finished(&mut self);
}

/// No-op completion handler
pub struct NoCompletion {}

impl CompletionHandler for NoCompletion {
    #[inline]
    fn finished(&mut self) {}
}

/// Sends `()` per completion. Never blocks: use an unbounded channel, or a full one will miss notifications.
impl CompletionHandler for Sender<()> {
    fn finished(&mut self) {
        if self.try_send(()).is_err() {
            debug!("completion not delivered, receiver is gone or full");
        }
    }
}

/// Wraps a closure
pub struct OnComplete<F>(pub F);

impl<F: FnMut() + Send> CompletionHandler for OnComplete<F> {
    #[inline]
    fn finished(&mut self) {
        (self.0)()
    }
}

#[test]
fn channel_handler() {
    let (s, r) = crossbeam_channel::unbounded();
    let mut handler: Box<dyn CompletionHandler> = Box::new(s);
    handler.finished();
    handler.finished();
    assert_eq!(r.try_iter().count(), 2);
    drop(r);
    handler.finished();
}

#[test]
fn closure_handler() {
    let mut n = 0;
    {
        let mut handler = OnComplete(|| n += 1);
        handler.finished();
    }
    assert_eq!(n, 1);
}

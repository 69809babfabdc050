//! Decoding off the render thread
//!
//! Decoding is blocking and CPU-bound. [`Loader`] runs each decode on its own thread and
//! queues the results; a [`Player`][crate::Player] picks them up with [`Player::poll`][crate::Player::poll].
//! There is no cancellation: a superseded decode runs to completion and its result is dropped by the player.

use crate::document::ResourceLocator;
use crate::error::{Error, GifResult};
use crate::GifDocument;
use crossbeam_channel::{Receiver, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;

/// Identifies one decode request. See [`Player::request`][crate::Player::request].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Ticket(pub(crate) u64);

/// A finished decode
pub struct Loaded {
    pub ticket: Ticket,
    pub result: GifResult<GifDocument>,
}

pub struct Loader {
    sender: Sender<Loaded>,
    receiver: Receiver<Loaded>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Starts decoding `data` on a new thread.
    pub fn decode(&self, ticket: Ticket, data: Vec<u8>) -> GifResult<()> {
        self.spawn(ticket, move || GifDocument::decode(&data))
    }

    /// Starts resolving and decoding a named resource on a new thread.
    pub fn decode_named<L>(&self, ticket: Ticket, name: String, locator: L) -> GifResult<()>
        where L: ResourceLocator + Send + 'static
    {
        self.spawn(ticket, move || GifDocument::from_named(&name, &locator))
    }

    fn spawn<F>(&self, ticket: Ticket, decode: F) -> GifResult<()>
        where F: FnOnce() -> GifResult<GifDocument> + Send + 'static
    {
        let sender = self.sender.clone();
        thread::Builder::new().name("decode".into()).spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(decode)).unwrap_or_else(|_| {
                debug!("decode {ticket:?} panicked");
                Err(Error::Aborted)
            });
            if sender.send(Loaded { ticket, result }).is_err() {
                debug!("decode {ticket:?} finished after the loader was dropped");
            }
        }).map_err(|_| Error::ThreadSend)?;
        Ok(())
    }

    /// A finished decode, if there is one. Never blocks.
    #[inline]
    pub fn try_recv(&self) -> Option<Loaded> {
        self.receiver.try_recv().ok()
    }

    /// Waits for the next decode to finish.
    ///
    /// Results arrive in the order decodes finish, not the order they were started.
    pub fn recv(&self) -> GifResult<Loaded> {
        Ok(self.receiver.recv()?)
    }
}

#[test]
fn failed_decode_is_delivered() {
    let loader = Loader::new();
    loader.decode(Ticket(7), b"not a gif".to_vec()).unwrap();
    let loaded = loader.recv().unwrap();
    assert_eq!(loaded.ticket, Ticket(7));
    assert!(matches!(loaded.result, Err(Error::UnreadableContainer(_))));
    assert!(loader.try_recv().is_none());
}

#[test]
fn named_decode_not_found() {
    let loader = Loader::new();
    loader.decode_named(Ticket(1), "nope".into(), crate::ResourceBundle::new()).unwrap();
    let loaded = loader.recv().unwrap();
    assert!(matches!(loaded.result, Err(Error::ResourceNotFound(_))));
}

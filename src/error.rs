use std::io;
use quick_error::quick_error;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// The bytes are not a GIF, or the header/screen descriptor is broken
        UnreadableContainer(err: gif::DecodingError) {
            from()
            from(err: io::Error) -> (gif::DecodingError::from(err))
            display("unreadable GIF: {}", err)
            source(err)
        }
        ResourceNotFound(name: String) {
            display("resource \"{}\" not found", name)
        }
        /// Internal error
        ThreadSend {
            display("Internal error; decode thread could not be started")
        }
        Aborted {
            display("aborted")
        }
    }
}

pub type GifResult<T, E = Error> = Result<T, E>;

impl From<crossbeam_channel::RecvError> for Error {
    #[cold]
    fn from(_: crossbeam_channel::RecvError) -> Self {
        Self::Aborted
    }
}

#[test]
fn io_errors_are_unreadable() {
    let err = Error::from(io::Error::new(io::ErrorKind::UnexpectedEof, "short"));
    assert!(matches!(err, Error::UnreadableContainer(gif::DecodingError::Io(_))));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn not_found_names_the_resource() {
    let err = Error::ResourceNotFound("spinner".into());
    assert_eq!(err.to_string(), "resource \"spinner\" not found");
}

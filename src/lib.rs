use thiserror::Error;

#[macro_use]
pub (crate) mod sys;

#[macro_use]
pub (crate) mod logging;

mod os_error;

pub mod io;
pub mod net;

pub use os_error::OsError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("OS error: {0}")]
    Os(#[from] OsError),

    #[error("Payload error: {0}")]
    Payload(#[from] io::PayloadError),

    #[error("Sequence error: {0}")]
    Sequence(#[from] io::SequenceError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] io::AdapterError),

    #[error("Endpoint error: {0}")]
    Endpoint(#[from] net::EndpointError),
}

pub type Result<T> = std::result::Result<T, Error>;

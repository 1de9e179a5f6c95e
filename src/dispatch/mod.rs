pub mod executor;
pub mod response;
pub mod transport;
pub mod types;

pub use executor::Dispatcher;
pub use transport::{
    HttpTransport, RawCapture, Transport, TransportError, TransportRequest, BODY_CAPTURE_LIMIT,
    CALL_TIMEOUT,
};
pub use types::*;

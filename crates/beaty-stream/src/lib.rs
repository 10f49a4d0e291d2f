//! Wire side of the Beaty client.
//!
//! Turns the chunked `text/event-stream` body of `POST /query` into typed
//! [`StreamEvent`]s: bytes are decoded by [`Utf8Carry`], split into frames by
//! [`TransportFramer`], and exposed as a `futures::Stream` by [`QueryClient`].

pub mod client;
pub mod decode;
pub mod error;
pub mod event;
pub mod framer;
pub mod payload;

pub use client::{EventStream, FramedEvents, QueryClient, QueryTransport};
pub use decode::Utf8Carry;
pub use error::StreamError;
pub use event::StreamEvent;
pub use framer::{TransportFramer, INCOMPLETE_STREAM};
pub use payload::DataPayload;

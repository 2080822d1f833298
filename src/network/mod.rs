//! Transport abstraction for the request multiplexer
//!
//! The multiplexer never touches sockets itself. A [`Connector`] opens one
//! [`Transport`] per request from a [`TransportConfig`](http::TransportConfig),
//! and the transport performs the actual socket, TLS and HTTP work in small
//! non-blocking steps, reporting progress as [`Event`]s.
//!

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for multiplexer operations
pub mod error;

/// HTTP request multiplexer
pub mod http;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Connector, Transport};
}

/// Low-level diagnostic codes reported alongside a disconnect.
///
/// These are only ever logged; they are never surfaced to request callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostic {
    /// Transport-level error code, `0` if none.
    pub code: i32,
    /// TLS library error code, `0` if none.
    pub tls_code: i32,
}

impl Diagnostic {
    /// Returns `true` if either code reports a failure.
    pub fn is_error(&self) -> bool {
        self.code != 0 || self.tls_code != 0
    }
}

/// A lifecycle notification raised by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// The connection to the host was established.
    Connected,
    /// The request headers were sent.
    HeaderSent,
    /// A response header was received.
    HeaderReceived {
        /// Header name.
        key: &'a str,
        /// Header value.
        value: &'a str,
    },
    /// A chunk of the response body was received.
    Data {
        /// The HTTP status of the response the chunk belongs to.
        status: u16,
        /// The body bytes.
        chunk: &'a [u8],
    },
    /// The response body is complete.
    Finished {
        /// The HTTP status of the finished response.
        status: u16,
    },
    /// The connection was torn down.
    Disconnected {
        /// Low-level error codes captured at disconnect, if any.
        diagnostic: Option<Diagnostic>,
    },
    /// The transport failed (connection, TLS, or protocol error).
    Error,
}

/// A single request's connection, driven in non-blocking steps.
///
/// Every method that may raise events receives the sink to raise them into.
/// Implementations must never block for long inside these methods: the
/// scheduler services every request from one loop.
pub trait Transport {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Perform one incremental step of the exchange.
    ///
    /// Returns `Ok(())` both when progress was made and when the step would
    /// have blocked. Fatal failures should additionally be reported as
    /// [`Event::Error`].
    fn perform(&mut self, events: &mut dyn FnMut(Event<'_>)) -> Result<(), Self::Error>;

    /// Begin closing the connection.
    ///
    /// Called once per scheduler tick while the request is closing. The
    /// transport must eventually report [`Event::Disconnected`], either from
    /// this call or from a later one.
    fn close(&mut self, events: &mut dyn FnMut(Event<'_>)) -> Result<(), Self::Error>;

    /// Release every resource held by the transport.
    fn cleanup(self) -> Result<(), Self::Error>;
}

/// Opens transports for requests.
pub trait Connector {
    /// Associated transport type
    type Transport: Transport;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a transport configured for one request
    fn open(&mut self, config: &http::TransportConfig) -> Result<Self::Transport, Self::Error>;
}

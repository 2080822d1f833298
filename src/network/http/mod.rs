//! Non-blocking HTTP request multiplexer for embedded systems.
//!
//! This module lets one polling loop service many concurrent HTTP requests on
//! a device without OS-level async I/O. Each request is driven by its own
//! [`Transport`](crate::network::Transport); the [`Multiplexer`] steps every
//! live transport once per tick and routes the events they raise to the
//! request's callback.
//!
//! # Buffering modes
//!
//! Each request picks one buffering mode when it is issued:
//!
//! - **Passthrough** (`max_len == 0`): every body chunk is delivered as-is.
//! - **Line buffered**: the body is split into lines of up to `max_len - 1`
//!   bytes and each line is delivered separately.
//! - **Accumulate**: the body is collected into a `max_len` buffer and
//!   delivered once, when the response finishes.
//!
//! # Lifecycle
//!
//! ```text
//! Runnable ──close / error / finish──▶ Closeable ──disconnect──▶ Killable
//!     │                                                              │
//!     └──────────────────────disconnect──────────────────────────────┤
//!                                                                    ▼
//!                                       removed ◀──reap── Dead ◀──cleanup
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use httpmux::config::Config;
//! use httpmux::network::http::Multiplexer;
//! # use httpmux::network::{Connector, Event, Transport};
//! # use httpmux::network::http::TransportConfig;
//! # struct MockTransport;
//! # impl Transport for MockTransport {
//! #     type Error = ();
//! #     fn perform(&mut self, _: &mut dyn FnMut(Event<'_>)) -> Result<(), ()> { Ok(()) }
//! #     fn close(&mut self, _: &mut dyn FnMut(Event<'_>)) -> Result<(), ()> { Ok(()) }
//! #     fn cleanup(self) -> Result<(), ()> { Ok(()) }
//! # }
//! # struct MockConnector;
//! # impl Connector for MockConnector {
//! #     type Transport = MockTransport;
//! #     type Error = ();
//! #     fn open(&mut self, _: &TransportConfig) -> Result<MockTransport, ()> { Ok(MockTransport) }
//! # }
//!
//! let mut mux = Multiplexer::new(MockConnector, Config::default());
//!
//! let id = mux
//!     .get("api.example.com", "/status", None, 0, false, &[], false, |delivery| {
//!         if let Ok(Some(chunk)) = delivery.result() {
//!             // consume chunk
//!             let _ = chunk;
//!         }
//!     })
//!     .unwrap();
//!
//! loop {
//!     mux.tick();
//!     # break;
//! }
//! # let _ = id;
//! ```

use crate::network::error::Error;
use alloc::string::String as HeapString;
use alloc::vec::Vec;
use heapless::{String, Vec as FixedVec};

mod adapter;
pub mod auth;
mod multiplexer;
mod registry;
mod request;

#[cfg(all(test, feature = "std"))]
mod tests;

pub use adapter::Directive;
pub use multiplexer::{Multiplexer, Tick};
pub use request::{Delivery, Mode, Options, Request, RequestId, State};

pub(crate) use adapter::dispatch;
pub(crate) use registry::Registry;
pub(crate) use request::{Closer, IdSource};

/// Maximum number of request headers.
pub const MAX_HEADERS: usize = 4;
/// Maximum length of a header name.
pub const MAX_HEADER_NAME_LEN: usize = 32;
/// Maximum length of a header value.
pub const MAX_HEADER_VALUE_LEN: usize = 512;

/// Content type sent with every request body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// The method as it appears on the request line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// How the transport authenticates the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TlsPolicy {
    /// TLS, verifying the server against the bundled root certificates.
    #[default]
    CertificateBundle,
    /// Plain-text HTTP.
    PlainText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String<MAX_HEADER_NAME_LEN>,
    pub value: String<MAX_HEADER_VALUE_LEN>,
}

impl Header {
    /// Build a header, failing with [`Error::InvalidHeader`] if it does not fit.
    pub fn new(name: &str, value: &str) -> Result<Self, Error> {
        Ok(Self {
            name: String::try_from(name).map_err(|_| Error::InvalidHeader)?,
            value: String::try_from(value).map_err(|_| Error::InvalidHeader)?,
        })
    }
}

/// Everything a [`Connector`](crate::network::Connector) needs to open the
/// transport for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub host: HeapString,
    pub path: HeapString,
    pub method: Method,
    pub headers: FixedVec<Header, MAX_HEADERS>,
    /// Request body, sent as `application/x-www-form-urlencoded`.
    pub body: Option<Vec<u8>>,
    pub timeout_ms: u32,
    pub tls: TlsPolicy,
    /// Always `true`: transports must never block the scheduler.
    pub non_blocking: bool,
}

impl TransportConfig {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

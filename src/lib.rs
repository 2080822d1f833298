//! # httpmux - non-blocking HTTP request multiplexer
//!
//! A small engine that lets constrained devices run many concurrent HTTP
//! requests from a single cooperatively scheduled loop, without OS-level
//! async I/O. Each request owns a non-blocking transport; the scheduler steps
//! every live transport once per tick and routes its events to the caller's
//! callback, optionally splitting the body into lines or accumulating it into
//! a fixed-size buffer first.
//!
//! ## Features
//!
//! - **Request multiplexer**: issue GET and form-encoded POST requests, close
//!   them explicitly, and keep long-lived streams open across responses
//! - **Buffering modes**: passthrough, line buffered, or accumulate
//! - **Fallible allocation**: every buffer is allocated at issuance; running
//!   out of memory is an error, never a panic
//! - **Background scheduler**: a dedicated thread fed through a command
//!   channel (`std` only)
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! httpmux = "0.1.0"
//! ```
//!
//! ### Driving the multiplexer by hand
//!
//! ```rust,no_run
//! use httpmux::config::Config;
//! use httpmux::network::http::{Multiplexer, Options};
//! # use httpmux::network::{Connector, Event, Transport};
//! # use httpmux::network::http::TransportConfig;
//! # struct Tcp;
//! # impl Transport for Tcp {
//! #     type Error = ();
//! #     fn perform(&mut self, _: &mut dyn FnMut(Event<'_>)) -> Result<(), ()> { Ok(()) }
//! #     fn close(&mut self, _: &mut dyn FnMut(Event<'_>)) -> Result<(), ()> { Ok(()) }
//! #     fn cleanup(self) -> Result<(), ()> { Ok(()) }
//! # }
//! # struct TcpConnector;
//! # impl Connector for TcpConnector {
//! #     type Transport = Tcp;
//! #     type Error = ();
//! #     fn open(&mut self, _: &TransportConfig) -> Result<Tcp, ()> { Ok(Tcp) }
//! # }
//!
//! let mut mux = Multiplexer::new(TcpConnector, Config::default());
//!
//! let options = Options {
//!     max_len: 1024,
//!     line_buffered: true,
//!     auto_resume: true,
//!     ..Options::get("stream.example.com", "/1.1/statuses/filter.json")
//! };
//! mux.issue(&options, |delivery| {
//!     if let Some(line) = delivery.data() {
//!         let _ = line;
//!     }
//! })
//! .unwrap();
//!
//! loop {
//!     mux.tick();
//!     # break;
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `std`: background scheduler thread and `std::error::Error` (default: enabled)
//! - `defmt`: log through `defmt` for embedded debugging
//! - `log`: log through the `log` facade

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

extern crate alloc;

#[macro_use]
mod fmt;

/// Scheduler and transport configuration.
pub mod config;

/// Line splitting for line-buffered responses.
pub mod linebuffer;

/// Transport abstraction and the HTTP request multiplexer.
pub mod network;

/// System integration: watchdog and the background scheduler thread.
pub mod system;

//! Common error types for the request multiplexer

/// A common error type for request issuance and delivery.
///
/// This enum defines every fault the multiplexer can surface, either as the
/// return value of an issuing operation or as the result carried by a
/// [`Delivery`](crate::network::http::Delivery). It is designed to be simple
/// and portable for `no_std` environments.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// A required argument was missing or empty (host, path).
    InvalidArgument,
    /// A header value did not fit the fixed header capacity.
    InvalidHeader,
    /// An allocation for buffers or cloned data failed.
    OutOfMemory,
    /// The response body did not fit the accumulate buffer.
    BufferOverflow,
    /// The line splitter rejected a write.
    LineBuffer,
    /// The transport could not be opened for this request.
    Transport,
    /// A configuration document could not be parsed.
    InvalidConfig,
    /// The scheduler thread could not be started.
    Spawn,
    /// The scheduler is no longer running.
    Shutdown,
    /// The request id wrapped around onto a request that is still live.
    IdInUse,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Error::InvalidArgument => "invalid argument",
            Error::InvalidHeader => "header value too long",
            Error::OutOfMemory => "out of memory",
            Error::BufferOverflow => "response buffer too small",
            Error::LineBuffer => "line buffer write failed",
            Error::Transport => "transport unavailable",
            Error::InvalidConfig => "invalid configuration",
            Error::Spawn => "scheduler could not be started",
            Error::Shutdown => "scheduler is shut down",
            Error::IdInUse => "request id still in use",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::InvalidArgument => defmt::write!(f, "InvalidArgument"),
            Error::InvalidHeader => defmt::write!(f, "InvalidHeader"),
            Error::OutOfMemory => defmt::write!(f, "OutOfMemory"),
            Error::BufferOverflow => defmt::write!(f, "BufferOverflow"),
            Error::LineBuffer => defmt::write!(f, "LineBuffer"),
            Error::Transport => defmt::write!(f, "Transport"),
            Error::InvalidConfig => defmt::write!(f, "InvalidConfig"),
            Error::Spawn => defmt::write!(f, "Spawn"),
            Error::Shutdown => defmt::write!(f, "Shutdown"),
            Error::IdInUse => defmt::write!(f, "IdInUse"),
        }
    }
}

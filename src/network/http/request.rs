//! One HTTP exchange and everything it owns.

use super::{FORM_CONTENT_TYPE, Header, Method, TransportConfig};
use crate::config::Config;
use crate::linebuffer::LineBuffer;
use crate::network::error::Error;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};
use heapless::Vec as FixedVec;

/// Opaque handle to an issued request.
///
/// Handles stay valid after the request is disposed; operations on a stale
/// handle are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestId(pub(crate) u32);

impl RequestId {
    /// The raw handle value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Mints request ids. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub(crate) struct IdSource(Arc<AtomicU32>);

impl IdSource {
    pub(crate) fn next(&self) -> RequestId {
        RequestId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lifecycle state of a request. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Active; serviced once per tick.
    Runnable,
    /// Waiting for the transport to disconnect.
    Closeable,
    /// Disconnected; transport resources are released on the next tick.
    Killable,
    /// Transport released; waiting to be reaped.
    Dead,
}

/// Buffering mode of a request, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Passthrough,
    LineBuffered,
    Accumulate,
}

/// Parameters of a request to issue.
#[derive(Debug, Clone, Copy)]
pub struct Options<'a> {
    pub host: &'a str,
    pub path: &'a str,
    /// Value of the `Authorization` header, if any.
    pub auth: Option<&'a str>,
    pub method: Method,
    /// Form-encoded request body.
    pub body: Option<&'a [u8]>,
    /// `0` for passthrough, otherwise the line or body buffer size.
    pub max_len: usize,
    pub line_buffered: bool,
    /// Caller data cloned into the request and handed back on every delivery.
    pub context: &'a [u8],
    /// Keep the request open across finished responses while the server
    /// answers `200`.
    pub auto_resume: bool,
}

impl<'a> Options<'a> {
    /// A passthrough GET with no authorization and no context.
    pub fn get(host: &'a str, path: &'a str) -> Self {
        Self {
            host,
            path,
            auth: None,
            method: Method::Get,
            body: None,
            max_len: 0,
            line_buffered: false,
            context: &[],
            auto_resume: false,
        }
    }

    /// A passthrough POST of `body`.
    pub fn post(host: &'a str, path: &'a str, body: &'a [u8]) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(host, path)
        }
    }
}

/// Close requests raised from inside callbacks, applied by the scheduler
/// after the current service step.
#[derive(Debug, Default)]
pub(crate) struct Closer {
    pending: Vec<RequestId>,
}

impl Closer {
    /// Queue a close. The queue keeps its capacity between ticks, so it only
    /// allocates when more closes are pending at once than ever before.
    pub(crate) fn request(&mut self, id: RequestId) {
        if self.pending.try_reserve(1).is_err() {
            error!("request {:?}: out of memory, close dropped", id);
            return;
        }
        self.pending.push(id);
    }

    pub(crate) fn pop(&mut self) -> Option<RequestId> {
        self.pending.pop()
    }
}

/// One callback invocation.
///
/// `result` is `Ok(Some(bytes))` for data, `Ok(None)` at end of stream, and
/// `Err(_)` when the buffering strategy could not keep up with the response.
#[derive(Debug)]
pub struct Delivery<'a> {
    id: RequestId,
    status: u16,
    result: Result<Option<&'a [u8]>, Error>,
    context: &'a [u8],
    closer: &'a mut Closer,
}

impl<'a> Delivery<'a> {
    /// The request this delivery belongs to.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The last HTTP status observed for the request, `0` before any.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn result(&self) -> Result<Option<&'a [u8]>, Error> {
        self.result
    }

    /// The delivered bytes, if this is a successful data delivery.
    pub fn data(&self) -> Option<&'a [u8]> {
        self.result.ok().flatten()
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns `true` for the end-of-stream delivery of passthrough and
    /// line-buffered requests.
    pub fn is_end(&self) -> bool {
        matches!(self.result, Ok(None))
    }

    /// The caller context cloned at issuance.
    pub fn context(&self) -> &'a [u8] {
        self.context
    }

    /// Close a request, this one included.
    ///
    /// The close is applied once the current service step returns. If the
    /// close queue cannot grow the close is logged and dropped.
    pub fn close(&mut self, id: RequestId) {
        self.closer.request(id);
    }
}

pub(crate) type Callback = Box<dyn FnMut(&mut Delivery<'_>) + Send>;

/// Invoke `callback` with a freshly built [`Delivery`].
pub(super) fn invoke(
    callback: &mut Callback,
    id: RequestId,
    status: u16,
    context: &[u8],
    closer: &mut Closer,
    result: Result<Option<&[u8]>, Error>,
) {
    let mut delivery = Delivery {
        id,
        status,
        result,
        context,
        closer,
    };
    callback(&mut delivery);
}

/// Fixed-capacity body buffer for accumulate mode.
///
/// One slot of the capacity stays reserved, so the body never exceeds
/// `capacity - 1` bytes.
#[derive(Debug)]
pub(super) struct Accumulator {
    body: Vec<u8>,
    limit: usize,
    overflowed: bool,
}

impl Accumulator {
    fn new(capacity: usize) -> Result<Self, Error> {
        let mut body = Vec::new();
        body.try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory)?;
        Ok(Self {
            body,
            limit: capacity.saturating_sub(1),
            overflowed: false,
        })
    }

    /// Append a chunk, or mark the response overflowed if it does not fit.
    ///
    /// Returns `Err` only for the chunk that first overflows; later chunks of
    /// the same response are dropped silently.
    pub(super) fn append(&mut self, chunk: &[u8]) -> Result<(), Error> {
        if self.overflowed {
            return Ok(());
        }
        if chunk.len() <= self.limit - self.body.len() {
            self.body.extend_from_slice(chunk);
            Ok(())
        } else {
            self.overflowed = true;
            Err(Error::BufferOverflow)
        }
    }

    /// The body buffered so far. After an overflow this is whatever fit
    /// before the overflowing chunk.
    pub(super) fn finish(&self) -> &[u8] {
        &self.body
    }

    pub(super) fn clear(&mut self) {
        self.body.clear();
        self.overflowed = false;
    }

    pub(super) fn len(&self) -> usize {
        self.body.len()
    }
}

#[derive(Debug)]
pub(super) enum Buffering {
    Passthrough,
    Lines(LineBuffer),
    Accumulate(Accumulator),
}

/// One in-flight or recently finished HTTP exchange.
///
/// A request owns its buffers, its transport configuration, the caller's
/// callback and a clone of the caller's context. It is created by issuance
/// and dropped only by the scheduler when it is reaped.
pub struct Request {
    pub(super) id: RequestId,
    pub(super) state: State,
    pub(super) buffering: Buffering,
    pub(super) config: TransportConfig,
    pub(super) callback: Callback,
    pub(super) context: Vec<u8>,
    pub(super) auto_resume: bool,
    pub(super) status: u16,
}

impl core::fmt::Debug for Request {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("mode", &self.mode())
            .field("host", &self.config.host)
            .field("path", &self.config.path)
            .field("auto_resume", &self.auto_resume)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Request {
    /// Build a request, performing every allocation it will ever need.
    ///
    /// Nothing is registered here; a failure simply drops whatever was
    /// allocated so far.
    pub(crate) fn new<F>(
        id: RequestId,
        options: &Options<'_>,
        config: &Config,
        callback: F,
    ) -> Result<Self, Error>
    where
        F: FnMut(&mut Delivery<'_>) + Send + 'static,
    {
        if options.host.is_empty() || options.path.is_empty() {
            return Err(Error::InvalidArgument);
        }

        let context = try_clone(options.context)?;
        let buffering = match (options.max_len, options.line_buffered) {
            (0, _) => Buffering::Passthrough,
            (max_len, true) => Buffering::Lines(LineBuffer::new(max_len)?),
            (max_len, false) => Buffering::Accumulate(Accumulator::new(max_len)?),
        };
        let body = options.body.map(try_clone).transpose()?;

        let mut headers = FixedVec::new();
        if let Some(auth) = options.auth {
            headers
                .push(Header::new("Authorization", auth)?)
                .map_err(|_| Error::InvalidHeader)?;
        }
        if body.is_some() {
            headers
                .push(Header::new("Content-Type", FORM_CONTENT_TYPE)?)
                .map_err(|_| Error::InvalidHeader)?;
        }

        let config = TransportConfig {
            host: try_clone_str(options.host)?,
            path: try_clone_str(options.path)?,
            method: options.method,
            headers,
            body,
            timeout_ms: config.request_timeout_ms,
            tls: config.tls,
            non_blocking: true,
        };

        Ok(Self {
            id,
            state: State::Runnable,
            buffering,
            config,
            callback: Box::new(callback),
            context,
            auto_resume: options.auto_resume,
            status: 0,
        })
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn mode(&self) -> Mode {
        match self.buffering {
            Buffering::Passthrough => Mode::Passthrough,
            Buffering::Lines(_) => Mode::LineBuffered,
            Buffering::Accumulate(_) => Mode::Accumulate,
        }
    }

    pub fn auto_resume(&self) -> bool {
        self.auto_resume
    }

    /// The last HTTP status observed, `0` before any response.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn context(&self) -> &[u8] {
        &self.context
    }

    /// The configuration the transport was opened with.
    pub fn transport_config(&self) -> &TransportConfig {
        &self.config
    }

    /// Move to `next` if that is a step forward. Returns whether it moved.
    pub(crate) fn advance(&mut self, next: State) -> bool {
        if next > self.state {
            trace!("request {:?}: {:?} -> {:?}", self.id, self.state, next);
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Explicit close: only a Runnable request becomes Closeable.
    pub(crate) fn close(&mut self) -> bool {
        self.state == State::Runnable && self.advance(State::Closeable)
    }

    /// Report a failure that prevented the request from ever starting, then
    /// drop it.
    pub(crate) fn fail(mut self, error: Error, closer: &mut Closer) {
        invoke(
            &mut self.callback,
            self.id,
            self.status,
            &self.context,
            closer,
            Err(error),
        );
    }
}

fn try_clone(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut clone = Vec::new();
    clone
        .try_reserve_exact(bytes.len())
        .map_err(|_| Error::OutOfMemory)?;
    clone.extend_from_slice(bytes);
    Ok(clone)
}

fn try_clone_str(text: &str) -> Result<String, Error> {
    let mut clone = String::new();
    clone
        .try_reserve_exact(text.len())
        .map_err(|_| Error::OutOfMemory)?;
    clone.push_str(text);
    Ok(clone)
}

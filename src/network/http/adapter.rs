//! Translation of transport events into request transitions and deliveries.

use super::request::{Buffering, Closer, Request, State, invoke};
use crate::fmt::Dbg;
use crate::network::Event;
use crate::network::error::Error;

/// What the scheduler must do with the transport after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Directive {
    /// Nothing further.
    Continue,
    /// Data arrived for a request that is no longer running; close the
    /// transport once the current step returns.
    CloseTransport,
}

/// Apply one transport event to `request`.
///
/// Deliveries happen synchronously, before this returns. Closes requested by
/// the callback are queued on `closer`.
pub(crate) fn dispatch(request: &mut Request, event: Event<'_>, closer: &mut Closer) -> Directive {
    match event {
        Event::Connected => {
            trace!("request {:?}: connected", request.id);
        }
        Event::HeaderSent => {
            trace!("request {:?}: header sent", request.id);
        }
        Event::HeaderReceived { key, value } => {
            trace!("request {:?}: header {}: {}", request.id, key, value);
        }
        Event::Data { status, chunk } => {
            if request.state != State::Runnable {
                return Directive::CloseTransport;
            }
            request.status = status;
            on_data(request, chunk, closer);
        }
        Event::Finished { status } => {
            request.status = status;
            on_finish(request, closer);
        }
        Event::Disconnected { diagnostic } => {
            if let Some(diagnostic) = diagnostic.filter(|d| d.is_error()) {
                warn!(
                    "request {:?}: disconnected, code {} tls code {}",
                    request.id,
                    diagnostic.code,
                    diagnostic.tls_code
                );
            }
            request.advance(State::Killable);
        }
        Event::Error => {
            warn!("request {:?}: transport error", request.id);
            if request.state == State::Runnable {
                request.advance(State::Closeable);
            }
        }
    }
    Directive::Continue
}

fn on_data(request: &mut Request, chunk: &[u8], closer: &mut Closer) {
    let Request {
        id,
        status,
        buffering,
        callback,
        context,
        ..
    } = request;

    match buffering {
        Buffering::Passthrough => {
            invoke(callback, *id, *status, context, closer, Ok(Some(chunk)));
        }
        Buffering::Lines(lines) => {
            let written = lines.write(chunk, |line| {
                invoke(
                    callback,
                    *id,
                    *status,
                    context,
                    closer,
                    Ok(Some(line.as_bytes())),
                );
            });
            // Unreachable with the current splitter, whose writes always succeed.
            if let Err(e) = written {
                warn!("request {:?}: line buffer write failed: {:?}", *id, Dbg(&e));
                invoke(callback, *id, *status, context, closer, Err(Error::LineBuffer));
            }
        }
        Buffering::Accumulate(body) => {
            if let Err(e) = body.append(chunk) {
                warn!(
                    "request {:?}: {} byte chunk does not fit after {} bytes",
                    *id,
                    chunk.len(),
                    body.len()
                );
                invoke(callback, *id, *status, context, closer, Err(e));
            }
        }
    }
}

fn on_finish(request: &mut Request, closer: &mut Closer) {
    {
        let Request {
            id,
            status,
            buffering,
            callback,
            context,
            ..
        } = &mut *request;

        match buffering {
            Buffering::Passthrough | Buffering::Lines(_) => {
                invoke(callback, *id, *status, context, closer, Ok(None));
            }
            Buffering::Accumulate(body) => {
                invoke(callback, *id, *status, context, closer, Ok(Some(body.finish())));
                body.clear();
            }
        }
    }

    // Streams stay open across finished responses only while the server keeps
    // answering 200.
    if request.state == State::Runnable && (!request.auto_resume || request.status != 200) {
        request.advance(State::Closeable);
    }
}

//! The scheduler core: issuance, explicit close and the per-tick pass.

use super::registry::Entry;
use super::{
    Closer, Delivery, Directive, IdSource, Method, Options, Registry, Request, RequestId, State,
    dispatch,
};
use crate::config::{Config, ReapPolicy};
use crate::fmt::Dbg;
use crate::network::error::Error;
use crate::network::{Connector, Event, Transport};
use crate::system::{NoWatchdog, Watchdog};

/// Summary of one scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick {
    /// Runnable requests given a service step.
    pub serviced: usize,
    /// Dead requests removed and disposed of.
    pub reaped: usize,
    /// Requests still registered after the pass.
    pub live: usize,
}

/// Drives every issued request from a single loop.
///
/// The multiplexer owns the registry exclusively. Requests are issued with
/// [`issue`](Self::issue), [`get`](Self::get) or [`post`](Self::post), and
/// make progress only when [`tick`](Self::tick) is called. Each tick:
///
/// 1. feeds the watchdog;
/// 2. closes the transports of closing requests and releases those of
///    disconnected ones;
/// 3. reaps dead requests according to the [`ReapPolicy`];
/// 4. gives every runnable request one non-blocking service step.
///
/// Callbacks run inside step 4, from within the transport's event handling.
pub struct Multiplexer<C: Connector, W: Watchdog = NoWatchdog> {
    connector: C,
    watchdog: W,
    registry: Registry<C::Transport>,
    closer: Closer,
    ids: IdSource,
    config: Config,
}

impl<C: Connector, W: Watchdog> core::fmt::Debug for Multiplexer<C, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("live", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Multiplexer<C, NoWatchdog> {
    /// Create a multiplexer without a watchdog.
    pub fn new(connector: C, config: Config) -> Self {
        Self::with_watchdog(connector, NoWatchdog, config)
    }
}

impl<C: Connector, W: Watchdog> Multiplexer<C, W> {
    /// Create a multiplexer that feeds `watchdog` on every tick and event.
    pub fn with_watchdog(connector: C, watchdog: W, config: Config) -> Self {
        Self::with_ids(connector, watchdog, config, IdSource::default())
    }

    /// Create a multiplexer that shares its id counter with issuing handles.
    pub(crate) fn with_ids(connector: C, watchdog: W, config: Config, ids: IdSource) -> Self {
        Self {
            connector,
            watchdog,
            registry: Registry::new(),
            closer: Closer::default(),
            ids,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of registered requests, dead ones included until reaped.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Current state of a registered request, `None` once it is reaped.
    pub fn state(&self, id: RequestId) -> Option<State> {
        self.request(id).map(Request::state)
    }

    pub fn request(&self, id: RequestId) -> Option<&Request> {
        let slot = self.registry.find(id)?;
        self.registry.get(slot).map(|entry| &entry.request)
    }

    /// Registered request ids in service order.
    pub fn ids(&self) -> impl Iterator<Item = RequestId> + '_ {
        self.registry.ids()
    }

    /// Issue a request.
    ///
    /// All buffers are allocated and the transport is opened before this
    /// returns; on failure nothing is registered and `callback` never runs.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the host or path is empty
    /// - [`Error::InvalidHeader`] if the authorization value is too long
    /// - [`Error::OutOfMemory`] if an allocation fails
    /// - [`Error::Transport`] if the connector cannot open a transport
    /// - [`Error::IdInUse`] if the id counter wrapped onto a live request
    pub fn issue<F>(&mut self, options: &Options<'_>, callback: F) -> Result<RequestId, Error>
    where
        F: FnMut(&mut Delivery<'_>) + Send + 'static,
    {
        let request = Request::new(self.ids.next(), options, &self.config, callback)?;
        self.admit(request).map_err(|(_, e)| e)
    }

    /// Issue a GET. `auto_resume` marks a long-lived stream.
    #[allow(clippy::too_many_arguments)]
    pub fn get<F>(
        &mut self,
        host: &str,
        path: &str,
        auth: Option<&str>,
        max_len: usize,
        line_buffered: bool,
        context: &[u8],
        auto_resume: bool,
        callback: F,
    ) -> Result<RequestId, Error>
    where
        F: FnMut(&mut Delivery<'_>) + Send + 'static,
    {
        let options = Options {
            host,
            path,
            auth,
            method: Method::Get,
            body: None,
            max_len,
            line_buffered,
            context,
            auto_resume,
        };
        self.issue(&options, callback)
    }

    /// Issue a form-encoded POST. POSTs are never auto-resumed.
    #[allow(clippy::too_many_arguments)]
    pub fn post<F>(
        &mut self,
        host: &str,
        path: &str,
        auth: Option<&str>,
        body: &[u8],
        max_len: usize,
        line_buffered: bool,
        context: &[u8],
        callback: F,
    ) -> Result<RequestId, Error>
    where
        F: FnMut(&mut Delivery<'_>) + Send + 'static,
    {
        let options = Options {
            host,
            path,
            auth,
            method: Method::Post,
            body: Some(body),
            max_len,
            line_buffered,
            context,
            auto_resume: false,
        };
        self.issue(&options, callback)
    }

    /// Ask a request to close.
    ///
    /// Only a Runnable request is affected; stale ids and requests already
    /// closing are ignored. Resources are released on later ticks, once the
    /// transport reports the disconnect.
    pub fn close(&mut self, id: RequestId) {
        let Some(slot) = self.registry.find(id) else {
            return;
        };
        if let Some(entry) = self.registry.get_mut(slot) {
            if entry.request.close() {
                debug!("request {:?}: close requested", id);
            }
        }
    }

    /// Run one scheduler pass.
    pub fn tick(&mut self) -> Tick {
        self.watchdog.feed();
        self.settle();
        let reaped = self.reap();
        let serviced = self.service();
        Tick {
            serviced,
            reaped,
            live: self.registry.len(),
        }
    }

    /// Close and release every registered request.
    ///
    /// No callback runs from here on: events the transports raise while
    /// closing are dropped.
    pub fn shutdown(&mut self) {
        while let Some(slot) = self.registry.first() {
            let Some(mut entry) = self.registry.remove(slot) else {
                break;
            };
            let id = entry.request.id();
            if let Some(mut transport) = entry.transport.take() {
                if entry.request.state() < State::Killable {
                    if let Err(e) = transport.close(&mut |_: Event<'_>| {}) {
                        warn!("request {:?}: close failed: {:?}", id, Dbg(&e));
                    }
                }
                if let Err(e) = transport.cleanup() {
                    warn!("request {:?}: cleanup failed: {:?}", id, Dbg(&e));
                }
            }
            debug!("request {:?}: disposed at shutdown", id);
        }
    }

    /// Open the transport for an already built request and register it.
    ///
    /// On failure the request is handed back, unregistered.
    pub(crate) fn admit(&mut self, request: Request) -> Result<RequestId, (Request, Error)> {
        let id = request.id();
        let transport = match self.connector.open(request.transport_config()) {
            Ok(transport) => transport,
            Err(e) => {
                warn!("request {:?}: transport open failed: {:?}", id, Dbg(&e));
                return Err((request, Error::Transport));
            }
        };

        let entry = Entry {
            request,
            transport: Some(transport),
        };
        match self.registry.push_front(entry) {
            Ok(_) => {
                debug!("request {:?}: registered, {} live", id, self.registry.len());
                Ok(id)
            }
            Err((mut entry, e)) => {
                if let Some(transport) = entry.transport.take() {
                    if let Err(e) = transport.cleanup() {
                        warn!("request {:?}: cleanup failed: {:?}", id, Dbg(&e));
                    }
                }
                Err((entry.request, e))
            }
        }
    }

    /// Report a request that could not be admitted to its own callback.
    pub(crate) fn reject(&mut self, request: Request, error: Error) {
        request.fail(error, &mut self.closer);
        self.apply_closes();
    }

    pub(crate) fn watchdog_mut(&mut self) -> &mut W {
        &mut self.watchdog
    }

    /// Close closing transports, release disconnected ones.
    fn settle(&mut self) {
        let Self {
            registry,
            closer,
            watchdog,
            ..
        } = self;

        let mut cursor = registry.first();
        while let Some(slot) = cursor {
            cursor = registry.next(slot);
            let Some(entry) = registry.get_mut(slot) else {
                continue;
            };
            match entry.request.state() {
                State::Closeable => {
                    let request = &mut entry.request;
                    if let Some(transport) = entry.transport.as_mut() {
                        let closed = transport.close(&mut |event: Event<'_>| {
                            watchdog.feed();
                            dispatch(request, event, closer);
                        });
                        if let Err(e) = closed {
                            warn!("request {:?}: close failed: {:?}", request.id(), Dbg(&e));
                        }
                    }
                }
                State::Killable => {
                    if let Some(transport) = entry.transport.take() {
                        if let Err(e) = transport.cleanup() {
                            warn!("request {:?}: cleanup failed: {:?}", entry.request.id(), Dbg(&e));
                        }
                    }
                    entry.request.advance(State::Dead);
                }
                State::Runnable | State::Dead => {}
            }
        }

        self.apply_closes();
    }

    /// Remove and drop dead requests.
    fn reap(&mut self) -> usize {
        let mut reaped = 0;
        let mut cursor = self.registry.first();
        while let Some(slot) = cursor {
            cursor = self.registry.next(slot);
            let dead = self
                .registry
                .get(slot)
                .is_some_and(|entry| entry.request.state() == State::Dead);
            if !dead {
                continue;
            }
            if let Some(entry) = self.registry.remove(slot) {
                debug!("request {:?}: reaped", entry.request.id());
                reaped += 1;
            }
            if self.config.reap_policy == ReapPolicy::OnePerTick {
                break;
            }
        }
        reaped
    }

    /// Give every runnable request one service step.
    fn service(&mut self) -> usize {
        let mut serviced = 0;
        let mut cursor = self.registry.first();
        while let Some(slot) = cursor {
            cursor = self.registry.next(slot);

            let Self {
                registry,
                closer,
                watchdog,
                ..
            } = self;
            let Some(entry) = registry.get_mut(slot) else {
                continue;
            };
            if entry.request.state() != State::Runnable {
                continue;
            }
            let request = &mut entry.request;
            let Some(transport) = entry.transport.as_mut() else {
                continue;
            };

            let mut directive = Directive::Continue;
            let performed = transport.perform(&mut |event: Event<'_>| {
                watchdog.feed();
                if dispatch(request, event, closer) == Directive::CloseTransport {
                    directive = Directive::CloseTransport;
                }
            });
            if let Err(e) = performed {
                warn!("request {:?}: perform failed: {:?}", request.id(), Dbg(&e));
            }

            if directive == Directive::CloseTransport {
                trace!("request {:?}: data after close, closing transport", request.id());
                let closed = transport.close(&mut |event: Event<'_>| {
                    watchdog.feed();
                    dispatch(request, event, closer);
                });
                if let Err(e) = closed {
                    warn!("request {:?}: close failed: {:?}", request.id(), Dbg(&e));
                }
            }

            serviced += 1;
            self.apply_closes();
        }
        serviced
    }

    fn apply_closes(&mut self) {
        while let Some(id) = self.closer.pop() {
            self.close(id);
        }
    }
}

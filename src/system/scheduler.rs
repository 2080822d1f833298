//! Background scheduler thread.
//!
//! [`spawn`] starts a dedicated thread that owns a [`Multiplexer`] and ticks
//! it at the configured interval. Callers talk to it through a cloneable [`Handle`]:
//! requests are built (and all their memory allocated) on the caller's thread
//! and then handed over a channel, so issuance errors are reported
//! synchronously while the registry itself is only ever touched by the
//! scheduler thread.

use crate::config::Config;
use crate::network::Connector;
use crate::network::error::Error;
use crate::network::http::{
    Delivery, IdSource, Method, Multiplexer, Options, Request, RequestId,
};
use crate::system::Watchdog;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

/// Name of the scheduler thread.
pub const THREAD_NAME: &str = "httpmux";

enum Command {
    Submit(Request),
    Close(RequestId),
    Shutdown,
}

/// Cloneable handle to a running scheduler.
#[derive(Debug, Clone)]
pub struct Handle {
    tx: Sender<Command>,
    ids: IdSource,
    config: Config,
}

impl core::fmt::Debug for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Command::Submit(request) => f.debug_tuple("Submit").field(&request.id()).finish(),
            Command::Close(id) => f.debug_tuple("Close").field(id).finish(),
            Command::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl Handle {
    /// Issue a request on the scheduler thread.
    ///
    /// Validation and allocation happen here; opening the transport happens
    /// on the scheduler thread, and a failure there is reported to `callback`
    /// as [`Error::Transport`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`], [`Error::InvalidHeader`] or
    ///   [`Error::OutOfMemory`] if the request cannot be built
    /// - [`Error::Shutdown`] if the scheduler has stopped
    pub fn issue<F>(&self, options: &Options<'_>, callback: F) -> Result<RequestId, Error>
    where
        F: FnMut(&mut Delivery<'_>) + Send + 'static,
    {
        let request = Request::new(self.ids.next(), options, &self.config, callback)?;
        let id = request.id();
        self.send(Command::Submit(request))?;
        Ok(id)
    }

    /// Issue a GET. See [`Multiplexer::get`].
    #[allow(clippy::too_many_arguments)]
    pub fn get<F>(
        &self,
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

    /// Issue a form-encoded POST. See [`Multiplexer::post`].
    #[allow(clippy::too_many_arguments)]
    pub fn post<F>(
        &self,
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

    /// Ask a request to close. Stale ids are ignored by the scheduler.
    pub fn close(&self, id: RequestId) -> Result<(), Error> {
        self.send(Command::Close(id))
    }

    /// Stop the scheduler after its current tick.
    ///
    /// Every registered request is closed and released without further
    /// callbacks. Join the thread returned by [`spawn`] to wait for it.
    ///
    /// Dropping every handle also stops the scheduler, but a handle moved into
    /// a callback lives as long as its request does. A stream that captures
    /// one is only stopped by this call.
    pub fn shutdown(&self) -> Result<(), Error> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<(), Error> {
        self.tx.send(command).map_err(|_| Error::Shutdown)
    }
}

/// Start a scheduler thread driving requests opened through `connector`.
///
/// The thread runs until [`Handle::shutdown`] is called or every handle,
/// including clones captured by callbacks, has been dropped.
///
/// # Errors
///
/// Returns [`Error::Spawn`] if the thread cannot be created.
pub fn spawn<C, W>(
    connector: C,
    watchdog: W,
    config: Config,
) -> Result<(Handle, JoinHandle<()>), Error>
where
    C: Connector + Send + 'static,
    W: Watchdog + Send + 'static,
{
    let ids = IdSource::default();
    let (tx, rx) = crossbeam_channel::unbounded();
    let handle = Handle {
        tx,
        ids: ids.clone(),
        config,
    };

    // Transports are opened on the scheduler thread and never leave it.
    let thread = thread::Builder::new()
        .name(THREAD_NAME.into())
        .stack_size(config.stack_size)
        .spawn(move || run(Multiplexer::with_ids(connector, watchdog, config, ids), rx))
        .map_err(|e| {
            error!("failed to spawn scheduler thread: {:?}", crate::fmt::Dbg(&e));
            Error::Spawn
        })?;

    Ok((handle, thread))
}

fn run<C: Connector, W: Watchdog>(mut mux: Multiplexer<C, W>, commands: Receiver<Command>) {
    let interval = mux.config().tick_interval();
    let timeout = mux.config().watchdog_timeout_ms;
    mux.watchdog_mut().arm(timeout);
    info!("scheduler started, tick every {} ms", mux.config().tick_interval_ms);

    'run: loop {
        loop {
            match commands.try_recv() {
                Ok(Command::Submit(request)) => {
                    if let Err((request, e)) = mux.admit(request) {
                        mux.reject(request, e);
                    }
                }
                Ok(Command::Close(id)) => mux.close(id),
                Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => break 'run,
                Err(TryRecvError::Empty) => break,
            }
        }

        mux.tick();
        thread::sleep(interval);
    }

    info!("scheduler stopping, {} requests live", mux.len());
    mux.shutdown();
}

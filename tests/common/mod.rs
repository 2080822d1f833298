#![allow(dead_code)]

use httpmux::network::error::Error;
use httpmux::network::http::{Delivery, RequestId, TransportConfig};
use httpmux::network::{Connector, Diagnostic, Event, Transport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// An owned transport event, replayed by [`MockTransport`].
#[derive(Debug, Clone)]
pub enum Step {
    Connected,
    Header(&'static str, &'static str),
    Data(u16, Vec<u8>),
    Finished(u16),
    Disconnected(Option<Diagnostic>),
    Error,
}

impl Step {
    pub fn data(status: u16, chunk: &[u8]) -> Self {
        Step::Data(status, chunk.to_vec())
    }

    fn emit(&self, events: &mut dyn FnMut(Event<'_>)) {
        let event = match self {
            Step::Connected => Event::Connected,
            Step::Header(key, value) => Event::HeaderReceived { key, value },
            Step::Data(status, chunk) => Event::Data {
                status: *status,
                chunk,
            },
            Step::Finished(status) => Event::Finished { status: *status },
            Step::Disconnected(diagnostic) => Event::Disconnected {
                diagnostic: *diagnostic,
            },
            Step::Error => Event::Error,
        };
        events(event);
    }
}

/// Events raised by successive `perform` calls; one inner `Vec` per call.
pub type Script = Vec<Vec<Step>>;

/// What the connector and its transports were asked to do.
#[derive(Debug, Default)]
pub struct Journal {
    pub opened: Vec<TransportConfig>,
    pub performs: usize,
    pub closes: usize,
    pub cleanups: usize,
}

#[derive(Debug)]
pub struct MockTransport {
    script: VecDeque<Vec<Step>>,
    journal: Arc<Mutex<Journal>>,
    /// `close` calls to absorb before reporting the disconnect.
    linger: usize,
    /// Raised by every `close` call ahead of the disconnect.
    on_close: Vec<Step>,
}

impl Transport for MockTransport {
    type Error = ();

    fn perform(&mut self, events: &mut dyn FnMut(Event<'_>)) -> Result<(), ()> {
        self.journal.lock().unwrap().performs += 1;
        if let Some(steps) = self.script.pop_front() {
            for step in &steps {
                step.emit(events);
            }
        }
        Ok(())
    }

    fn close(&mut self, events: &mut dyn FnMut(Event<'_>)) -> Result<(), ()> {
        self.journal.lock().unwrap().closes += 1;
        for step in &self.on_close {
            step.emit(events);
        }
        if self.linger > 0 {
            self.linger -= 1;
        } else {
            events(Event::Disconnected { diagnostic: None });
        }
        Ok(())
    }

    fn cleanup(self) -> Result<(), ()> {
        self.journal.lock().unwrap().cleanups += 1;
        Ok(())
    }
}

/// Hands out scripted transports in the order requests are opened.
#[derive(Debug, Default)]
pub struct MockConnector {
    pub journal: Arc<Mutex<Journal>>,
    scripts: VecDeque<Script>,
    linger: usize,
    on_close: Vec<Step>,
    fail_open: bool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script for the next transport to be opened.
    pub fn script(mut self, script: Script) -> Self {
        self.scripts.push_back(script);
        self
    }

    /// Make every transport need `closes` extra `close` calls before it
    /// disconnects.
    pub fn linger(mut self, closes: usize) -> Self {
        self.linger = closes;
        self
    }

    /// Make every transport raise `steps` when asked to close.
    pub fn on_close(mut self, steps: Vec<Step>) -> Self {
        self.on_close = steps;
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn journal(&self) -> Arc<Mutex<Journal>> {
        self.journal.clone()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;
    type Error = &'static str;

    fn open(&mut self, config: &TransportConfig) -> Result<MockTransport, &'static str> {
        if self.fail_open {
            return Err("connection refused");
        }
        self.journal.lock().unwrap().opened.push(config.clone());
        Ok(MockTransport {
            script: self.scripts.pop_front().unwrap_or_default().into(),
            journal: self.journal.clone(),
            linger: self.linger,
            on_close: self.on_close.clone(),
        })
    }
}

/// One observed callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RequestId,
    pub status: u16,
    pub result: Result<Option<Vec<u8>>, Error>,
}

/// Collects every delivery made to the callbacks it hands out.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    records: Arc<Mutex<Vec<Record>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> impl FnMut(&mut Delivery<'_>) + Send + 'static {
        let records = self.records.clone();
        move |delivery: &mut Delivery<'_>| {
            records.lock().unwrap().push(Record {
                id: delivery.id(),
                status: delivery.status(),
                result: delivery.result().map(|data| data.map(<[u8]>::to_vec)),
            });
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn for_id(&self, id: RequestId) -> Vec<Record> {
        self.records().into_iter().filter(|r| r.id == id).collect()
    }
}

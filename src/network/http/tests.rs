use super::*;
use crate::config::Config;
use crate::network::error::Error;
use crate::network::{Diagnostic, Event};
use alloc::vec;
use alloc::vec::Vec;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Record {
    result: Result<Option<Vec<u8>>, Error>,
    status: u16,
}

type Records = Arc<Mutex<Vec<Record>>>;

fn request(options: &Options<'_>) -> (Request, Records) {
    let records = Records::default();
    let sink = records.clone();
    let request = Request::new(
        IdSource::default().next(),
        options,
        &Config::default(),
        move |delivery: &mut Delivery<'_>| {
            sink.lock().unwrap().push(Record {
                result: delivery.result().map(|data| data.map(<[u8]>::to_vec)),
                status: delivery.status(),
            });
        },
    )
    .unwrap();
    (request, records)
}

fn data(chunk: &[u8]) -> Event<'_> {
    Event::Data { status: 200, chunk }
}

fn feed(request: &mut Request, events: &[Event<'_>]) -> Vec<Directive> {
    let mut closer = Closer::default();
    events
        .iter()
        .map(|event| dispatch(request, *event, &mut closer))
        .collect()
}

#[test]
fn test_passthrough_delivers_chunks_with_status() {
    let (mut req, records) = request(&Options::get("example.com", "/feed"));
    assert_eq!(req.mode(), Mode::Passthrough);

    feed(
        &mut req,
        &[
            Event::Connected,
            Event::HeaderSent,
            Event::HeaderReceived {
                key: "Content-Type",
                value: "text/plain",
            },
            Event::Data {
                status: 203,
                chunk: b"hello",
            },
            Event::Finished { status: 203 },
        ],
    );

    let records = records.lock().unwrap();
    assert_eq!(
        *records,
        vec![
            Record {
                result: Ok(Some(b"hello".to_vec())),
                status: 203,
            },
            Record {
                result: Ok(None),
                status: 203,
            },
        ]
    );
}

#[test]
fn test_data_after_close_is_ignored() {
    let (mut req, records) = request(&Options::get("example.com", "/"));
    assert!(req.close());

    let directives = feed(&mut req, &[data(b"late")]);

    assert_eq!(directives, [Directive::CloseTransport]);
    assert!(records.lock().unwrap().is_empty());
    assert_eq!(req.state(), State::Closeable);
}

#[test]
fn test_line_buffered_delivers_lines_then_end() {
    let options = Options {
        max_len: 32,
        line_buffered: true,
        ..Options::get("example.com", "/stream")
    };
    let (mut req, records) = request(&options);
    assert_eq!(req.mode(), Mode::LineBuffered);

    feed(
        &mut req,
        &[data(b"{\"a\":1}\r\n{\"b\""), data(b":2}\n"), Event::Finished { status: 200 }],
    );

    let results: Vec<_> = records
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.result.clone())
        .collect();
    assert_eq!(
        results,
        vec![
            Ok(Some(b"{\"a\":1}".to_vec())),
            Ok(Some(b"{\"b\":2}".to_vec())),
            Ok(None),
        ]
    );
}

#[test]
fn test_accumulate_concatenates_chunks() {
    let options = Options {
        max_len: 16,
        ..Options::get("example.com", "/body")
    };
    let (mut req, records) = request(&options);
    assert_eq!(req.mode(), Mode::Accumulate);

    feed(&mut req, &[data(b"abc"), data(b"defgh")]);
    assert!(records.lock().unwrap().is_empty());

    feed(&mut req, &[Event::Finished { status: 200 }]);
    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].result, Ok(Some(b"abcdefgh".to_vec())));
}

#[test]
fn test_accumulate_reserves_one_slot() {
    let options = Options {
        max_len: 4,
        ..Options::get("example.com", "/body")
    };
    let (mut req, records) = request(&options);

    feed(&mut req, &[data(b"abc"), Event::Finished { status: 200 }]);
    assert_eq!(records.lock().unwrap()[0].result, Ok(Some(b"abc".to_vec())));

    let (mut req, records) = request(&options);
    feed(&mut req, &[data(b"abcd")]);
    assert_eq!(records.lock().unwrap()[0].result, Err(Error::BufferOverflow));
}

#[test]
fn test_accumulate_overflow_keeps_body_that_fit() {
    let options = Options {
        max_len: 8,
        auto_resume: true,
        ..Options::get("example.com", "/body")
    };
    let (mut req, records) = request(&options);

    feed(
        &mut req,
        &[
            data(b"12345"),
            data(b"67890"),
            data(b"1"),
            Event::Finished { status: 200 },
        ],
    );
    {
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].result, Err(Error::BufferOverflow));
        assert_eq!(records[1].result, Ok(Some(b"12345".to_vec())));
    }
    // overflow alone does not close the request
    assert_eq!(req.state(), State::Runnable);

    // the next response of the stream starts from an empty buffer
    feed(&mut req, &[data(b"ok"), Event::Finished { status: 200 }]);
    assert_eq!(records.lock().unwrap()[2].result, Ok(Some(b"ok".to_vec())));
}

#[test]
fn test_finish_closes_without_auto_resume() {
    for status in [200, 404, 500] {
        let (mut req, _) = request(&Options::get("example.com", "/"));
        feed(&mut req, &[Event::Finished { status }]);
        assert_eq!(req.state(), State::Closeable);
    }
}

#[test]
fn test_auto_resume_survives_only_200() {
    let options = Options {
        auto_resume: true,
        ..Options::get("example.com", "/stream")
    };

    let (mut req, _) = request(&options);
    feed(&mut req, &[Event::Finished { status: 200 }]);
    feed(&mut req, &[Event::Finished { status: 200 }]);
    assert_eq!(req.state(), State::Runnable);

    for status in [201, 204, 401, 503] {
        let (mut req, _) = request(&options);
        feed(&mut req, &[Event::Finished { status }]);
        assert_eq!(req.state(), State::Closeable, "status {status}");
    }
}

#[test]
fn test_error_event_only_closes_runnable() {
    let (mut req, records) = request(&Options::get("example.com", "/"));
    feed(&mut req, &[Event::Error]);
    assert_eq!(req.state(), State::Closeable);
    assert!(records.lock().unwrap().is_empty());

    feed(&mut req, &[Event::Disconnected { diagnostic: None }, Event::Error]);
    assert_eq!(req.state(), State::Killable);
}

#[test]
fn test_disconnect_moves_to_killable() {
    let (mut req, _) = request(&Options::get("example.com", "/"));
    let diagnostic = Diagnostic {
        code: 0x8001,
        tls_code: -0x4e,
    };
    feed(
        &mut req,
        &[Event::Disconnected {
            diagnostic: Some(diagnostic),
        }],
    );
    assert_eq!(req.state(), State::Killable);
}

#[test]
fn test_states_never_move_backwards() {
    let (mut req, _) = request(&Options::get("example.com", "/"));
    assert!(req.advance(State::Closeable));
    assert!(!req.advance(State::Runnable));
    assert!(!req.close());
    assert!(req.advance(State::Killable));
    assert!(!req.advance(State::Closeable));
    assert_eq!(req.state(), State::Killable);
}

#[test]
fn test_callback_can_queue_closes() {
    let mut closer = Closer::default();
    let target = RequestId(7);
    let mut req = Request::new(
        RequestId(1),
        &Options::get("example.com", "/"),
        &Config::default(),
        move |delivery: &mut Delivery<'_>| {
            if delivery.is_end() {
                delivery.close(target);
                delivery.close(delivery.id());
            }
        },
    )
    .unwrap();

    dispatch(&mut req, Event::Finished { status: 200 }, &mut closer);
    assert_eq!(closer.pop(), Some(RequestId(1)));
    assert_eq!(closer.pop(), Some(target));
    assert_eq!(closer.pop(), None);
}

#[test]
fn test_context_is_cloned_and_returned() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut context = b"account-1".to_vec();
    let options = Options {
        context: &context,
        ..Options::get("example.com", "/")
    };
    let mut req = Request::new(
        RequestId(0),
        &options,
        &Config::default(),
        move |delivery: &mut Delivery<'_>| {
            sink.lock().unwrap().extend_from_slice(delivery.context());
        },
    )
    .unwrap();

    context.clear();
    dispatch(&mut req, data(b"x"), &mut Closer::default());
    assert_eq!(*seen.lock().unwrap(), b"account-1");
    assert_eq!(req.context(), b"account-1");
}

#[test]
fn test_invalid_arguments() {
    let config = Config::default();
    let empty_host = Request::new(RequestId(0), &Options::get("", "/"), &config, |_| {});
    assert_eq!(empty_host.unwrap_err(), Error::InvalidArgument);

    let empty_path = Request::new(RequestId(0), &Options::get("host", ""), &config, |_| {});
    assert_eq!(empty_path.unwrap_err(), Error::InvalidArgument);

    let long = "x".repeat(MAX_HEADER_VALUE_LEN + 1);
    let options = Options {
        auth: Some(&long),
        ..Options::get("host", "/")
    };
    let too_long = Request::new(RequestId(0), &options, &config, |_| {});
    assert_eq!(too_long.unwrap_err(), Error::InvalidHeader);
}

#[test]
fn test_transport_config_for_post() {
    let config = Config {
        request_timeout_ms: 1234,
        ..Config::default()
    };
    let options = Options {
        auth: Some("OAuth token=\"abc\""),
        ..Options::post("api.example.com", "/1.1/statuses/update.json", b"status=hi%21")
    };
    let req = Request::new(RequestId(0), &options, &config, |_| {}).unwrap();
    let transport = req.transport_config();

    assert_eq!(transport.host, "api.example.com");
    assert_eq!(transport.path, "/1.1/statuses/update.json");
    assert_eq!(transport.method, Method::Post);
    assert_eq!(transport.timeout_ms, 1234);
    assert!(transport.non_blocking);
    assert_eq!(transport.header("authorization"), Some("OAuth token=\"abc\""));
    assert_eq!(transport.header("Content-Type"), Some(FORM_CONTENT_TYPE));
    assert_eq!(transport.body.as_deref(), Some(&b"status=hi%21"[..]));
    assert!(!req.auto_resume());
}

#[test]
fn test_get_has_no_content_type() {
    let req = Request::new(
        RequestId(0),
        &Options::get("example.com", "/"),
        &Config::default(),
        |_| {},
    )
    .unwrap();
    assert!(req.transport_config().headers.is_empty());
    assert_eq!(req.transport_config().body, None);
}

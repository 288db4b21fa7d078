//! Test doubles shared by the unit tests: a scripted transport, a recording
//! pacer and in-memory sinks.

use crate::error::{SinkError, TransportError};
use crate::fetcher::{HttpResponse, Transport};
use crate::models::ArticleRecord;
use crate::outputs::{RawPageSink, RecordSink, SaveFuture};
use crate::pacing::{Pacer, Pause};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

pub fn record(title: &str, url: Option<&str>) -> ArticleRecord {
    ArticleRecord {
        title: title.to_string(),
        url: url.map(str::to_string),
        published_date: None,
        date_raw_text: None,
        excerpt: format!("Excerpt for {title}"),
    }
}

pub fn ok(body: &str) -> Result<HttpResponse, TransportError> {
    status(200, body)
}

pub fn status(code: u16, body: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status: code,
        body: body.to_string(),
    })
}

/// Serves canned responses per URL. Each URL has a queue; the last entry is
/// repeated once the queue is down to one. Unknown URLs get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<HashMap<String, VecDeque<Result<HttpResponse, TransportError>>>>,
    calls: RefCell<Vec<(String, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url: &str, response: Result<HttpResponse, TransportError>) -> Self {
        self.responses
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// `(url, user_agent)` for every request made, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(u, _)| u.clone()).collect()
    }
}

fn duplicate(response: &Result<HttpResponse, TransportError>) -> Result<HttpResponse, TransportError> {
    match response {
        Ok(r) => Ok(r.clone()),
        Err(TransportError::Timeout) => Err(TransportError::Timeout),
        Err(TransportError::Request(m)) => Err(TransportError::Request(m.clone())),
        Err(TransportError::Body(m)) => Err(TransportError::Body(m.clone())),
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError> {
        self.calls
            .borrow_mut()
            .push((url.to_string(), user_agent.to_string()));
        let mut responses = self.responses.borrow_mut();
        match responses.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| status(404, "")),
            Some(queue) => queue.front().map(duplicate).unwrap_or_else(|| status(404, "")),
            None => status(404, ""),
        }
    }
}

/// Zero-length pauses, remembering which were requested.
#[derive(Default, Clone)]
pub struct RecordingPacer {
    pauses: Rc<RefCell<Vec<Pause>>>,
}

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Pause> {
        self.pauses.borrow().clone()
    }
}

impl Pacer for RecordingPacer {
    fn delay_for(&self, pause: Pause) -> Duration {
        self.pauses.borrow_mut().push(pause);
        Duration::ZERO
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub records: Vec<ArticleRecord>,
    pub calls: usize,
    fail: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl RecordSink for MemorySink {
    async fn accept(&mut self, records: &[ArticleRecord]) -> Result<usize, SinkError> {
        self.calls += 1;
        if self.fail {
            return Err(SinkError::Io {
                path: "memory".to_string(),
                source: std::io::Error::other("sink refused records"),
            });
        }
        self.records.extend_from_slice(records);
        Ok(records.len())
    }
}

/// Raw-page sink whose saved pages stay inspectable after it is boxed.
#[derive(Default, Clone)]
pub struct MemoryRawSink {
    pub saved: Rc<RefCell<Vec<(String, String)>>>,
    pub fail: bool,
}

impl RawPageSink for MemoryRawSink {
    fn save<'a>(&'a mut self, url: &'a str, body: &'a str) -> SaveFuture<'a> {
        self.saved.borrow_mut().push((url.to_string(), body.to_string()));
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                return Err(SinkError::Io {
                    path: "memory".to_string(),
                    source: std::io::Error::other("disk full"),
                });
            }
            Ok(())
        })
    }
}

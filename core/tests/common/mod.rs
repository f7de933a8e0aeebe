#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use countdown_core::executor::{handler_fn, FnHandler, PhaseHandler, PhasePayload};
use countdown_core::HandlerError;

/// What a handler did, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(&'static str),
    End(&'static str),
}

/// Shared log of handler start/end events with timestamps.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<(Event, Instant)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.events.lock().unwrap().push((event, Instant::now()));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn started(&self, phase: &'static str) -> bool {
        self.events().contains(&Event::Start(phase))
    }

    pub fn position(&self, event: Event) -> Option<usize> {
        self.events().iter().position(|e| *e == event)
    }

    /// True if `a` and `b` were both running at some point.
    pub fn overlapped(&self, a: &'static str, b: &'static str) -> bool {
        let events = self.events();
        let idx = |e: Event| events.iter().position(|x| *x == e);
        match (
            idx(Event::Start(a)),
            idx(Event::End(a)),
            idx(Event::Start(b)),
            idx(Event::End(b)),
        ) {
            (Some(sa), Some(ea), Some(sb), Some(eb)) => sa < eb && sb < ea,
            _ => false,
        }
    }
}

type BoxedFut = std::pin::Pin<Box<dyn std::future::Future<Output = Result<PhasePayload, HandlerError>> + Send>>;

/// Handler that records start/end, waits `delay`, then succeeds.
pub fn ok_after(
    recorder: &Recorder,
    phase: &'static str,
    delay: Duration,
) -> FnHandler<impl Fn() -> BoxedFut + Send + Sync + 'static> {
    let recorder = recorder.clone();
    handler_fn(move || -> BoxedFut {
        let recorder = recorder.clone();
        Box::pin(async move {
            recorder.push(Event::Start(phase));
            tokio::time::sleep(delay).await;
            recorder.push(Event::End(phase));
            Ok::<PhasePayload, HandlerError>(Some(serde_json::json!({ "phase": phase })))
        })
    })
}

pub fn ok(recorder: &Recorder, phase: &'static str) -> FnHandler<impl Fn() -> BoxedFut + Send + Sync + 'static> {
    ok_after(recorder, phase, Duration::ZERO)
}

/// Handler that records start/end, waits `delay`, then fails.
pub fn fail_after(
    recorder: &Recorder,
    phase: &'static str,
    delay: Duration,
) -> FnHandler<impl Fn() -> BoxedFut + Send + Sync + 'static> {
    let recorder = recorder.clone();
    handler_fn(move || -> BoxedFut {
        let recorder = recorder.clone();
        Box::pin(async move {
            recorder.push(Event::Start(phase));
            tokio::time::sleep(delay).await;
            recorder.push(Event::End(phase));
            Err::<PhasePayload, HandlerError>(HandlerError::service(phase, "upstream returned 500"))
        })
    })
}

pub fn fail(recorder: &Recorder, phase: &'static str) -> FnHandler<impl Fn() -> BoxedFut + Send + Sync + 'static> {
    fail_after(recorder, phase, Duration::ZERO)
}

/// Box a handler so builders can mix handler types in one table.
pub fn boxed(h: impl PhaseHandler + 'static) -> Arc<dyn PhaseHandler> {
    Arc::new(h)
}

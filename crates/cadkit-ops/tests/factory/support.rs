#![allow(dead_code)]

use cadkit_core::{EventKind, FactoryEvent};
use cadkit_engine::MemoryEngine;
use cadkit_ops::{Factory, OperationContext};
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

pub type EventLog = Arc<Mutex<Vec<FactoryEvent>>>;

pub fn memory_context(engine: MemoryEngine) -> (Arc<MemoryEngine>, OperationContext) {
    let engine = Arc::new(engine);
    let context = OperationContext::new(engine.clone());
    (engine, context)
}

pub fn record<F: Factory + ?Sized>(factory: &F) -> EventLog {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    factory
        .events()
        .set_handler(move |event| sink.lock().unwrap().push(event));
    log
}

pub fn count(log: &EventLog, kind: EventKind) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|event| event.kind() == kind)
        .count()
}

pub fn kinds(log: &EventLog) -> Vec<EventKind> {
    log.lock().unwrap().iter().map(|event| event.kind()).collect()
}

/// Log sink collecting formatted tracing output
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Run `f` with this capture as the thread's subscriber
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
